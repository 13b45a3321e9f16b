use anyhow::{anyhow, Result};
use interchange_core::InterchangeConfig;
use rustyline::Editor;
use std::env;
use std::path::PathBuf;

mod client;
mod server;
mod session_manager;

use client::Client;
use session_manager::SessionManager;

const HELP: &str = "\
Plain lines are checked without being stored.
  :create <source>      store an entry, remembering its hash
  :get [hash]           fetch an entry (defaults to the last created)
  :wait [hash]          like :get, polling until the entry is visible
  :list                 list stored hashes
  :record on <file>     append a JSON-lines transcript to <file>
  :record off           stop recording
  :help                 show this message
  :quit                 leave the REPL";

/// A `:command` line typed at the prompt.
#[derive(Debug, PartialEq, Eq)]
enum ReplCommand<'a> {
    Create(&'a str),
    Get(Option<&'a str>),
    Wait(Option<&'a str>),
    List,
    RecordOn(&'a str),
    RecordOff,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<ReplCommand<'_>> {
    let line = line.trim();
    let (cmd, rest) = match line.split_once(char::is_whitespace) {
        Some((cmd, rest)) => (cmd, rest.trim()),
        None => (line, ""),
    };
    let arg = (!rest.is_empty()).then_some(rest);

    match cmd {
        ":create" => arg
            .map(ReplCommand::Create)
            .ok_or_else(|| anyhow!("Usage: :create <source>")),
        ":get" => Ok(ReplCommand::Get(arg)),
        ":wait" => Ok(ReplCommand::Wait(arg)),
        ":list" => Ok(ReplCommand::List),
        ":record" => {
            let mut parts = rest.split_whitespace();
            match (parts.next(), parts.next()) {
                (Some("on"), Some(path)) => Ok(ReplCommand::RecordOn(path)),
                (Some("off"), None) => Ok(ReplCommand::RecordOff),
                _ => Err(anyhow!("Usage: :record on <file> | :record off")),
            }
        }
        ":help" => Ok(ReplCommand::Help),
        ":quit" | ":q" => Ok(ReplCommand::Quit),
        _ => Err(anyhow!("Unrecognized command: {}", line)),
    }
}

fn config_path(args: &[String]) -> Option<PathBuf> {
    args.iter()
        .position(|arg| arg == "--config")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from)
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let config_path = config_path(&args);

    if args.iter().any(|arg| arg == "--stdio") {
        let config = InterchangeConfig::load(config_path.as_deref())?;
        return server::run(config);
    }

    let mut rl = Editor::<()>::new()?;
    let mut client = Client::new(config_path.as_deref())?;
    let mut session_manager = SessionManager::new();
    println!("rep_interchange REPL (:help for commands)");

    loop {
        let readline = rl.readline(">> ");
        match readline {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                rl.add_history_entry(line.as_str());
                session_manager.record_command(&line);

                let result = if line.trim_start().starts_with(':') {
                    match parse_command(&line) {
                        Ok(ReplCommand::Quit) => break,
                        Ok(command) => run_command(command, &mut client, &mut session_manager),
                        Err(e) => Err(e),
                    }
                } else {
                    client.check(&line).map(|check| {
                        if check.accepted {
                            format!("accepted: {}", check.canonical.unwrap_or_default())
                        } else {
                            format!(
                                "rejected at {}: {}",
                                check.stage.unwrap_or_default(),
                                check.error.unwrap_or_default()
                            )
                        }
                    })
                };

                match result {
                    Ok(msg) => {
                        println!("{}", msg);
                        session_manager.record_output(&msg);
                    }
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        session_manager.record_output(&e.to_string());
                    }
                }
            }
            Err(_) => break,
        }
    }

    Ok(())
}

fn run_command(
    command: ReplCommand<'_>,
    client: &mut Client,
    session_manager: &mut SessionManager,
) -> Result<String> {
    match command {
        ReplCommand::Create(source) => {
            let hash = client.create(source, &[])?;
            session_manager.set_last_hash(&hash);
            Ok(hash)
        }
        ReplCommand::Get(hash) | ReplCommand::Wait(hash) => {
            let wait = matches!(command, ReplCommand::Wait(_));
            let hash = session_manager
                .resolve_hash(hash)
                .ok_or_else(|| anyhow!("No hash given and nothing created yet"))?
                .to_string();
            let record = if wait {
                client.await_entry(&hash)?
            } else {
                client.get(&hash)?
            };
            Ok(serde_json::to_string_pretty(&record)?)
        }
        ReplCommand::List => {
            let hashes = client.list()?;
            if hashes.is_empty() {
                Ok("(no entries)".to_string())
            } else {
                Ok(hashes.join("\n"))
            }
        }
        ReplCommand::RecordOn(path) => session_manager
            .start_recording(path)
            .map(|_| format!("Recording to {}", path)),
        ReplCommand::RecordOff => {
            session_manager.stop_recording();
            Ok("Stopped recording.".to_string())
        }
        ReplCommand::Help => Ok(HELP.to_string()),
        ReplCommand::Quit => Ok(String::new()),
    }
}
