use clap::{Arg, ArgAction, ArgMatches, Command};
use interchange_core::InterchangeConfig;
use std::path::Path;
use tracing_subscriber::EnvFilter;

mod commands;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn source_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("file")
            .short('f')
            .long("file")
            .value_name("FILE")
            .help("File containing the program")
            .conflicts_with("content"),
    )
    .arg(
        Arg::new("content")
            .short('c')
            .long("content")
            .value_name("CONTENT")
            .help("Program text given directly"),
    )
}

fn cli() -> Command {
    Command::new("rep")
        .version(VERSION)
        .about("rep_interchange - parse, validate and store DSL entries")
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .global(true)
                .help("TOML configuration file"),
        )
        .subcommand_required(true)
        .subcommand(source_args(
            Command::new("check").about("Parse and validate a program without storing it"),
        ))
        .subcommand(
            source_args(Command::new("create").about("Store a program as an interchange entry"))
                .arg(
                    Arg::new("arg")
                        .long("arg")
                        .value_name("HASH")
                        .action(ArgAction::Append)
                        .help("Hash of an existing entry to record as an operand"),
                ),
        )
        .subcommand(
            Command::new("get")
                .about("Fetch an entry by hash")
                .arg(Arg::new("hash").required(true).value_name("HASH"))
                .arg(
                    Arg::new("wait")
                        .long("wait")
                        .action(ArgAction::SetTrue)
                        .help("Poll until the entry becomes visible"),
                ),
        )
        .subcommand(Command::new("list").about("List stored entry hashes"))
}

fn init_logging(level: &str) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(rust_log.as_deref(), level))
        .with_writer(std::io::stderr)
        .init();
}

/// Directives from `RUST_LOG` when set, otherwise the configured level.
fn log_filter(rust_log: Option<&str>, level: &str) -> EnvFilter {
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(level))
}

async fn dispatch(matches: &ArgMatches, config: InterchangeConfig) -> anyhow::Result<bool> {
    match matches.subcommand() {
        Some(("check", sub)) => commands::check::run(sub, config),
        Some(("create", sub)) => commands::create::run(sub, config).await.map(|_| true),
        Some(("get", sub)) => commands::get::run(sub, config).await.map(|_| true),
        Some(("list", _)) => commands::list::run(config).await.map(|_| true),
        _ => Ok(true),
    }
}

#[tokio::main]
async fn main() {
    let matches = cli().get_matches();

    let config_path = matches.get_one::<String>("config").map(Path::new);
    let config = match InterchangeConfig::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };
    init_logging(&config.logging.level);

    match dispatch(&matches, config).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
