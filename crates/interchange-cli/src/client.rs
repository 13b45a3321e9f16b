use anyhow::{anyhow, Result};
use interchange_proto::{
    methods, CheckResult, CreateEntryParams, EntryRecord, EntryRef, Request, ServerMessage,
    TestOutputParams,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

/// Talks to a `--stdio` server spawned from this executable.
pub struct Client {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    request_id: u64,
}

impl Client {
    pub fn new(config_path: Option<&Path>) -> Result<Self> {
        let mut cmd = Command::new(std::env::current_exe()?);
        cmd.arg("--stdio");
        if let Some(path) = config_path {
            cmd.arg("--config").arg(path);
        }
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());

        let mut child = cmd.spawn()?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("Server stdin unavailable"))?;
        let stdout = BufReader::new(
            child
                .stdout
                .take()
                .ok_or_else(|| anyhow!("Server stdout unavailable"))?,
        );

        Ok(Self {
            child,
            stdin,
            stdout,
            request_id: 0,
        })
    }

    pub fn check(&mut self, source: &str) -> Result<CheckResult> {
        self.call(
            methods::CHECK,
            serde_json::to_value(TestOutputParams {
                params_string: source.to_string(),
            })?,
        )
    }

    pub fn create(&mut self, source: &str, args: &[String]) -> Result<String> {
        self.call(
            methods::CREATE_INTERCHANGE_ENTRY_PARSE,
            serde_json::to_value(CreateEntryParams {
                expr: source.to_string(),
                args: args.to_vec(),
            })?,
        )
    }

    pub fn get(&mut self, hash: &str) -> Result<EntryRecord> {
        self.call(
            methods::GET_INTERCHANGE_ENTRY,
            serde_json::to_value(EntryRef::Named {
                hash: hash.to_string(),
            })?,
        )
    }

    pub fn await_entry(&mut self, hash: &str) -> Result<EntryRecord> {
        self.call(
            methods::AWAIT_INTERCHANGE_ENTRY,
            serde_json::to_value(EntryRef::Named {
                hash: hash.to_string(),
            })?,
        )
    }

    pub fn list(&mut self) -> Result<Vec<String>> {
        self.call(methods::LIST_INTERCHANGE_ENTRIES, Value::Null)
    }

    fn call<T: DeserializeOwned>(&mut self, method: &str, params: Value) -> Result<T> {
        self.request_id += 1;
        let request = Request {
            id: self.request_id,
            method: method.to_string(),
            params,
        };

        let request_json = serde_json::to_string(&request)? + "\n";
        self.stdin.write_all(request_json.as_bytes())?;
        self.stdin.flush()?;

        let mut line = String::new();
        if self.stdout.read_line(&mut line)? == 0 {
            return Err(anyhow!("Server closed the connection"));
        }

        match serde_json::from_str::<ServerMessage>(&line)? {
            ServerMessage::Response(response) => Ok(serde_json::from_value(response.result)?),
            ServerMessage::Error(response) => {
                let error = response.error;
                match error.data {
                    Some(data) => Err(anyhow!("{} ({})", error.message, data)),
                    None => Err(anyhow!("{}", error.message)),
                }
            }
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.child.kill().ok();
    }
}
