use anyhow::Result;
use chrono::Utc;
use interchange_proto::{CommandLog, OutputLog};
use std::fs::{File, OpenOptions};
use std::io::Write;

/// REPL session state: the transcript recorder and the last created hash.
#[derive(Default)]
pub struct SessionManager {
    recorder: Option<File>,
    last_hash: Option<String>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_hash(&self) -> Option<&str> {
        self.last_hash.as_deref()
    }

    pub fn set_last_hash(&mut self, hash: &str) {
        self.last_hash = Some(hash.to_string());
    }

    /// An explicit hash, or the last one created in this session.
    pub fn resolve_hash<'a>(&'a self, explicit: Option<&'a str>) -> Option<&'a str> {
        explicit.or(self.last_hash())
    }

    pub fn start_recording(&mut self, path: &str) -> Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        self.recorder = Some(file);
        Ok(())
    }

    pub fn stop_recording(&mut self) {
        self.recorder = None;
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_some()
    }

    pub fn record_command(&mut self, command: &str) {
        if let Some(recorder) = &mut self.recorder {
            let log = CommandLog {
                timestamp: Utc::now().to_rfc3339(),
                command: command.to_string(),
            };
            if let Ok(json) = serde_json::to_string(&log) {
                writeln!(recorder, "{}", json).ok();
            }
        }
    }

    pub fn record_output(&mut self, output: &str) {
        if let Some(recorder) = &mut self.recorder {
            let log = OutputLog {
                timestamp: Utc::now().to_rfc3339(),
                output: output.to_string(),
            };
            if let Ok(json) = serde_json::to_string(&log) {
                writeln!(recorder, "{}", json).ok();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_hash_falls_back_to_last_created() {
        let mut session = SessionManager::new();
        assert_eq!(session.resolve_hash(None), None);
        session.set_last_hash("abc");
        assert_eq!(session.resolve_hash(None), Some("abc"));
        assert_eq!(session.resolve_hash(Some("def")), Some("def"));
    }

    #[test]
    fn test_recording_writes_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcript.jsonl");
        let path_str = path.to_str().unwrap();

        let mut session = SessionManager::new();
        session.record_command("ignored before recording");
        session.start_recording(path_str).unwrap();
        assert!(session.is_recording());
        session.record_command("(lam [x] x)");
        session.record_output("accepted: (lam [x] x)");
        session.stop_recording();
        session.record_output("ignored after recording");

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let command: CommandLog = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(command.command, "(lam [x] x)");
        assert!(chrono::DateTime::parse_from_rfc3339(&command.timestamp).is_ok());

        let output: OutputLog = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(output.output, "accepted: (lam [x] x)");
    }
}
