//! JSON-RPC wire types for the rep_interchange caller boundary.
//!
//! One JSON object per line in each direction. Hashes travel as lowercase
//! hex strings and parsed trees as plain JSON values, so clients need no
//! knowledge of the core types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Method names understood by the server.
pub mod methods {
    pub const TEST_OUTPUT: &str = "test_output";
    pub const CHECK: &str = "check";
    pub const CREATE_INTERCHANGE_ENTRY_PARSE: &str = "create_interchange_entry_parse";
    pub const GET_INTERCHANGE_ENTRY: &str = "get_interchange_entry";
    pub const AWAIT_INTERCHANGE_ENTRY: &str = "await_interchange_entry";
    pub const LIST_INTERCHANGE_ENTRIES: &str = "list_interchange_entries";
}

/// Error codes carried in [`ErrorObject::code`].
pub mod codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
    /// The pipeline rejected the input; `data` names the stage.
    pub const REJECTED: i32 = -32000;
    pub const NOT_FOUND: i32 = -32004;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: u64,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id: u64,
    pub result: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub id: u64,
    pub error: ErrorObject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A line read back by a client: either outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerMessage {
    Error(ErrorResponse),
    Response(Response),
}

impl ServerMessage {
    pub fn id(&self) -> u64 {
        match self {
            ServerMessage::Error(e) => e.id,
            ServerMessage::Response(r) => r.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestOutputParams {
    pub params_string: String,
}

/// Outcome of `check`: acceptance plus either the canonical rendering or
/// the rejection reason and stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub accepted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateEntryParams {
    pub expr: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Params for `get_interchange_entry` and `await_interchange_entry`:
/// either a bare hash string or `{ "hash": ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryRef {
    Bare(String),
    Named { hash: String },
}

impl EntryRef {
    pub fn hash(&self) -> &str {
        match self {
            EntryRef::Bare(hash) | EntryRef::Named { hash } => hash,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryRecord {
    pub hash: String,
    pub operator: String,
    pub parsed: Value,
    #[serde(default)]
    pub operands: Vec<String>,
}

/// Transcript line for a command typed into the REPL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandLog {
    pub timestamp: String,
    pub command: String,
}

/// Transcript line for output shown by the REPL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLog {
    pub timestamp: String,
    pub output: String,
}
