use thiserror::Error;

use crate::config::ConfigError;
use crate::hash::EntryHash;
use crate::interpreter::Stage;

/// Structural errors reported by the parser.
///
/// Every variant carries the 1-based line and column of the token that
/// triggered it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Syntax error at line {line}, column {column}: {message}")]
    Syntax {
        message: String,
        line: usize,
        column: usize,
    },
    #[error("Malformed lambda at line {line}, column {column}: {message}")]
    MalformedLambda {
        message: String,
        line: usize,
        column: usize,
    },
    #[error("Malformed if at line {line}, column {column}: {message}")]
    MalformedIf {
        message: String,
        line: usize,
        column: usize,
    },
    #[error("Forms nested deeper than {limit} levels at line {line}, column {column}")]
    NestingTooDeep {
        limit: usize,
        line: usize,
        column: usize,
    },
}

impl ParseError {
    /// Line and column the error points at.
    pub fn position(&self) -> (usize, usize) {
        match self {
            ParseError::Syntax { line, column, .. }
            | ParseError::MalformedLambda { line, column, .. }
            | ParseError::MalformedIf { line, column, .. }
            | ParseError::NestingTooDeep { line, column, .. } => (*line, *column),
        }
    }
}

/// Shape errors found after a successful parse.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Duplicate lambda parameter: {name}")]
    DuplicateParam { name: String },
    #[error("Reserved keyword used as a name: {name}")]
    ReservedName { name: String },
    #[error("Not a valid symbol: {name:?}")]
    InvalidName { name: String },
    #[error("Tree nests more than {limit} forms deep")]
    NestingTooDeep { limit: usize },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Failed to encode entry: {0}")]
pub struct EncodeError(pub String);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Corrupt entry encoding: {0}")]
    Corrupt(String),
    #[error("Unsupported entry format version: {0}")]
    UnsupportedVersion(u32),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Entry not found: {0}")]
    NotFound(EntryHash),
    #[error("Integrity check failed for {hash}: {reason}")]
    Integrity { hash: EntryHash, reason: String },
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),
    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for StoreError {
    fn from(error: std::io::Error) -> Self {
        StoreError::Io(error.to_string())
    }
}

/// Umbrella error for the parse, validate and store pipeline.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InterchangeError {
    #[error("Parsing failed: {0}")]
    Parse(#[from] ParseError),
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("Operand does not resolve to a stored entry: {0}")]
    MissingOperand(EntryHash),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl InterchangeError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, InterchangeError::Store(StoreError::NotFound(_)))
    }

    /// The last stage the pipeline reached before it was rejected.
    pub fn rejected_at(&self) -> Stage {
        match self {
            InterchangeError::Parse(_) => Stage::Lexed,
            InterchangeError::Validation(_) => Stage::Parsed,
            InterchangeError::MissingOperand(_) | InterchangeError::Store(_) => Stage::Validated,
        }
    }
}

pub type Result<T> = std::result::Result<T, InterchangeError>;

/// Failure to build an interpreter from configuration.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
