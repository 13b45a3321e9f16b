//! Parser, validator and content-addressed entry store for the
//! rep_interchange DSL.

pub mod codec;
pub mod config;
pub mod dsl;
pub mod entry;
pub mod error;
pub mod hash;
pub mod interpreter;
pub mod store;

pub use config::{ConfigError, InterchangeConfig, StoreBackend};
pub use dsl::{parse, validate, Expr};
pub use entry::InterchangeEntry;
pub use error::{
    DecodeError, EncodeError, InterchangeError, ParseError, Result, SetupError, StoreError,
    ValidationError,
};
pub use hash::{EntryHash, HashParseError};
pub use interpreter::{Interpreter, Stage};
pub use store::{
    EntryStore, FileEntryStore, MemoryEntryStore, SettlingEntryStore, VisibilityPolicy,
};
