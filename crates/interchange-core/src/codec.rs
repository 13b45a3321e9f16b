//! Canonical byte encoding of interchange entries.
//!
//! Entries are written as compact JSON with a fixed field order:
//! `{"version":1,"operator":..,"parsed":..,"operands":[..]}`. Only structs and
//! sequences are involved, so the same entry always produces the same bytes
//! and therefore the same [`EntryHash`].

use serde::{Deserialize, Serialize};

use crate::dsl::Expr;
use crate::entry::InterchangeEntry;
use crate::error::{DecodeError, EncodeError};
use crate::hash::EntryHash;

/// Current entry format version.
pub const ENTRY_FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct EncodedEntry<'a> {
    version: u32,
    operator: &'a str,
    parsed: &'a Expr,
    operands: &'a [EntryHash],
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct DecodedEntry {
    version: u32,
    operator: String,
    parsed: Expr,
    operands: Vec<EntryHash>,
}

#[derive(Deserialize)]
struct VersionHeader {
    version: u32,
}

/// Encode an entry into its canonical bytes.
pub fn encode(entry: &InterchangeEntry) -> Result<Vec<u8>, EncodeError> {
    let encoded = EncodedEntry {
        version: ENTRY_FORMAT_VERSION,
        operator: &entry.operator,
        parsed: &entry.parsed,
        operands: &entry.operands,
    };
    serde_json::to_vec(&encoded).map_err(|e| EncodeError(e.to_string()))
}

/// Encode an entry and digest the result.
pub fn encode_with_hash(entry: &InterchangeEntry) -> Result<(EntryHash, Vec<u8>), EncodeError> {
    let bytes = encode(entry)?;
    Ok((EntryHash::of(&bytes), bytes))
}

/// Decode canonical bytes back into an entry.
///
/// Input that decodes but would not re-encode to the same bytes is rejected,
/// so a successful decode always corresponds to exactly one hash.
pub fn decode(bytes: &[u8]) -> Result<InterchangeEntry, DecodeError> {
    let header: VersionHeader =
        serde_json::from_slice(bytes).map_err(|e| DecodeError::Corrupt(e.to_string()))?;
    if header.version != ENTRY_FORMAT_VERSION {
        return Err(DecodeError::UnsupportedVersion(header.version));
    }

    let decoded: DecodedEntry =
        serde_json::from_slice(bytes).map_err(|e| DecodeError::Corrupt(e.to_string()))?;
    let entry = InterchangeEntry {
        operator: decoded.operator,
        parsed: decoded.parsed,
        operands: decoded.operands,
    };

    let canonical = encode(&entry).map_err(|e| DecodeError::Corrupt(e.to_string()))?;
    if canonical != bytes {
        return Err(DecodeError::Corrupt("non-canonical encoding".to_string()));
    }
    Ok(entry)
}
