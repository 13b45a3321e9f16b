//! The stored record: original source text alongside its parsed tree.

use crate::dsl::{parse_with_max_depth, validate, Expr};
use crate::error::StoreError;
use crate::hash::EntryHash;

/// A content-addressed interchange entry.
///
/// `operator` is the submitted source text, kept byte for byte. `operands`
/// are hashes of other entries this one was created against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterchangeEntry {
    pub operator: String,
    pub parsed: Expr,
    pub operands: Vec<EntryHash>,
}

impl InterchangeEntry {
    pub fn new(operator: impl Into<String>, parsed: Expr) -> Self {
        Self {
            operator: operator.into(),
            parsed,
            operands: Vec::new(),
        }
    }

    pub fn with_operands(mut self, operands: Vec<EntryHash>) -> Self {
        self.operands = operands;
        self
    }

    /// Re-derive the tree from `operator` and compare it with `parsed`.
    pub fn verify(&self, hash: &EntryHash, max_depth: usize) -> Result<(), StoreError> {
        let integrity = |reason: String| StoreError::Integrity {
            hash: *hash,
            reason,
        };

        let reparsed = parse_with_max_depth(&self.operator, max_depth)
            .map_err(|e| integrity(format!("stored operator no longer parses: {}", e)))?;
        validate(&reparsed)
            .map_err(|e| integrity(format!("stored operator no longer validates: {}", e)))?;

        if reparsed != self.parsed {
            return Err(integrity(format!(
                "stored tree does not match operator `{}`",
                self.operator
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::{parse, DEFAULT_MAX_DEPTH};

    #[test]
    fn test_verify_accepts_consistent_entry() {
        let source = "(lam [x]  (if x 1 2))";
        let entry = InterchangeEntry::new(source, parse(source).unwrap());
        let hash = EntryHash::of(source.as_bytes());
        assert!(entry.verify(&hash, DEFAULT_MAX_DEPTH).is_ok());
    }

    #[test]
    fn test_verify_rejects_mismatched_tree() {
        let entry = InterchangeEntry::new("(f 1)", Expr::apply(Expr::symbol("f"), vec![]));
        let hash = EntryHash::of(b"x");
        match entry.verify(&hash, DEFAULT_MAX_DEPTH) {
            Err(StoreError::Integrity { hash: reported, .. }) => assert_eq!(reported, hash),
            other => panic!("expected integrity failure, got {:?}", other),
        }
    }

    #[test]
    fn test_verify_rejects_unparseable_operator() {
        let entry = InterchangeEntry::new("$$$$$!", Expr::symbol("x"));
        assert!(matches!(
            entry.verify(&EntryHash::of(b""), DEFAULT_MAX_DEPTH),
            Err(StoreError::Integrity { .. })
        ));
    }
}
