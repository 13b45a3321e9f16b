//! Interpreter facade: the operations callers invoke.
//!
//! Each request moves through `Received -> Lexed -> Parsed -> Validated ->
//! Stored -> Done`, short-circuiting to `Rejected` on the first failure.
//! Stage transitions are emitted as `tracing` events.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::config::{InterchangeConfig, StoreBackend};
use crate::dsl::{tokenize, validate, Expr, Parser, MAX_SUPPORTED_DEPTH};
use crate::entry::InterchangeEntry;
use crate::error::{InterchangeError, Result, SetupError, ValidationError};
use crate::hash::EntryHash;
use crate::store::{EntryStore, FileEntryStore, MemoryEntryStore, SettlingEntryStore};

/// Pipeline stage of a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Received,
    Lexed,
    Parsed,
    Validated,
    Stored,
    Done,
    Rejected,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::Lexed => "lexed",
            Stage::Parsed => "parsed",
            Stage::Validated => "validated",
            Stage::Stored => "stored",
            Stage::Done => "done",
            Stage::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

pub struct Interpreter {
    store: Arc<dyn EntryStore>,
    config: InterchangeConfig,
}

impl Interpreter {
    pub fn new(store: Arc<dyn EntryStore>, config: InterchangeConfig) -> Self {
        Self { store, config }
    }

    /// Interpreter over a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryEntryStore::new()),
            InterchangeConfig::in_memory(),
        )
    }

    /// Validate `config`, build its store backend and wrap it in an interpreter.
    pub async fn from_config(config: InterchangeConfig) -> std::result::Result<Self, SetupError> {
        config.validate()?;
        let settle = config.store.settle_delay;
        let store: Arc<dyn EntryStore> = match (config.store.backend, settle) {
            (StoreBackend::Memory, None) => Arc::new(MemoryEntryStore::new()),
            (StoreBackend::Memory, Some(delay)) => {
                Arc::new(SettlingEntryStore::new(MemoryEntryStore::new(), delay))
            }
            (StoreBackend::File, None) => Arc::new(FileEntryStore::open(&config.store.path).await?),
            (StoreBackend::File, Some(delay)) => Arc::new(SettlingEntryStore::new(
                FileEntryStore::open(&config.store.path).await?,
                delay,
            )),
        };
        tracing::debug!(
            backend = ?config.store.backend,
            settle = ?settle,
            "Interchange store ready"
        );
        Ok(Self::new(store, config))
    }

    pub fn store(&self) -> &Arc<dyn EntryStore> {
        &self.store
    }

    pub fn config(&self) -> &InterchangeConfig {
        &self.config
    }

    /// Lex, parse and validate `source`, returning the tree.
    pub fn check(&self, source: &str) -> Result<Expr> {
        tracing::debug!(stage = %Stage::Received, bytes = source.len());

        let tokens = tokenize(source);
        tracing::debug!(stage = %Stage::Lexed, tokens = tokens.len());

        let expr = Parser::new(tokens)
            .with_max_depth(self.max_depth())
            .parse()
            .map_err(|e| rejected(e.into()))?;
        tracing::debug!(stage = %Stage::Parsed, nodes = expr.node_count());

        validate(&expr).map_err(|e| rejected(e.into()))?;
        tracing::debug!(stage = %Stage::Validated);

        Ok(expr)
    }

    /// `true` iff `source` lexes, parses and validates.
    pub fn test_output(&self, source: &str) -> bool {
        self.check(source).is_ok()
    }

    /// Run the full pipeline on `source` and store the result.
    ///
    /// `args` are hashes of entries that must already be visible in the store.
    pub async fn create_interchange_entry_parse(
        &self,
        source: &str,
        args: &[EntryHash],
    ) -> Result<EntryHash> {
        let parsed = self.check(source)?;
        let entry = InterchangeEntry::new(source, parsed).with_operands(args.to_vec());
        self.store_entry(entry).await
    }

    /// Store an already built tree; its operator is the canonical rendering.
    pub async fn create_interchange_entry(&self, expr: Expr, args: &[EntryHash]) -> Result<EntryHash> {
        let limit = self.max_depth();
        if expr.exceeds_depth(limit) {
            return Err(rejected(ValidationError::NestingTooDeep { limit }.into()));
        }
        validate(&expr).map_err(|e| rejected(e.into()))?;
        // A valid tree renders to text that parses back to the same tree.
        let operator = expr.to_string();
        let parsed = self.check(&operator)?;
        let entry = InterchangeEntry::new(operator, parsed).with_operands(args.to_vec());
        self.store_entry(entry).await
    }

    /// Fetch an entry and re-derive its tree from the stored operator.
    pub async fn get_interchange_entry(&self, hash: &EntryHash) -> Result<InterchangeEntry> {
        let entry = self.store.get(hash).await?;
        self.verified(hash, entry)
    }

    /// Like [`Interpreter::get_interchange_entry`], but waits for the entry to
    /// become visible according to the configured visibility policy.
    pub async fn await_interchange_entry(&self, hash: &EntryHash) -> Result<InterchangeEntry> {
        let policy = self.config.visibility.policy();
        let entry = self.store.await_visible(hash, &policy).await?;
        self.verified(hash, entry)
    }

    pub async fn list_interchange_entries(&self) -> Result<Vec<EntryHash>> {
        Ok(self.store.hashes().await?)
    }

    fn max_depth(&self) -> usize {
        self.config.parser.max_depth.min(MAX_SUPPORTED_DEPTH)
    }

    async fn store_entry(&self, entry: InterchangeEntry) -> Result<EntryHash> {
        for operand in &entry.operands {
            if !self.store.contains(operand).await? {
                return Err(rejected(InterchangeError::MissingOperand(*operand)));
            }
        }

        let hash = self
            .store
            .put(&entry)
            .await
            .map_err(|e| rejected(e.into()))?;
        tracing::debug!(stage = %Stage::Stored, %hash);
        tracing::debug!(stage = %Stage::Done, %hash, operands = entry.operands.len());
        Ok(hash)
    }

    fn verified(&self, hash: &EntryHash, entry: InterchangeEntry) -> Result<InterchangeEntry> {
        // Entries stored under an older, larger depth limit must still verify.
        entry.verify(hash, MAX_SUPPORTED_DEPTH).map_err(|e| {
            tracing::warn!(%hash, error = %e, "Stored entry failed re-validation");
            InterchangeError::from(e)
        })?;
        Ok(entry)
    }
}

fn rejected(error: InterchangeError) -> InterchangeError {
    tracing::debug!(
        stage = %Stage::Rejected,
        from = %error.rejected_at(),
        error = %error
    );
    error
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use crate::error::{ParseError, StoreError};
    use std::time::Duration;

    const LAMBDA: &str = "(lam [x] (if x 1 2))";

    #[test]
    fn test_output_accepts_lambda() {
        assert!(Interpreter::in_memory().test_output(LAMBDA));
    }

    #[test]
    fn test_output_rejects_garbage() {
        assert!(!Interpreter::in_memory().test_output("$$$$$!"));
    }

    #[tokio::test]
    async fn test_create_then_get_returns_original_operator() {
        let interpreter = Interpreter::in_memory();
        let hash = interpreter
            .create_interchange_entry_parse(LAMBDA, &[])
            .await
            .unwrap();
        let entry = interpreter.get_interchange_entry(&hash).await.unwrap();
        assert_eq!(entry.operator, LAMBDA);
        assert!(entry.operands.is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_garbage() {
        let interpreter = Interpreter::in_memory();
        let err = interpreter
            .create_interchange_entry_parse("$$$$$!", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, InterchangeError::Parse(ParseError::Syntax { .. })));
        assert_eq!(err.rejected_at(), Stage::Lexed);
        assert!(interpreter.list_interchange_entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_unknown_hash_is_not_found() {
        let interpreter = Interpreter::in_memory();
        let hash = EntryHash::of(b"never put");
        let err = interpreter.get_interchange_entry(&hash).await.unwrap_err();
        assert_eq!(err, InterchangeError::Store(StoreError::NotFound(hash)));
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_operator_is_kept_byte_for_byte() {
        let interpreter = Interpreter::in_memory();
        let spaced = "  (lam [x]\n\t(if x 1 2))  ";
        let a = interpreter
            .create_interchange_entry_parse(spaced, &[])
            .await
            .unwrap();
        let b = interpreter
            .create_interchange_entry_parse(LAMBDA, &[])
            .await
            .unwrap();

        // Same tree, different source text: distinct entries.
        assert_ne!(a, b);
        assert_eq!(
            interpreter.get_interchange_entry(&a).await.unwrap().operator,
            spaced
        );
    }

    #[tokio::test]
    async fn test_create_is_idempotent() {
        let interpreter = Interpreter::in_memory();
        let first = interpreter
            .create_interchange_entry_parse(LAMBDA, &[])
            .await
            .unwrap();
        let second = interpreter
            .create_interchange_entry_parse(LAMBDA, &[])
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(interpreter.list_interchange_entries().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_validation_failure_is_rejected() {
        let interpreter = Interpreter::in_memory();
        assert!(!interpreter.test_output("(lam [x x] x)"));
        let err = interpreter
            .create_interchange_entry_parse("(lam [x x] x)", &[])
            .await
            .unwrap_err();
        assert_eq!(
            err,
            InterchangeError::Validation(ValidationError::DuplicateParam { name: "x".into() })
        );
        assert_eq!(err.rejected_at(), Stage::Parsed);
    }

    #[tokio::test]
    async fn test_operands_must_exist() {
        let interpreter = Interpreter::in_memory();
        let base = interpreter
            .create_interchange_entry_parse("(lam [f] f)", &[])
            .await
            .unwrap();

        let applied = interpreter
            .create_interchange_entry_parse("(g 1)", &[base])
            .await
            .unwrap();
        assert_eq!(
            interpreter.get_interchange_entry(&applied).await.unwrap().operands,
            vec![base]
        );

        let missing = EntryHash::of(b"missing");
        let err = interpreter
            .create_interchange_entry_parse("(g 1)", &[base, missing])
            .await
            .unwrap_err();
        assert_eq!(err, InterchangeError::MissingOperand(missing));
        assert_eq!(err.rejected_at(), Stage::Validated);
    }

    #[tokio::test]
    async fn test_create_from_tree_uses_canonical_rendering() {
        let interpreter = Interpreter::in_memory();
        let expr = Expr::lambda(
            ["x"],
            Expr::if_then_else(Expr::symbol("x"), Expr::int(1), Expr::int(2)),
        );
        let hash = interpreter
            .create_interchange_entry(expr.clone(), &[])
            .await
            .unwrap();
        let entry = interpreter.get_interchange_entry(&hash).await.unwrap();
        assert_eq!(entry.operator, LAMBDA);
        assert_eq!(entry.parsed, expr);

        // Same canonical text as the parsed route, so the same entry.
        let parsed_hash = interpreter
            .create_interchange_entry_parse(LAMBDA, &[])
            .await
            .unwrap();
        assert_eq!(parsed_hash, hash);
    }

    #[tokio::test]
    async fn test_create_from_invalid_tree() {
        let interpreter = Interpreter::in_memory();
        let bad = Expr::lambda(["y", "y"], Expr::symbol("y"));
        assert!(matches!(
            interpreter.create_interchange_entry(bad, &[]).await,
            Err(InterchangeError::Validation(ValidationError::DuplicateParam { .. }))
        ));

        // Would render as `(f x)` and parse back as a different tree.
        let unrenderable = Expr::apply(Expr::symbol("f x"), vec![]);
        assert_eq!(
            interpreter.create_interchange_entry(unrenderable, &[]).await,
            Err(InterchangeError::Validation(ValidationError::InvalidName {
                name: "f x".into()
            }))
        );
    }

    #[tokio::test]
    async fn test_get_detects_tree_that_disagrees_with_operator() {
        let store = Arc::new(MemoryEntryStore::new());
        let interpreter = Interpreter::new(store.clone(), InterchangeConfig::in_memory());

        let forged = InterchangeEntry::new("(f 1)", Expr::symbol("g"));
        let (hash, bytes) = codec::encode_with_hash(&forged).unwrap();
        store.write_bytes(hash, bytes).await.unwrap();

        assert!(matches!(
            interpreter.get_interchange_entry(&hash).await,
            Err(InterchangeError::Store(StoreError::Integrity { .. }))
        ));
    }

    #[tokio::test]
    async fn test_nesting_limit_from_config() {
        let mut config = InterchangeConfig::in_memory();
        config.parser.max_depth = 2;
        let interpreter = Interpreter::new(Arc::new(MemoryEntryStore::new()), config);
        assert!(interpreter.test_output("(f (g x))"));
        assert!(matches!(
            interpreter.check("(f (g (h x)))"),
            Err(InterchangeError::Parse(ParseError::NestingTooDeep { limit: 2, .. }))
        ));
    }

    fn nested(depth: usize) -> String {
        format!("{}x{}", "(f ".repeat(depth), ")".repeat(depth))
    }

    #[tokio::test]
    async fn test_depth_above_codec_limit_is_capped() {
        let mut config = InterchangeConfig::in_memory();
        config.parser.max_depth = 60;
        let interpreter = Interpreter::new(Arc::new(MemoryEntryStore::new()), config);

        let hash = interpreter
            .create_interchange_entry_parse(&nested(MAX_SUPPORTED_DEPTH), &[])
            .await
            .unwrap();
        assert!(interpreter.get_interchange_entry(&hash).await.is_ok());

        let err = interpreter
            .create_interchange_entry_parse(&nested(50), &[])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            InterchangeError::Parse(ParseError::NestingTooDeep {
                limit: MAX_SUPPORTED_DEPTH,
                ..
            })
        ));
        assert_eq!(interpreter.list_interchange_entries().await.unwrap(), vec![hash]);
    }

    #[tokio::test]
    async fn test_from_config_rejects_invalid_config() {
        let mut config = InterchangeConfig::in_memory();
        config.parser.max_depth = 60;
        assert!(matches!(
            Interpreter::from_config(config).await,
            Err(SetupError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_create_from_deep_tree_is_rejected_before_rendering() {
        let interpreter = Interpreter::in_memory();
        let mut expr = Expr::symbol("x");
        for _ in 0..5_000 {
            expr = Expr::apply(Expr::symbol("f"), vec![expr]);
        }
        let err = interpreter
            .create_interchange_entry(expr, &[])
            .await
            .unwrap_err();
        assert_eq!(
            err,
            InterchangeError::Validation(ValidationError::NestingTooDeep { limit: 32 })
        );
        assert_eq!(err.rejected_at(), Stage::Parsed);
        assert!(interpreter.list_interchange_entries().await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_await_entry_through_settling_store() {
        let mut config = InterchangeConfig::in_memory();
        config.store.settle_delay = Some(Duration::from_millis(200));
        config.visibility.poll_interval = Duration::from_millis(50);
        config.visibility.timeout = Duration::from_secs(1);

        let interpreter = Interpreter::from_config(config).await.unwrap();
        let hash = interpreter
            .create_interchange_entry_parse(LAMBDA, &[])
            .await
            .unwrap();

        assert!(interpreter.get_interchange_entry(&hash).await.unwrap_err().is_not_found());
        let entry = interpreter.await_interchange_entry(&hash).await.unwrap();
        assert_eq!(entry.operator, LAMBDA);
    }

    #[tokio::test]
    async fn test_file_backend_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = InterchangeConfig::default();
        config.store.path = dir.path().join("entries");

        let hash = {
            let interpreter = Interpreter::from_config(config.clone()).await.unwrap();
            interpreter
                .create_interchange_entry_parse(LAMBDA, &[])
                .await
                .unwrap()
        };

        let interpreter = Interpreter::from_config(config).await.unwrap();
        assert_eq!(
            interpreter.list_interchange_entries().await.unwrap(),
            vec![hash]
        );
        assert_eq!(
            interpreter.get_interchange_entry(&hash).await.unwrap().operator,
            LAMBDA
        );
    }
}
