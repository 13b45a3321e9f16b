//! `rep check`: parse and validate without touching the store.

use anyhow::Result;
use clap::ArgMatches;
use interchange_core::{InterchangeConfig, Interpreter, MemoryEntryStore};
use std::sync::Arc;

use super::read_source;

/// Returns whether the program was accepted.
pub fn run(matches: &ArgMatches, config: InterchangeConfig) -> Result<bool> {
    let source = read_source(matches)?;
    let interpreter = Interpreter::new(Arc::new(MemoryEntryStore::new()), config);
    let (accepted, report) = report(&interpreter, &source);
    println!("{}", report);
    Ok(accepted)
}

fn report(interpreter: &Interpreter, source: &str) -> (bool, String) {
    match interpreter.check(source) {
        Ok(expr) => (true, format!("accepted\n{}", expr)),
        Err(e) => (false, format!("rejected at {}\n{}", e.rejected_at(), e)),
    }
}
