//! `rep` subcommands.

pub mod check;
pub mod create;
pub mod get;
pub mod list;

use anyhow::{anyhow, Context, Result};
use clap::ArgMatches;

/// Program text from `--file` or `--content`.
pub fn read_source(matches: &ArgMatches) -> Result<String> {
    if let Some(file) = matches.get_one::<String>("file") {
        std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file))
    } else if let Some(content) = matches.get_one::<String>("content") {
        Ok(content.clone())
    } else {
        Err(anyhow!("Either --file or --content must be provided"))
    }
}
