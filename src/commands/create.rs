//! `rep create`: store a program and print its hash.

use anyhow::{Context, Result};
use clap::ArgMatches;
use interchange_core::{EntryHash, InterchangeConfig, Interpreter};

use super::read_source;

pub async fn run(matches: &ArgMatches, config: InterchangeConfig) -> Result<()> {
    let source = read_source(matches)?;
    let args = matches
        .get_many::<String>("arg")
        .into_iter()
        .flatten()
        .map(|arg| {
            arg.parse::<EntryHash>()
                .with_context(|| format!("Invalid operand hash {}", arg))
        })
        .collect::<Result<Vec<_>>>()?;

    let interpreter = Interpreter::from_config(config).await?;
    let hash = interpreter
        .create_interchange_entry_parse(&source, &args)
        .await?;
    println!("{}", hash);
    Ok(())
}
