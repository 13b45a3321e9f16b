//! `rep list`: print every stored hash.

use anyhow::Result;
use interchange_core::{InterchangeConfig, Interpreter};

pub async fn run(config: InterchangeConfig) -> Result<()> {
    let interpreter = Interpreter::from_config(config).await?;
    for hash in interpreter.list_interchange_entries().await? {
        println!("{}", hash);
    }
    Ok(())
}
