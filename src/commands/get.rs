//! `rep get`: print an entry as JSON.

use anyhow::{Context, Result};
use clap::ArgMatches;
use interchange_core::{EntryHash, InterchangeConfig, InterchangeEntry, Interpreter};
use interchange_proto::EntryRecord;

pub async fn run(matches: &ArgMatches, config: InterchangeConfig) -> Result<()> {
    let hash_arg = matches
        .get_one::<String>("hash")
        .context("A hash is required")?;
    let hash: EntryHash = hash_arg
        .parse()
        .with_context(|| format!("Invalid hash {}", hash_arg))?;

    let interpreter = Interpreter::from_config(config).await?;
    let entry = if matches.get_flag("wait") {
        interpreter.await_interchange_entry(&hash).await?
    } else {
        interpreter.get_interchange_entry(&hash).await?
    };

    println!("{}", serde_json::to_string_pretty(&record(hash, entry)?)?);
    Ok(())
}

fn record(hash: EntryHash, entry: InterchangeEntry) -> Result<EntryRecord> {
    Ok(EntryRecord {
        hash: hash.to_string(),
        operator: entry.operator,
        parsed: serde_json::to_value(&entry.parsed)?,
        operands: entry.operands.iter().map(ToString::to_string).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use interchange_core::parse;

    #[test]
    fn test_record_shape() {
        let source = "(f 1)";
        let operand = EntryHash::of(b"operand");
        let entry =
            InterchangeEntry::new(source, parse(source).unwrap()).with_operands(vec![operand]);
        let hash = EntryHash::of(b"entry");

        let record = record(hash, entry).unwrap();
        assert_eq!(record.hash, hash.to_string());
        assert_eq!(record.operator, source);
        assert_eq!(record.operands, vec![operand.to_string()]);
        assert_eq!(
            record.parsed,
            serde_json::json!({
                "Apply": { "operator": { "Symbol": "f" }, "args": [{ "IntLiteral": 1 }] }
            })
        );
    }
}
