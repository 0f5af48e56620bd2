//! Output helpers: human-readable text by default, `--json` envelopes for
//! scripting.

use anyhow::Result;
use serde::Serialize;
use upsync_reconciler::WriteBatch;

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a planned batch. The batch is the deliverable: submission happens
/// through external tooling, so the keys and values are printed in full.
pub fn print_batch(batch: &WriteBatch, json: bool) -> Result<()> {
    if json {
        return print_json(batch);
    }
    if batch.is_empty() {
        println!("nothing to do: ledger already matches the requested state");
        return Ok(());
    }
    print!("{batch}");
    Ok(())
}
