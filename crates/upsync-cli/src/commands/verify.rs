use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use upsync_reconciler::{WriteBatch, WriteOp};

use crate::opts::EndpointOpts;
use crate::output::print_json;

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Batch file produced by `grant --json`, `revoke --json`, or
    /// `metadata set --json`
    #[arg(long)]
    pub batch: PathBuf,
}

#[derive(Serialize)]
struct VerifyOut {
    converged: bool,
    total: usize,
    pending: Vec<WriteOp>,
}

pub async fn cmd_verify(opts: &EndpointOpts, args: &VerifyArgs) -> Result<()> {
    let raw = fs::read_to_string(&args.batch)
        .with_context(|| format!("read {}", args.batch.display()))?;
    let batch: WriteBatch = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a batch file", args.batch.display()))?;

    let reconciler = opts.reconciler()?;
    let pending = reconciler.reader().check_converged(&batch).await?;

    if opts.json {
        return print_json(&VerifyOut {
            converged: pending.is_empty(),
            total: batch.len(),
            pending,
        });
    }

    if pending.is_empty() {
        println!("converged: all {} write(s) are visible", batch.len());
    } else {
        println!(
            "not converged: {} of {} write(s) still pending",
            pending.len(),
            batch.len()
        );
        for write in &pending {
            println!("  {} ({})", write.key, write.summary);
        }
        println!("reads may lag a submitted batch; re-run to poll, or re-plan if a concurrent writer landed first");
    }
    Ok(())
}
