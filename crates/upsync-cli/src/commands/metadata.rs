use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use upsync_acl::MetadataPointer;
use upsync_keys::Address;

use crate::opts::EndpointOpts;
use crate::output::{print_batch, print_json};

#[derive(Args, Debug)]
pub struct MetadataShowArgs {
    /// Profile account to inspect
    #[arg(long)]
    pub account: Address,

    /// Pointer name, e.g. LSP4Metadata
    #[arg(long, default_value = "LSP4Metadata")]
    pub name: String,
}

#[derive(Serialize)]
struct MetadataOut {
    account: Address,
    name: String,
    key: String,
    pointer: Option<MetadataPointer>,
}

pub async fn cmd_show(opts: &EndpointOpts, args: &MetadataShowArgs) -> Result<()> {
    let reconciler = opts.reconciler()?;
    let pointer = reconciler
        .reader()
        .metadata_pointer(args.account, &args.name)
        .await?;

    if opts.json {
        return print_json(&MetadataOut {
            account: args.account,
            name: args.name.clone(),
            key: upsync_keys::metadata_key(&args.name).to_hex(),
            pointer,
        });
    }

    match pointer {
        None => println!("no {} pointer stored on {}", args.name, args.account),
        Some(pointer) => {
            println!("{} pointer on {}", args.name, args.account);
            println!("  url:  {}", pointer.url);
            println!("  hash: 0x{}", hex::encode(pointer.hash));
            println!("  method: {:?}", pointer.method);
        }
    }
    Ok(())
}

#[derive(Args, Debug)]
pub struct MetadataSetArgs {
    /// Profile account to update
    #[arg(long)]
    pub account: Address,

    /// Pointer name, e.g. LSP4Metadata
    #[arg(long, default_value = "LSP4Metadata")]
    pub name: String,

    /// URL where the JSON document is already published
    #[arg(long)]
    pub url: String,

    /// Local copy of the published JSON document, used for the content hash
    #[arg(long)]
    pub json_file: PathBuf,
}

pub async fn cmd_set(opts: &EndpointOpts, args: &MetadataSetArgs) -> Result<()> {
    let content = fs::read(&args.json_file)
        .with_context(|| format!("read {}", args.json_file.display()))?;
    // The document must parse before its hash is pinned on the ledger.
    serde_json::from_slice::<serde_json::Value>(&content)
        .with_context(|| format!("{} is not valid JSON", args.json_file.display()))?;

    let pointer = MetadataPointer::for_json_content(args.url.clone(), &content);
    let reconciler = opts.reconciler()?;
    let batch = reconciler.plan_metadata_update(args.account, &args.name, &pointer);
    print_batch(&batch, opts.json)
}
