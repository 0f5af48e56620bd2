use anyhow::Result;
use clap::Args;
use serde::Serialize;
use upsync_acl::AllowedCallEntry;
use upsync_keys::Address;

use crate::opts::EndpointOpts;
use crate::output::print_json;

#[derive(Args, Debug)]
pub struct AllowedCallsArgs {
    /// Profile account to inspect
    #[arg(long)]
    pub account: Address,

    /// Controller whose allowed calls to list
    #[arg(long)]
    pub controller: Address,
}

#[derive(Serialize)]
struct AllowedCallsOut {
    account: Address,
    controller: Address,
    entries: Vec<AllowedCallEntry>,
}

pub async fn cmd_allowed_calls(opts: &EndpointOpts, args: &AllowedCallsArgs) -> Result<()> {
    let reconciler = opts.reconciler()?;
    let entries = reconciler
        .reader()
        .allowed_calls(args.account, args.controller)
        .await?;

    if opts.json {
        return print_json(&AllowedCallsOut {
            account: args.account,
            controller: args.controller,
            entries,
        });
    }

    println!(
        "{} allowed call(s) for {} on {}",
        entries.len(),
        args.controller,
        args.account
    );
    for entry in &entries {
        println!(
            "  target {} selector {:?} interface {:?} call-types 0x{}",
            entry.target,
            entry.selector,
            entry.interface_id,
            hex::encode(entry.call_types.to_bytes()),
        );
    }
    Ok(())
}
