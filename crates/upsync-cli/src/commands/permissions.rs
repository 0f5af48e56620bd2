use anyhow::Result;
use clap::Args;
use serde::Serialize;
use upsync_acl::decode_permissions;
use upsync_keys::Address;

use crate::opts::EndpointOpts;
use crate::output::print_json;

#[derive(Args, Debug)]
pub struct PermissionsArgs {
    /// Profile account to inspect
    #[arg(long)]
    pub account: Address,

    /// Controller whose permissions to decode
    #[arg(long)]
    pub controller: Address,
}

#[derive(Serialize)]
struct PermissionsOut {
    account: Address,
    controller: Address,
    bitmask: String,
    granted: Vec<String>,
    unknown_bits: Option<String>,
}

pub async fn cmd_permissions(opts: &EndpointOpts, args: &PermissionsArgs) -> Result<()> {
    let reconciler = opts.reconciler()?;
    let mask = reconciler
        .reader()
        .permissions(args.account, args.controller)
        .await?;
    let decoded = decode_permissions(mask);
    let granted: Vec<String> = decoded.granted().iter().map(|p| p.to_string()).collect();

    if opts.json {
        return print_json(&PermissionsOut {
            account: args.account,
            controller: args.controller,
            bitmask: mask.to_hex(),
            granted,
            unknown_bits: (!decoded.unknown_bits.is_zero())
                .then(|| decoded.unknown_bits.to_hex()),
        });
    }

    println!("permissions of {} on {}", args.controller, args.account);
    println!("  bitmask: {}", mask.to_hex());
    if granted.is_empty() {
        println!("  granted: (none)");
    } else {
        println!("  granted: {}", granted.join(", "));
    }
    if !decoded.unknown_bits.is_zero() {
        println!("  unknown bits: {}", decoded.unknown_bits.to_hex());
    }
    Ok(())
}
