use anyhow::{Context, Result, anyhow};
use clap::Args;
use upsync_acl::{AllowedCallEntry, CallType, CallTypes, FunctionSelector, InterfaceId};
use upsync_keys::Address;
use upsync_reconciler::GrantRequest;

use crate::opts::EndpointOpts;
use crate::output::print_batch;

#[derive(Args, Debug)]
pub struct GrantArgs {
    /// Profile account to grant on
    #[arg(long)]
    pub account: Address,

    /// Controller receiving the grant
    #[arg(long)]
    pub controller: Address,

    /// Capability name to grant; repeatable (e.g. --permission CALL)
    #[arg(long = "permission", required = true)]
    pub permissions: Vec<String>,

    /// Allowed-call restriction to append, as `TARGET:SIGNATURE` (signature
    /// `*` for any function); repeatable
    #[arg(long = "allow-call")]
    pub allow_calls: Vec<String>,
}

/// Parse `0xTARGET:mint(address,uint256)` into an entry with CALL type and
/// any-interface wildcard, matching how the operator scripts framed these.
fn parse_allow_call(spec: &str) -> Result<AllowedCallEntry> {
    let (target, signature) = spec
        .split_once(':')
        .ok_or_else(|| anyhow!("expected TARGET:SIGNATURE, got '{spec}'"))?;
    let target = Address::from_hex_str(target)
        .with_context(|| format!("bad target address in '{spec}'"))?;
    let selector = if signature == "*" {
        FunctionSelector::ANY
    } else {
        FunctionSelector::of_signature(signature)
    };
    Ok(AllowedCallEntry {
        call_types: CallTypes::new(&[CallType::Call]),
        target,
        interface_id: InterfaceId::ANY,
        selector,
    })
}

pub async fn cmd_grant(opts: &EndpointOpts, args: &GrantArgs) -> Result<()> {
    let mut request = GrantRequest::capabilities(args.permissions.clone());
    for spec in &args.allow_calls {
        request = request.with_allowed_call(parse_allow_call(spec)?);
    }

    let reconciler = opts.reconciler()?;
    let batch = reconciler
        .plan_grant(args.account, args.controller, &request)
        .await?;
    print_batch(&batch, opts.json)
}
