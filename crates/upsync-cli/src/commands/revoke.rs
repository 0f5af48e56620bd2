use anyhow::Result;
use clap::Args;
use upsync_keys::Address;

use crate::opts::EndpointOpts;
use crate::output::print_batch;

#[derive(Args, Debug)]
pub struct RevokeArgs {
    /// Profile account to revoke on
    #[arg(long)]
    pub account: Address,

    /// Controller losing the capabilities
    #[arg(long)]
    pub controller: Address,

    /// Capability name to revoke; repeatable
    #[arg(long = "permission", required = true)]
    pub permissions: Vec<String>,
}

pub async fn cmd_revoke(opts: &EndpointOpts, args: &RevokeArgs) -> Result<()> {
    let reconciler = opts.reconciler()?;
    let batch = reconciler
        .plan_revoke(args.account, args.controller, &args.permissions)
        .await?;
    print_batch(&batch, opts.json)
}
