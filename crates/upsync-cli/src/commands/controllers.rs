use anyhow::Result;
use clap::Args;
use serde::Serialize;
use upsync_keys::Address;

use crate::opts::EndpointOpts;
use crate::output::print_json;

#[derive(Args, Debug)]
pub struct ControllersArgs {
    /// Profile account to inspect
    #[arg(long)]
    pub account: Address,
}

#[derive(Serialize)]
struct ControllersOut {
    account: Address,
    count: usize,
    controllers: Vec<Address>,
}

pub async fn cmd_controllers(opts: &EndpointOpts, args: &ControllersArgs) -> Result<()> {
    let reconciler = opts.reconciler()?;
    let controllers = reconciler.reader().controllers(args.account).await?;

    if opts.json {
        return print_json(&ControllersOut {
            account: args.account,
            count: controllers.len(),
            controllers,
        });
    }

    println!("{} controller(s) on {}", controllers.len(), args.account);
    for (index, controller) in controllers.iter().enumerate() {
        println!("  [{index}] {controller}");
    }
    Ok(())
}
