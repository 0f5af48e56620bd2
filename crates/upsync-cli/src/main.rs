mod commands;
mod opts;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::allowed_calls::AllowedCallsArgs;
use commands::controllers::ControllersArgs;
use commands::grant::GrantArgs;
use commands::metadata::{MetadataSetArgs, MetadataShowArgs};
use commands::permissions::PermissionsArgs;
use commands::revoke::RevokeArgs;
use commands::verify::VerifyArgs;
use opts::EndpointOpts;

#[derive(Parser, Debug)]
#[command(name = "upsync", version, about = "Profile permission & metadata reconciler")]
struct Cli {
    #[command(flatten)]
    opts: EndpointOpts,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show a controller's decoded permission bitmask
    Permissions(PermissionsArgs),

    /// List the account's controller array
    Controllers(ControllersArgs),

    /// Show a controller's allowed-call restrictions
    AllowedCalls(AllowedCallsArgs),

    /// Plan an additive permission grant
    Grant(GrantArgs),

    /// Plan a permission revoke
    Revoke(RevokeArgs),

    /// Metadata pointer commands
    #[command(subcommand)]
    Metadata(MetadataCommand),

    /// Check whether a planned batch has converged on the ledger
    Verify(VerifyArgs),
}

#[derive(Subcommand, Debug)]
enum MetadataCommand {
    /// Show a stored metadata pointer
    Show(MetadataShowArgs),

    /// Plan a full-replace metadata pointer update
    Set(MetadataSetArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let opts = &cli.opts;

    match cli.command {
        Command::Permissions(args) => commands::permissions::cmd_permissions(opts, &args).await,
        Command::Controllers(args) => commands::controllers::cmd_controllers(opts, &args).await,
        Command::AllowedCalls(args) => {
            commands::allowed_calls::cmd_allowed_calls(opts, &args).await
        }
        Command::Grant(args) => commands::grant::cmd_grant(opts, &args).await,
        Command::Revoke(args) => commands::revoke::cmd_revoke(opts, &args).await,
        Command::Metadata(cmd) => match cmd {
            MetadataCommand::Show(args) => commands::metadata::cmd_show(opts, &args).await,
            MetadataCommand::Set(args) => commands::metadata::cmd_set(opts, &args).await,
        },
        Command::Verify(args) => commands::verify::cmd_verify(opts, &args).await,
    }
}
