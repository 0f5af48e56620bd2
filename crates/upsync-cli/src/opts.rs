//! Global CLI options and reconciler construction.

use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use upsync_ledger::{HttpLedger, LedgerConfig, Snapshot};
use upsync_reconciler::{Reconciler, RegistryReader};

/// Connection options shared by every command. Each can be set via env vars,
/// so an `.env` file works the way the original operator tooling did.
#[derive(Args, Debug, Clone)]
pub struct EndpointOpts {
    /// JSON-RPC endpoint URL (env: UPSYNC_RPC_URL)
    #[arg(long, global = true, env = "UPSYNC_RPC_URL", default_value = "")]
    pub rpc_url: String,

    /// Remote read timeout in milliseconds (env: UPSYNC_TIMEOUT_MS)
    #[arg(long, global = true, env = "UPSYNC_TIMEOUT_MS")]
    pub timeout_ms: Option<u64>,

    /// Ledger snapshot: a block number, or latest when omitted
    #[arg(long, global = true)]
    pub block: Option<u64>,

    /// JSON output
    #[arg(long, global = true)]
    pub json: bool,
}

impl EndpointOpts {
    pub fn snapshot(&self) -> Snapshot {
        match self.block {
            Some(number) => Snapshot::Block(number),
            None => Snapshot::Latest,
        }
    }

    pub fn reconciler(&self) -> anyhow::Result<Reconciler> {
        if self.rpc_url.is_empty() {
            anyhow::bail!("no endpoint: pass --rpc-url or set UPSYNC_RPC_URL");
        }
        let mut config = LedgerConfig::new(self.rpc_url.clone());
        if let Some(ms) = self.timeout_ms {
            config = config.with_timeout(Duration::from_millis(ms));
        }
        let ledger = Arc::new(HttpLedger::new(config));
        let reader = RegistryReader::new(ledger).at_snapshot(self.snapshot());
        Ok(Reconciler::with_reader(reader))
    }
}
