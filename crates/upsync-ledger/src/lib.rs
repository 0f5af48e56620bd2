//! Remote ledger store abstraction plus in-memory and JSON-RPC backends.
//!
//! The store is a key-value view over profile accounts: byte-string values
//! under 32-byte keys, read at a caller-chosen snapshot. Absence is a normal
//! outcome (`Ok(None)`), never an error; only transport-level failures and
//! malformed responses surface as errors.

mod http;
mod mem;

pub use http::HttpLedger;
pub use mem::MemLedger;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use upsync_keys::{Address, DataKey};

pub type LedgerResult<T> = Result<T, LedgerError>;
pub type DynLedger = Arc<dyn LedgerStore>;

/// Ledger snapshot selector. Reads never assume read-after-write
/// consistency: a read following a write may observe stale state, and
/// callers poll to confirm convergence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Snapshot {
    #[default]
    Latest,
    Block(u64),
}

impl Snapshot {
    /// Render as the wire block tag (`"latest"` or a hex block number).
    pub fn to_tag(self) -> String {
        match self {
            Snapshot::Latest => "latest".to_string(),
            Snapshot::Block(number) => format!("0x{number:x}"),
        }
    }
}

/// Read access to a remote account's key-value store.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Read one key. `Ok(None)` when the key is absent or empty.
    async fn get_data(
        &self,
        account: Address,
        key: DataKey,
        snapshot: Snapshot,
    ) -> LedgerResult<Option<Vec<u8>>>;

    /// Read several keys in one round trip where the backend supports it.
    /// The result is index-aligned with `keys`.
    async fn get_data_batch(
        &self,
        account: Address,
        keys: &[DataKey],
        snapshot: Snapshot,
    ) -> LedgerResult<Vec<Option<Vec<u8>>>> {
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            out.push(self.get_data(account, *key, snapshot).await?);
        }
        Ok(out)
    }
}

/// Connection parameters for a remote ledger endpoint. Passed explicitly at
/// construction; nothing is read from ambient process state.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,
    /// Hard cap on each remote read.
    pub request_timeout: Duration,
}

impl LedgerConfig {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            request_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Error raised by ledger backends. Every variant names the account and the
/// keys involved so a failing read can be reproduced independently.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger read timed out after {timeout:?} for account {account} ({keys})")]
    Timeout {
        account: Address,
        keys: String,
        timeout: Duration,
    },
    #[error("transport error for account {account} ({keys}): {detail}")]
    Transport {
        account: Address,
        keys: String,
        detail: String,
    },
    #[error("rpc error {code} for account {account} ({keys}): {message}")]
    Rpc {
        account: Address,
        keys: String,
        code: i64,
        message: String,
    },
    #[error("malformed response for account {account} ({keys}): {detail}")]
    Decode {
        account: Address,
        keys: String,
        detail: String,
    },
}

/// Render a key list for error context without flooding the message.
pub(crate) fn keys_context(keys: &[DataKey]) -> String {
    match keys {
        [] => "no keys".to_string(),
        [one] => format!("key {one}"),
        [first, rest @ ..] => format!("{} keys starting at {first}", rest.len() + 1),
    }
}
