//! Permission and metadata reconciliation over a remote ledger.
//!
//! One reconciliation run is a pure request/response computation over a
//! snapshot: the [`RegistryReader`] fetches current state, the planner diffs
//! it against the desired state and emits a [`WriteBatch`] for the caller to
//! submit through its own execution channel. Nothing here holds state across
//! invocations and nothing here writes to the ledger.

mod batch;
mod planner;
mod reader;

pub use batch::{WriteBatch, WriteOp};
pub use planner::{GrantRequest, Reconciler};
pub use reader::RegistryReader;

use upsync_acl::AclError;
use upsync_keys::{Address, DataKey};
use upsync_ledger::LedgerError;

pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Error raised while reading registry state or planning writes. Codec and
/// ledger failures propagate unchanged; nothing is swallowed and a failed
/// plan produces no partial batch.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Acl(#[from] AclError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(
        "controller array inconsistent for account {account}: stored length {stored}, but element {index} ({key}) {problem}"
    )]
    RegistryInconsistency {
        account: Address,
        stored: u128,
        index: u128,
        key: DataKey,
        problem: String,
    },
}
