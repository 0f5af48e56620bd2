//! Typed reads over the remote registry.
//!
//! Absent keys are normal results (zero bitmask, empty list, `None`), never
//! errors. The controller array is the one place absence is meaningful: the
//! stored length must account for every element, and any gap fails the read
//! rather than returning a truncated or padded sequence.

use crate::{ReconcileError, ReconcileResult, WriteBatch, WriteOp};
use tracing::debug;
use upsync_acl::{AclError, AllowedCallEntry, MetadataPointer, PermissionBitmask};
use upsync_keys::{Address, DataKey};
use upsync_ledger::{DynLedger, Snapshot};

/// Stored array lengths are 16-byte big-endian unsigned integers.
const ARRAY_LENGTH_WIDTH: usize = 16;

/// Bound on how many controller elements one read will fetch. A stored
/// length past this fails the length cross-check instead of issuing an
/// unbounded batch read.
const MAX_CONTROLLERS: u128 = 4096;

/// Read side of a reconciliation run: current permissions, allowed calls,
/// controllers, and metadata pointers for an account, all at one snapshot.
#[derive(Clone)]
pub struct RegistryReader {
    ledger: DynLedger,
    snapshot: Snapshot,
}

impl RegistryReader {
    pub fn new(ledger: DynLedger) -> Self {
        Self {
            ledger,
            snapshot: Snapshot::Latest,
        }
    }

    pub fn at_snapshot(mut self, snapshot: Snapshot) -> Self {
        self.snapshot = snapshot;
        self
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshot
    }

    /// Current permission bitmask of `controller` on `account`. Absent key
    /// reads as the zero bitmask.
    pub async fn permissions(
        &self,
        account: Address,
        controller: Address,
    ) -> ReconcileResult<PermissionBitmask> {
        let key = upsync_keys::permissions_key(controller);
        let value = self.ledger.get_data(account, key, self.snapshot).await?;
        let mask = match value {
            None => PermissionBitmask::ZERO,
            Some(bytes) => PermissionBitmask::from_bytes(&bytes)?,
        };
        debug!(%account, %controller, mask = %mask, "read permissions");
        Ok(mask)
    }

    /// Current allowed-call list of `controller` on `account`, in stored
    /// order. Absent key reads as the empty list.
    pub async fn allowed_calls(
        &self,
        account: Address,
        controller: Address,
    ) -> ReconcileResult<Vec<AllowedCallEntry>> {
        let key = upsync_keys::allowed_calls_key(controller);
        let value = self.ledger.get_data(account, key, self.snapshot).await?;
        let entries = match value {
            None => Vec::new(),
            Some(bytes) => upsync_acl::decode_allowed_calls(&bytes)?,
        };
        debug!(%account, %controller, entries = entries.len(), "read allowed calls");
        Ok(entries)
    }

    /// The account's controller array, cross-checked against its stored
    /// length. A missing or malformed element fails the whole read.
    pub async fn controllers(&self, account: Address) -> ReconcileResult<Vec<Address>> {
        let array_key = upsync_keys::controllers_array_key();
        let stored = self
            .ledger
            .get_data(account, array_key, self.snapshot)
            .await?;
        let stored_len = match stored {
            None => 0,
            Some(bytes) => decode_array_length(&bytes)?,
        };
        if stored_len > MAX_CONTROLLERS {
            return Err(ReconcileError::RegistryInconsistency {
                account,
                stored: stored_len,
                index: 0,
                key: array_key,
                problem: format!("stored length exceeds the read bound of {MAX_CONTROLLERS}"),
            });
        }

        let keys: Vec<DataKey> = (0..stored_len)
            .map(upsync_keys::controller_element_key)
            .collect();
        let values = self
            .ledger
            .get_data_batch(account, &keys, self.snapshot)
            .await?;

        let mut controllers = Vec::with_capacity(values.len());
        for (index, (key, value)) in keys.iter().zip(values).enumerate() {
            let index = index as u128;
            let bytes = value.ok_or_else(|| ReconcileError::RegistryInconsistency {
                account,
                stored: stored_len,
                index,
                key: *key,
                problem: "is absent".to_string(),
            })?;
            let address = Address::from_bytes(&bytes).map_err(|_| {
                ReconcileError::RegistryInconsistency {
                    account,
                    stored: stored_len,
                    index,
                    key: *key,
                    problem: format!("holds {} bytes, not a 20-byte address", bytes.len()),
                }
            })?;
            controllers.push(address);
        }
        debug!(%account, controllers = controllers.len(), "read controller array");
        Ok(controllers)
    }

    /// The metadata pointer stored under `name`, if any.
    pub async fn metadata_pointer(
        &self,
        account: Address,
        name: &str,
    ) -> ReconcileResult<Option<MetadataPointer>> {
        let key = upsync_keys::metadata_key(name);
        let value = self.ledger.get_data(account, key, self.snapshot).await?;
        match value {
            None => Ok(None),
            Some(bytes) => Ok(Some(MetadataPointer::from_bytes(&bytes)?)),
        }
    }

    /// Re-read every key a batch touches and return the writes whose values
    /// are not yet visible. An empty result means the batch has converged.
    /// Reads may observe stale state; callers poll until empty or give up
    /// and re-plan.
    pub async fn check_converged(&self, batch: &WriteBatch) -> ReconcileResult<Vec<WriteOp>> {
        let keys: Vec<DataKey> = batch.writes.iter().map(|w| w.key).collect();
        let values = self
            .ledger
            .get_data_batch(batch.account, &keys, self.snapshot)
            .await?;
        let pending: Vec<WriteOp> = batch
            .writes
            .iter()
            .zip(values)
            .filter(|(write, current)| current.as_deref() != Some(write.value.as_slice()))
            .map(|(write, _)| write.clone())
            .collect();
        debug!(
            account = %batch.account,
            total = batch.len(),
            pending = pending.len(),
            "convergence check"
        );
        Ok(pending)
    }
}

/// Parse a stored array length value.
pub(crate) fn decode_array_length(bytes: &[u8]) -> Result<u128, AclError> {
    if bytes.len() != ARRAY_LENGTH_WIDTH {
        return Err(AclError::MalformedField {
            field: "array length",
            expected: ARRAY_LENGTH_WIDTH,
            got: bytes.len(),
        });
    }
    let mut arr = [0u8; ARRAY_LENGTH_WIDTH];
    arr.copy_from_slice(bytes);
    Ok(u128::from_be_bytes(arr))
}

/// Encode an array length for storage.
pub(crate) fn encode_array_length(length: u128) -> Vec<u8> {
    length.to_be_bytes().to_vec()
}
