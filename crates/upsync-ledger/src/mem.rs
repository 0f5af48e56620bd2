//! In-memory ledger backend for tests and dry runs.

use crate::{LedgerResult, LedgerStore, Snapshot};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use upsync_keys::{Address, DataKey};

/// A ledger held in process memory. Serves a single live view; the snapshot
/// selector is accepted for interface parity but every read sees the current
/// state.
#[derive(Clone, Default)]
pub struct MemLedger {
    data: Arc<RwLock<HashMap<(Address, DataKey), Vec<u8>>>>,
}

impl std::fmt::Debug for MemLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemLedger")
            .field("entries", &self.data.read().unwrap().len())
            .finish()
    }
}

impl MemLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one key. An empty value clears the key, mirroring how the remote
    /// store treats empty writes.
    pub fn set_data(&self, account: Address, key: DataKey, value: Vec<u8>) {
        let mut guard = self.data.write().unwrap();
        if value.is_empty() {
            guard.remove(&(account, key));
        } else {
            guard.insert((account, key), value);
        }
    }

    /// Apply an ordered sequence of writes, as a submitted batch would.
    pub fn set_data_batch<I>(&self, account: Address, writes: I)
    where
        I: IntoIterator<Item = (DataKey, Vec<u8>)>,
    {
        for (key, value) in writes {
            self.set_data(account, key, value);
        }
    }
}

#[async_trait]
impl LedgerStore for MemLedger {
    async fn get_data(
        &self,
        account: Address,
        key: DataKey,
        _snapshot: Snapshot,
    ) -> LedgerResult<Option<Vec<u8>>> {
        Ok(self.data.read().unwrap().get(&(account, key)).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn absent_key_reads_as_none() {
        let ledger = MemLedger::new();
        let account = Address::from([1; 20]);
        let key = upsync_keys::controllers_array_key();
        let value = ledger
            .get_data(account, key, Snapshot::Latest)
            .await
            .expect("read");
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn set_then_get_and_clear() {
        let ledger = MemLedger::new();
        let account = Address::from([1; 20]);
        let key = upsync_keys::controllers_array_key();
        ledger.set_data(account, key, vec![0xab, 0xcd]);
        let value = ledger
            .get_data(account, key, Snapshot::Latest)
            .await
            .expect("read");
        assert_eq!(value, Some(vec![0xab, 0xcd]));

        ledger.set_data(account, key, Vec::new());
        let value = ledger
            .get_data(account, key, Snapshot::Latest)
            .await
            .expect("read");
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn batch_read_is_index_aligned() {
        let ledger = MemLedger::new();
        let account = Address::from([1; 20]);
        let k1 = upsync_keys::controller_element_key(0);
        let k2 = upsync_keys::controller_element_key(1);
        ledger.set_data(account, k2, vec![0x22]);
        let values = ledger
            .get_data_batch(account, &[k1, k2], Snapshot::Latest)
            .await
            .expect("read");
        assert_eq!(values, vec![None, Some(vec![0x22])]);
    }
}
