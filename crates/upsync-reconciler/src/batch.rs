//! Planned write batches.

use serde::{Deserialize, Serialize};
use std::fmt;
use upsync_keys::{Address, DataKey};

/// One planned key-value write plus a human-readable account of what it does.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOp {
    pub key: DataKey,
    #[serde(with = "hex_value")]
    pub value: Vec<u8>,
    pub summary: String,
}

/// An ordered sequence of writes intended for submission as one transaction.
///
/// The batch itself is inert: submission happens through the caller's own
/// execution channel, and convergence is confirmed by re-reading (see
/// [`crate::RegistryReader::check_converged`]).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteBatch {
    pub account: Address,
    pub writes: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new(account: Address) -> Self {
        WriteBatch {
            account,
            writes: Vec::new(),
        }
    }

    pub fn push(&mut self, key: DataKey, value: Vec<u8>, summary: impl Into<String>) {
        self.writes.push(WriteOp {
            key,
            value,
            summary: summary.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    /// The (key, value) pairs in submission order.
    pub fn entries(&self) -> impl Iterator<Item = (DataKey, &[u8])> {
        self.writes.iter().map(|w| (w.key, w.value.as_slice()))
    }
}

impl fmt::Display for WriteBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "batch for {} ({} writes)", self.account, self.len())?;
        for write in &self.writes {
            writeln!(f, "  {} <- 0x{}", write.key, hex::encode(&write.value))?;
            writeln!(f, "    {}", write.summary)?;
        }
        Ok(())
    }
}

/// Hex-string serde for write values, matching how keys and addresses render.
mod hex_value {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(value)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        let raw = s.strip_prefix("0x").unwrap_or(&s);
        hex::decode(raw).map_err(serde::de::Error::custom)
    }
}
