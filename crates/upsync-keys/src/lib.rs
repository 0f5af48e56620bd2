//! Address and data-key primitives plus the Keccak-based dynamic key
//! derivation used by the profile permission schema.

mod schema;

pub use schema::{
    ALLOWED_CALLS_GROUP, CONTROLLERS_ARRAY_NAME, PERMISSIONS_GROUP, PERMISSIONS_NAMESPACE,
    allowed_calls_key, controller_element_key, controllers_array_key, metadata_key,
    permissions_key,
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

/// Compute the Keccak-256 digest of a byte slice.
pub fn keccak256(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&digest);
    arr
}

/// A 20-byte account or controller address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 20]);

impl Address {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyParseError> {
        if bytes.len() != 20 {
            return Err(KeyParseError::InvalidLength {
                expected: 20,
                got: bytes.len(),
            });
        }
        let mut arr = [0u8; 20];
        arr.copy_from_slice(bytes);
        Ok(Address(arr))
    }

    /// Parse a `0x`-prefixed 40-hex-char address string.
    pub fn from_hex_str(s: &str) -> Result<Self, KeyParseError> {
        let rest = s.strip_prefix("0x").ok_or(KeyParseError::MissingPrefix)?;
        if rest.len() != 40 {
            return Err(KeyParseError::InvalidLength {
                expected: 20,
                got: rest.len() / 2,
            });
        }
        let mut buf = [0u8; 20];
        hex::decode_to_slice(rest, &mut buf)?;
        Ok(Address(buf))
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

/// A 32-byte key in the remote ledger's key-value store.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DataKey([u8; 32]);

impl DataKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyParseError> {
        if bytes.len() != 32 {
            return Err(KeyParseError::InvalidLength {
                expected: 32,
                got: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(bytes);
        Ok(DataKey(arr))
    }

    /// Parse a `0x`-prefixed 64-hex-char key string.
    pub fn from_hex_str(s: &str) -> Result<Self, KeyParseError> {
        let rest = s.strip_prefix("0x").ok_or(KeyParseError::MissingPrefix)?;
        if rest.len() != 64 {
            return Err(KeyParseError::InvalidLength {
                expected: 32,
                got: rest.len() / 2,
            });
        }
        let mut buf = [0u8; 32];
        hex::decode_to_slice(rest, &mut buf)?;
        Ok(DataKey(buf))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

/// Derive the key of a ledger array from its full name (ending in `[]`),
/// e.g. `AddressPermissions[]`.
pub fn array_key(name: &str) -> DataKey {
    DataKey(keccak256(name.as_bytes()))
}

/// Derive the key holding element `index` of an array: the first 16 bytes of
/// the array key followed by the 16-byte big-endian index.
pub fn array_element_key(array: DataKey, index: u128) -> DataKey {
    let mut out = [0u8; 32];
    out[..16].copy_from_slice(&array.0[..16]);
    out[16..].copy_from_slice(&index.to_be_bytes());
    DataKey(out)
}

/// Derive a `<Namespace>:<Group>:<address>` mapping key: the first 6 bytes of
/// `keccak256(namespace)`, the first 4 bytes of `keccak256(group)`, two zero
/// bytes, then the 20-byte address. Stable and collision-free per
/// (namespace, group, address).
pub fn mapping_key(namespace: &str, group: &str, address: Address) -> DataKey {
    let ns = keccak256(namespace.as_bytes());
    let grp = keccak256(group.as_bytes());
    let mut out = [0u8; 32];
    out[..6].copy_from_slice(&ns[..6]);
    out[6..10].copy_from_slice(&grp[..4]);
    // out[10..12] stays zero
    out[12..].copy_from_slice(address.as_bytes());
    DataKey(out)
}

/// Derive the key of a singleton record from its name, e.g. `LSP4Metadata`.
pub fn singleton_key(name: &str) -> DataKey {
    DataKey(keccak256(name.as_bytes()))
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for DataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Display for DataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<[u8; 20]> for Address {
    fn from(value: [u8; 20]) -> Self {
        Address(value)
    }
}

impl From<Address> for [u8; 20] {
    fn from(value: Address) -> Self {
        value.0
    }
}

impl From<[u8; 32]> for DataKey {
    fn from(value: [u8; 32]) -> Self {
        DataKey(value)
    }
}

impl From<DataKey> for [u8; 32] {
    fn from(value: DataKey) -> Self {
        value.0
    }
}

impl FromStr for Address {
    type Err = KeyParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::from_hex_str(s)
    }
}

impl FromStr for DataKey {
    type Err = KeyParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataKey::from_hex_str(s)
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Address::from_hex_str(&s).map_err(serde::de::Error::custom)
    }
}

impl Serialize for DataKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for DataKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        DataKey::from_hex_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Error returned when a hex address or data key is malformed.
#[derive(Debug, thiserror::Error)]
pub enum KeyParseError {
    #[error("missing '0x' prefix")]
    MissingPrefix,
    #[error("expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_parse_and_format_round_trip() {
        let original = "0xcafecafecafecafecafecafecafecafecafecafe";
        let addr = Address::from_hex_str(original).expect("parse");
        assert_eq!(addr.to_hex(), original);
        assert!(Address::from_hex_str("cafecafe").is_err());
        assert!(Address::from_hex_str("0x1234").is_err());
        assert!(Address::from_bytes(&[0u8; 19]).is_err());
    }

    #[test]
    fn data_key_parse_and_format_round_trip() {
        let original = "0xdf30dba06db6a30e65354d9a64c609861f089545ca58c6b4dbe31a5f338cb0e3";
        let key = DataKey::from_hex_str(original).expect("parse");
        assert_eq!(key.to_hex(), original);
        assert!(DataKey::from_hex_str("0xdf30").is_err());
    }

    #[test]
    fn array_key_matches_schema_constant() {
        // Documented key for the controllers array in the source schema.
        assert_eq!(
            array_key("AddressPermissions[]").to_hex(),
            "0xdf30dba06db6a30e65354d9a64c609861f089545ca58c6b4dbe31a5f338cb0e3",
        );
    }

    #[test]
    fn array_element_key_layout() {
        let array = array_key("AddressPermissions[]");
        let elem0 = array_element_key(array, 0);
        let elem1 = array_element_key(array, 1);
        assert_eq!(&elem0.as_bytes()[..16], &array.as_bytes()[..16]);
        assert_eq!(&elem0.as_bytes()[16..], &[0u8; 16]);
        assert_eq!(elem1.as_bytes()[31], 1);
        assert_ne!(elem0, elem1);
    }

    #[test]
    fn mapping_key_layout_and_vectors() {
        let addr = Address::from_hex_str("0xcafecafecafecafecafecafecafecafecafecafe")
            .expect("parse address");
        let permissions = mapping_key("AddressPermissions", "Permissions", addr);
        assert_eq!(
            permissions.to_hex(),
            "0x4b80742de2bf82acb3630000cafecafecafecafecafecafecafecafecafecafe",
        );
        let allowed = mapping_key("AddressPermissions", "AllowedCalls", addr);
        assert_eq!(
            allowed.to_hex(),
            "0x4b80742de2bf393a64c70000cafecafecafecafecafecafecafecafecafecafe",
        );
        // Zero padding sits between the group bytes and the address.
        assert_eq!(&permissions.as_bytes()[10..12], &[0u8, 0u8]);
    }

    #[test]
    fn mapping_key_distinct_per_controller() {
        let a = Address::from([0x11; 20]);
        let b = Address::from([0x22; 20]);
        assert_ne!(
            mapping_key("AddressPermissions", "Permissions", a),
            mapping_key("AddressPermissions", "Permissions", b),
        );
    }
}
