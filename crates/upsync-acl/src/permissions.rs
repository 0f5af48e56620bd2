//! Permission bitmask codec.
//!
//! A controller's permissions are stored as a 32-byte big-endian bit-vector.
//! Encoding is a pure function of the capability map; decoding is total over
//! any bit pattern and surfaces reserved bits explicitly so no information is
//! lost on a round trip.

use crate::AclError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Named capabilities, one per bit position (bit 0 = least significant).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum Permission {
    CHANGEOWNER,
    ADDCONTROLLER,
    EDITPERMISSIONS,
    ADDEXTENSIONS,
    CHANGEEXTENSIONS,
    ADDUNIVERSALRECEIVERDELEGATE,
    CHANGEUNIVERSALRECEIVERDELEGATE,
    REENTRANCY,
    SUPER_TRANSFERVALUE,
    TRANSFERVALUE,
    SUPER_CALL,
    CALL,
    SUPER_STATICCALL,
    STATICCALL,
    SUPER_DELEGATECALL,
    DELEGATECALL,
    DEPLOY,
    SUPER_SETDATA,
    SETDATA,
    ENCRYPT,
    DECRYPT,
    SIGN,
    EXECUTE_RELAY_CALL,
}

impl Permission {
    /// All recognized capabilities, in bit order.
    pub const ALL: [Permission; 23] = [
        Permission::CHANGEOWNER,
        Permission::ADDCONTROLLER,
        Permission::EDITPERMISSIONS,
        Permission::ADDEXTENSIONS,
        Permission::CHANGEEXTENSIONS,
        Permission::ADDUNIVERSALRECEIVERDELEGATE,
        Permission::CHANGEUNIVERSALRECEIVERDELEGATE,
        Permission::REENTRANCY,
        Permission::SUPER_TRANSFERVALUE,
        Permission::TRANSFERVALUE,
        Permission::SUPER_CALL,
        Permission::CALL,
        Permission::SUPER_STATICCALL,
        Permission::STATICCALL,
        Permission::SUPER_DELEGATECALL,
        Permission::DELEGATECALL,
        Permission::DEPLOY,
        Permission::SUPER_SETDATA,
        Permission::SETDATA,
        Permission::ENCRYPT,
        Permission::DECRYPT,
        Permission::SIGN,
        Permission::EXECUTE_RELAY_CALL,
    ];

    /// Bit position of this capability.
    pub fn bit(self) -> usize {
        Permission::ALL
            .iter()
            .position(|p| *p == self)
            .expect("permission listed in ALL")
    }

    pub fn name(self) -> &'static str {
        match self {
            Permission::CHANGEOWNER => "CHANGEOWNER",
            Permission::ADDCONTROLLER => "ADDCONTROLLER",
            Permission::EDITPERMISSIONS => "EDITPERMISSIONS",
            Permission::ADDEXTENSIONS => "ADDEXTENSIONS",
            Permission::CHANGEEXTENSIONS => "CHANGEEXTENSIONS",
            Permission::ADDUNIVERSALRECEIVERDELEGATE => "ADDUNIVERSALRECEIVERDELEGATE",
            Permission::CHANGEUNIVERSALRECEIVERDELEGATE => "CHANGEUNIVERSALRECEIVERDELEGATE",
            Permission::REENTRANCY => "REENTRANCY",
            Permission::SUPER_TRANSFERVALUE => "SUPER_TRANSFERVALUE",
            Permission::TRANSFERVALUE => "TRANSFERVALUE",
            Permission::SUPER_CALL => "SUPER_CALL",
            Permission::CALL => "CALL",
            Permission::SUPER_STATICCALL => "SUPER_STATICCALL",
            Permission::STATICCALL => "STATICCALL",
            Permission::SUPER_DELEGATECALL => "SUPER_DELEGATECALL",
            Permission::DELEGATECALL => "DELEGATECALL",
            Permission::DEPLOY => "DEPLOY",
            Permission::SUPER_SETDATA => "SUPER_SETDATA",
            Permission::SETDATA => "SETDATA",
            Permission::ENCRYPT => "ENCRYPT",
            Permission::DECRYPT => "DECRYPT",
            Permission::SIGN => "SIGN",
            Permission::EXECUTE_RELAY_CALL => "EXECUTE_RELAY_CALL",
        }
    }

    pub fn from_name(name: &str) -> Option<Permission> {
        Permission::ALL.iter().copied().find(|p| p.name() == name)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Permission {
    type Err = AclError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::from_name(s).ok_or_else(|| AclError::UnknownCapability {
            name: s.to_string(),
        })
    }
}

/// 32-byte big-endian permission bit-vector as stored on the ledger.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PermissionBitmask([u8; 32]);

impl PermissionBitmask {
    pub const ZERO: PermissionBitmask = PermissionBitmask([0u8; 32]);

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AclError> {
        if bytes.len() != 32 {
            return Err(AclError::MalformedField {
                field: "permission bitmask",
                expected: 32,
                got: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(bytes);
        Ok(PermissionBitmask(arr))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    pub fn has(&self, permission: Permission) -> bool {
        self.bit(permission.bit())
    }

    pub fn with(mut self, permission: Permission) -> Self {
        self.set_bit(permission.bit());
        self
    }

    /// Bitwise OR, the additive grant merge.
    pub fn union(&self, other: &PermissionBitmask) -> PermissionBitmask {
        let mut out = [0u8; 32];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = self.0[i] | other.0[i];
        }
        PermissionBitmask(out)
    }

    /// Bitwise AND NOT, the revoke merge.
    pub fn difference(&self, revoked: &PermissionBitmask) -> PermissionBitmask {
        let mut out = [0u8; 32];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = self.0[i] & !revoked.0[i];
        }
        PermissionBitmask(out)
    }

    fn bit(&self, position: usize) -> bool {
        let byte = 31 - position / 8;
        self.0[byte] & (1 << (position % 8)) != 0
    }

    fn set_bit(&mut self, position: usize) {
        let byte = 31 - position / 8;
        self.0[byte] |= 1 << (position % 8);
    }

    fn clear_bit(&mut self, position: usize) {
        let byte = 31 - position / 8;
        self.0[byte] &= !(1 << (position % 8));
    }
}

impl fmt::Debug for PermissionBitmask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Display for PermissionBitmask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<[u8; 32]> for PermissionBitmask {
    fn from(value: [u8; 32]) -> Self {
        PermissionBitmask(value)
    }
}

/// Result of decoding a bitmask: every recognized capability mapped
/// explicitly to true/false, plus any reserved bits as a remainder mask.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedPermissions {
    pub capabilities: BTreeMap<Permission, bool>,
    /// Bits set in the source value that map to no recognized capability.
    /// Zero when the value is fully understood.
    pub unknown_bits: PermissionBitmask,
}

impl DecodedPermissions {
    /// Names of the granted capabilities, in bit order.
    pub fn granted(&self) -> Vec<Permission> {
        self.capabilities
            .iter()
            .filter(|(_, set)| **set)
            .map(|(p, _)| *p)
            .collect()
    }

    /// Re-encode to the exact source value (recognized bits + remainder).
    pub fn to_bitmask(&self) -> PermissionBitmask {
        let mut mask = self.unknown_bits;
        for (permission, set) in &self.capabilities {
            if *set {
                mask.set_bit(permission.bit());
            }
        }
        mask
    }
}

/// Encode a capability-name map into a bitmask. Names not in the recognized
/// set fail with [`AclError::UnknownCapability`]; absent names default to
/// false.
pub fn encode_permissions<'a, I>(capabilities: I) -> Result<PermissionBitmask, AclError>
where
    I: IntoIterator<Item = (&'a str, bool)>,
{
    let mut mask = PermissionBitmask::ZERO;
    for (name, set) in capabilities {
        let permission = Permission::from_str(name)?;
        if set {
            mask.set_bit(permission.bit());
        }
    }
    Ok(mask)
}

/// Decode any 32-byte pattern. Total: never fails, never drops bits.
pub fn decode_permissions(mask: PermissionBitmask) -> DecodedPermissions {
    let mut capabilities = BTreeMap::new();
    let mut unknown = mask;
    for permission in Permission::ALL {
        capabilities.insert(permission, mask.has(permission));
        unknown.clear_bit(permission.bit());
    }
    DecodedPermissions {
        capabilities,
        unknown_bits: unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_known_vectors() {
        // Bit values documented by the source schema.
        let call = encode_permissions([("CALL", true)]).expect("encode");
        assert_eq!(
            call.to_hex(),
            "0x0000000000000000000000000000000000000000000000000000000000000800",
        );
        let super_setdata = encode_permissions([("SUPER_SETDATA", true)]).expect("encode");
        assert_eq!(
            super_setdata.to_hex(),
            "0x0000000000000000000000000000000000000000000000000000000000020000",
        );
        let super_call = encode_permissions([("SUPER_CALL", true)]).expect("encode");
        assert_eq!(
            super_call.to_hex(),
            "0x0000000000000000000000000000000000000000000000000000000000000400",
        );
    }

    #[test]
    fn encode_rejects_unknown_names() {
        let err = encode_permissions([("FLY", true)]).unwrap_err();
        assert!(matches!(err, AclError::UnknownCapability { name } if name == "FLY"));
    }

    #[test]
    fn encode_ignores_explicit_false() {
        let mask = encode_permissions([("CALL", false), ("SETDATA", true)]).expect("encode");
        assert!(!mask.has(Permission::CALL));
        assert!(mask.has(Permission::SETDATA));
    }

    #[test]
    fn round_trip_recognized_bits() {
        let mask = encode_permissions([
            ("CALL", true),
            ("SETDATA", true),
            ("EXECUTE_RELAY_CALL", true),
        ])
        .expect("encode");
        let decoded = decode_permissions(mask);
        assert!(decoded.capabilities[&Permission::CALL]);
        assert!(decoded.capabilities[&Permission::SETDATA]);
        assert!(decoded.capabilities[&Permission::EXECUTE_RELAY_CALL]);
        assert!(!decoded.capabilities[&Permission::CHANGEOWNER]);
        assert_eq!(decoded.capabilities.len(), Permission::ALL.len());
        assert!(decoded.unknown_bits.is_zero());
        assert_eq!(decoded.to_bitmask(), mask);
    }

    #[test]
    fn decode_surfaces_unknown_bits() {
        let mut raw = [0u8; 32];
        raw[0] = 0x80; // far outside the recognized range
        raw[31] = 0x08; // ADDEXTENSIONS
        let decoded = decode_permissions(PermissionBitmask::from(raw));
        assert!(decoded.capabilities[&Permission::ADDEXTENSIONS]);
        assert!(!decoded.unknown_bits.is_zero());
        // Nothing is lost: re-encoding reproduces the original value.
        assert_eq!(decoded.to_bitmask(), PermissionBitmask::from(raw));
    }

    #[test]
    fn union_is_idempotent() {
        let a = encode_permissions([("CALL", true)]).expect("encode");
        let b = encode_permissions([("SETDATA", true)]).expect("encode");
        let merged = a.union(&b);
        assert_eq!(merged.union(&b), merged);
        assert!(merged.has(Permission::CALL));
        assert!(merged.has(Permission::SETDATA));
    }

    #[test]
    fn difference_clears_only_revoked() {
        let mask = encode_permissions([("CALL", true), ("SETDATA", true)]).expect("encode");
        let revoked = encode_permissions([("SETDATA", true)]).expect("encode");
        let left = mask.difference(&revoked);
        assert!(left.has(Permission::CALL));
        assert!(!left.has(Permission::SETDATA));
    }

    #[test]
    fn bitmask_width_enforced() {
        assert!(PermissionBitmask::from_bytes(&[0u8; 31]).is_err());
        assert!(PermissionBitmask::from_bytes(&[0u8; 33]).is_err());
    }
}
