//! Allowed-call restriction tuples and their compact-bytes-array framing.
//!
//! Each entry is a fixed 32-byte tuple: a 4-byte call-type subset, a 20-byte
//! target address, a 4-byte interface id (or wildcard), and a 4-byte function
//! selector (or wildcard). A controller's full list is stored as a sequence
//! of entries, each prefixed with a 2-byte big-endian length.

use crate::AclError;
use serde::{Deserialize, Serialize};
use std::fmt;
use upsync_keys::Address;

/// Wire width of one allowed-call tuple.
pub const ALLOWED_CALL_WIDTH: usize = 32;

/// Call operations an allowed-call entry can authorize.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallType {
    TransferValue,
    Call,
    StaticCall,
    DelegateCall,
}

impl CallType {
    fn bit(self) -> u32 {
        match self {
            CallType::TransferValue => 0x0000_0001,
            CallType::Call => 0x0000_0002,
            CallType::StaticCall => 0x0000_0004,
            CallType::DelegateCall => 0x0000_0008,
        }
    }
}

/// 4-byte call-type bitmask (the restriction subset of a full permission
/// bitmask).
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallTypes(u32);

impl CallTypes {
    pub const NONE: CallTypes = CallTypes(0);

    pub fn new(types: &[CallType]) -> Self {
        CallTypes(types.iter().fold(0, |acc, t| acc | t.bit()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AclError> {
        if bytes.len() != 4 {
            return Err(AclError::MalformedField {
                field: "call types",
                expected: 4,
                got: bytes.len(),
            });
        }
        Ok(CallTypes(u32::from_be_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3],
        ])))
    }

    pub fn to_bytes(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    pub fn allows(self, call_type: CallType) -> bool {
        self.0 & call_type.bit() != 0
    }
}

impl fmt::Debug for CallTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.to_bytes()))
    }
}

/// 4-byte interface id; `0xffffffff` matches any interface.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InterfaceId(pub [u8; 4]);

impl InterfaceId {
    pub const ANY: InterfaceId = InterfaceId([0xff; 4]);

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AclError> {
        fixed4(bytes, "interface id").map(InterfaceId)
    }

    pub fn is_wildcard(self) -> bool {
        self == InterfaceId::ANY
    }
}

impl fmt::Debug for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// 4-byte function selector; `0xffffffff` matches any function.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionSelector(pub [u8; 4]);

impl FunctionSelector {
    pub const ANY: FunctionSelector = FunctionSelector([0xff; 4]);

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AclError> {
        fixed4(bytes, "function selector").map(FunctionSelector)
    }

    /// Selector of a function signature string, e.g.
    /// `mintMoment(address,bytes,bytes,address)`.
    pub fn of_signature(signature: &str) -> Self {
        let digest = upsync_keys::keccak256(signature.as_bytes());
        FunctionSelector([digest[0], digest[1], digest[2], digest[3]])
    }

    pub fn is_wildcard(self) -> bool {
        self == FunctionSelector::ANY
    }
}

impl fmt::Debug for FunctionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

fn fixed4(bytes: &[u8], field: &'static str) -> Result<[u8; 4], AclError> {
    if bytes.len() != 4 {
        return Err(AclError::MalformedField {
            field,
            expected: 4,
            got: bytes.len(),
        });
    }
    Ok([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// One allowed-call restriction tuple.
///
/// Uniqueness within a controller's list is keyed by (target, selector);
/// appending a duplicate is a planner-level no-op.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedCallEntry {
    pub call_types: CallTypes,
    pub target: Address,
    pub interface_id: InterfaceId,
    pub selector: FunctionSelector,
}

impl AllowedCallEntry {
    /// Build an entry from raw wire fields, validating each width
    /// individually (4 / 20 / 4 / 4 bytes).
    pub fn from_raw(
        call_types: &[u8],
        target: &[u8],
        interface_id: &[u8],
        selector: &[u8],
    ) -> Result<Self, AclError> {
        let target = Address::from_bytes(target).map_err(|_| AclError::MalformedField {
            field: "target address",
            expected: 20,
            got: target.len(),
        })?;
        Ok(AllowedCallEntry {
            call_types: CallTypes::from_bytes(call_types)?,
            target,
            interface_id: InterfaceId::from_bytes(interface_id)?,
            selector: FunctionSelector::from_bytes(selector)?,
        })
    }

    pub fn to_bytes(&self) -> [u8; ALLOWED_CALL_WIDTH] {
        let mut out = [0u8; ALLOWED_CALL_WIDTH];
        out[..4].copy_from_slice(&self.call_types.to_bytes());
        out[4..24].copy_from_slice(self.target.as_bytes());
        out[24..28].copy_from_slice(&self.interface_id.0);
        out[28..].copy_from_slice(&self.selector.0);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AclError> {
        if bytes.len() != ALLOWED_CALL_WIDTH {
            return Err(AclError::MalformedField {
                field: "allowed call",
                expected: ALLOWED_CALL_WIDTH,
                got: bytes.len(),
            });
        }
        AllowedCallEntry::from_raw(&bytes[..4], &bytes[4..24], &bytes[24..28], &bytes[28..])
    }

    /// Duplicate check key: entries with the same target and selector are the
    /// same grant.
    pub fn same_grant(&self, other: &AllowedCallEntry) -> bool {
        self.target == other.target && self.selector == other.selector
    }
}

/// Frame a sequence of entries as a compact-bytes-array: each element
/// prefixed with its 2-byte big-endian length.
pub fn encode_allowed_calls(entries: &[AllowedCallEntry]) -> Vec<u8> {
    let mut out = Vec::with_capacity(entries.len() * (2 + ALLOWED_CALL_WIDTH));
    for entry in entries {
        out.extend_from_slice(&(ALLOWED_CALL_WIDTH as u16).to_be_bytes());
        out.extend_from_slice(&entry.to_bytes());
    }
    out
}

/// Parse a compact-bytes-array of allowed-call entries. Order is preserved.
/// Truncated frames or elements of the wrong width are malformed.
pub fn decode_allowed_calls(bytes: &[u8]) -> Result<Vec<AllowedCallEntry>, AclError> {
    let mut entries = Vec::new();
    let mut cursor = 0;
    while cursor < bytes.len() {
        if cursor + 2 > bytes.len() {
            return Err(AclError::MalformedValue {
                field: "allowed calls",
                detail: format!("dangling byte at offset {cursor}"),
            });
        }
        let len = u16::from_be_bytes([bytes[cursor], bytes[cursor + 1]]) as usize;
        cursor += 2;
        if cursor + len > bytes.len() {
            return Err(AclError::MalformedValue {
                field: "allowed calls",
                detail: format!("element at offset {cursor} claims {len} bytes past the end"),
            });
        }
        entries.push(AllowedCallEntry::from_bytes(&bytes[cursor..cursor + len])?);
        cursor += len;
    }
    Ok(entries)
}
