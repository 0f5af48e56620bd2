//! Wire codec for the profile ACL schema: permission bitmasks, allowed-call
//! restriction tuples, and off-chain metadata pointers.

mod calls;
mod metadata;
mod permissions;

pub use calls::{
    ALLOWED_CALL_WIDTH, AllowedCallEntry, CallType, CallTypes, FunctionSelector, InterfaceId,
    decode_allowed_calls, encode_allowed_calls,
};
pub use metadata::{MetadataPointer, VerificationMethod};
pub use permissions::{
    DecodedPermissions, Permission, PermissionBitmask, decode_permissions, encode_permissions,
};

/// Error raised by the ACL codec.
#[derive(Debug, thiserror::Error)]
pub enum AclError {
    #[error("unknown capability '{name}'")]
    UnknownCapability { name: String },
    #[error("malformed {field}: expected {expected} bytes, got {got}")]
    MalformedField {
        field: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("malformed {field}: {detail}")]
    MalformedValue { field: &'static str, detail: String },
}
