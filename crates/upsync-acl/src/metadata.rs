//! Metadata pointer codec.
//!
//! A pointer records where an account's off-chain JSON lives and how to
//! verify it: a 4-byte verification-method id, a 32-byte content hash, and a
//! URL. On the wire it is a single opaque value, always replaced whole:
//! `0x0000` ++ method id ++ 2-byte hash length ++ hash ++ UTF-8 URL bytes.

use crate::AclError;
use serde::{Deserialize, Serialize};
use upsync_keys::keccak256;

const MARKER: [u8; 2] = [0x00, 0x00];
const HASH_LEN: usize = 32;

/// How the content behind a pointer is verified against its hash.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationMethod {
    /// Keccak-256 over the content interpreted as UTF-8 (JSON documents).
    Keccak256Utf8,
    /// Keccak-256 over raw content bytes.
    Keccak256Bytes,
    /// A method id this codec does not interpret; carried through verbatim.
    Other([u8; 4]),
}

impl VerificationMethod {
    pub fn id(self) -> [u8; 4] {
        match self {
            // First 4 bytes of keccak256("keccak256(utf8)") / ("keccak256(bytes)").
            VerificationMethod::Keccak256Utf8 => [0x6f, 0x35, 0x7c, 0x6a],
            VerificationMethod::Keccak256Bytes => [0x80, 0x19, 0xf9, 0xb1],
            VerificationMethod::Other(id) => id,
        }
    }

    pub fn from_id(id: [u8; 4]) -> Self {
        match id {
            [0x6f, 0x35, 0x7c, 0x6a] => VerificationMethod::Keccak256Utf8,
            [0x80, 0x19, 0xf9, 0xb1] => VerificationMethod::Keccak256Bytes,
            other => VerificationMethod::Other(other),
        }
    }
}

/// An off-chain content reference: verification method, content hash, URL.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataPointer {
    pub method: VerificationMethod,
    pub hash: [u8; 32],
    pub url: String,
}

impl MetadataPointer {
    /// Pointer to a JSON document already uploaded at `url`, hashing the
    /// document bytes with the UTF-8 keccak method.
    pub fn for_json_content(url: impl Into<String>, content: &[u8]) -> Self {
        MetadataPointer {
            method: VerificationMethod::Keccak256Utf8,
            hash: keccak256(content),
            url: url.into(),
        }
    }

    /// True when `content` hashes to this pointer's stored hash.
    pub fn verifies(&self, content: &[u8]) -> bool {
        match self.method {
            VerificationMethod::Keccak256Utf8 | VerificationMethod::Keccak256Bytes => {
                keccak256(content) == self.hash
            }
            VerificationMethod::Other(_) => false,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let url = self.url.as_bytes();
        let mut out = Vec::with_capacity(2 + 4 + 2 + HASH_LEN + url.len());
        out.extend_from_slice(&MARKER);
        out.extend_from_slice(&self.method.id());
        out.extend_from_slice(&(HASH_LEN as u16).to_be_bytes());
        out.extend_from_slice(&self.hash);
        out.extend_from_slice(url);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AclError> {
        if bytes.len() < 2 + 4 + 2 + HASH_LEN {
            return Err(AclError::MalformedField {
                field: "metadata pointer",
                expected: 2 + 4 + 2 + HASH_LEN,
                got: bytes.len(),
            });
        }
        if bytes[..2] != MARKER {
            return Err(AclError::MalformedValue {
                field: "metadata pointer",
                detail: format!("unexpected marker 0x{}", hex::encode(&bytes[..2])),
            });
        }
        let method = VerificationMethod::from_id([bytes[2], bytes[3], bytes[4], bytes[5]]);
        let hash_len = u16::from_be_bytes([bytes[6], bytes[7]]) as usize;
        if hash_len != HASH_LEN || bytes.len() < 8 + hash_len {
            return Err(AclError::MalformedValue {
                field: "metadata pointer",
                detail: format!("hash length {hash_len} unsupported"),
            });
        }
        let mut hash = [0u8; HASH_LEN];
        hash.copy_from_slice(&bytes[8..8 + HASH_LEN]);
        let url = std::str::from_utf8(&bytes[8 + HASH_LEN..])
            .map_err(|e| AclError::MalformedValue {
                field: "metadata pointer",
                detail: format!("url is not utf-8: {e}"),
            })?
            .to_string();
        Ok(MetadataPointer { method, hash, url })
    }
}
