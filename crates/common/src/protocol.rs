//! Persisted value types shared between the crypto layer and the storage layer.
//!
//! These types are serialised as JSON and stored, base64 encoded, alongside each
//! state document.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Byte length of an encoded [`Height`].
pub const HEIGHT_LEN: usize = 16;

// ---------------------------------------------------------------------------
// Height
// ---------------------------------------------------------------------------

/// Commit position of a state value: block number and transaction number
/// within that block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Height {
    pub block_num: u64,
    pub tx_num: u64,
}

/// A byte slice could not be decoded into a [`Height`].
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid height encoding: expected {HEIGHT_LEN} bytes, got {0}")]
pub struct InvalidHeight(pub usize);

impl Height {
    pub fn new(block_num: u64, tx_num: u64) -> Self {
        Self { block_num, tx_num }
    }

    /// Encode as big-endian `block_num` followed by big-endian `tx_num`.
    ///
    /// Byte order matches numeric order, so encoded heights sort correctly.
    /// This fixed-width layout is not wire-compatible with heights encoded as
    /// order-preserving varints by Fabric peers.
    pub fn to_bytes(&self) -> [u8; HEIGHT_LEN] {
        let mut out = [0u8; HEIGHT_LEN];
        out[..8].copy_from_slice(&self.block_num.to_be_bytes());
        out[8..].copy_from_slice(&self.tx_num.to_be_bytes());
        out
    }

    /// Decode the representation produced by [`Height::to_bytes`].
    ///
    /// # Errors
    ///
    /// Returns [`InvalidHeight`] if `bytes` is not exactly [`HEIGHT_LEN`] long.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, InvalidHeight> {
        let bytes: &[u8; HEIGHT_LEN] = bytes
            .try_into()
            .map_err(|_| InvalidHeight(bytes.len()))?;
        let mut block = [0u8; 8];
        let mut tx = [0u8; 8];
        block.copy_from_slice(&bytes[..8]);
        tx.copy_from_slice(&bytes[8..]);
        Ok(Self {
            block_num: u64::from_be_bytes(block),
            tx_num: u64::from_be_bytes(tx),
        })
    }
}

// ---------------------------------------------------------------------------
// Version and metadata
// ---------------------------------------------------------------------------

/// Version and (encrypted) metadata persisted next to a state document.
///
/// `metadata` holds the `ENC:`-prefixed form produced by the value cipher, or
/// is empty when the value carries no metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionAndMetadata {
    /// Encoded [`Height`] bytes.
    #[serde(with = "base64_bytes")]
    pub version: Vec<u8>,
    #[serde(with = "base64_bytes", default)]
    pub metadata: Vec<u8>,
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}
