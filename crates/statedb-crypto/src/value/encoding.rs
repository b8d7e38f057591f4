//! Version-and-metadata encoding for document-store backends.
//!
//! A document carries its commit [`Height`] and optional metadata in a single
//! string field: `base64(json(VersionAndMetadata))`. Metadata is encrypted with
//! the value cipher before it is packed.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::protocol::InvalidHeight;
use common::{Height, StateDbError, VersionAndMetadata};
use thiserror::Error;

use super::{ValueCipher, ValueError};
use crate::key::KeyProvider;

/// Errors produced while encoding or decoding version and metadata.
#[derive(Debug, Error)]
pub enum EncodingError {
    /// The stored string is not base64.
    #[error("version and metadata is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The decoded bytes are not a JSON `VersionAndMetadata` record.
    #[error("version and metadata is not valid json: {0}")]
    Json(#[from] serde_json::Error),

    /// The version field is not an encoded [`Height`].
    #[error(transparent)]
    InvalidHeight(#[from] InvalidHeight),

    /// Encrypting or decrypting the metadata failed.
    #[error(transparent)]
    Value(#[from] ValueError),
}

impl From<EncodingError> for StateDbError {
    fn from(e: EncodingError) -> Self {
        match e {
            EncodingError::Value(v) => v.into(),
            other => StateDbError::Encoding(other.to_string()),
        }
    }
}

/// Encrypt `metadata` and pack it with `version` into the stored string form.
///
/// Empty metadata is stored empty, not encrypted.
///
/// # Errors
///
/// Returns [`EncodingError::Value`] if encryption fails and
/// [`EncodingError::Json`] if serialisation fails.
pub fn encode_version_and_metadata<P: KeyProvider>(
    cipher: &ValueCipher<P>,
    version: &Height,
    metadata: &[u8],
    namespace: &str,
    key_name: &str,
) -> Result<String, EncodingError> {
    let metadata = if metadata.is_empty() {
        Vec::new()
    } else {
        cipher.encrypt_value(metadata, namespace, key_name)?
    };
    let msg = VersionAndMetadata {
        version: version.to_bytes().to_vec(),
        metadata,
    };
    let json = serde_json::to_vec(&msg)?;
    Ok(STANDARD.encode(json))
}

/// Unpack a stored version-and-metadata string, decrypting the metadata.
///
/// # Errors
///
/// Returns an [`EncodingError`] if any layer of the encoding is malformed or the
/// metadata fails to decrypt.
pub fn decode_version_and_metadata<P: KeyProvider>(
    cipher: &ValueCipher<P>,
    encoded: &str,
    namespace: &str,
    key_name: &str,
) -> Result<(Height, Vec<u8>), EncodingError> {
    let raw = STANDARD.decode(encoded)?;
    let msg: VersionAndMetadata = serde_json::from_slice(&raw)?;
    let version = Height::from_bytes(&msg.version)?;
    let metadata = cipher.decrypt_value(&msg.metadata, namespace, key_name)?;
    Ok((version, metadata))
}
