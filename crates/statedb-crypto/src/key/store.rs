//! [`KeyStore`]: thread-safe holder for the state-database encryption key.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;
use zeroize::{Zeroize, Zeroizing};

use super::KeyProvider;
use crate::crypto::KEY_LEN;

/// Errors produced by the key layer.
#[derive(Debug, Error)]
pub enum KeyError {
    /// No key has been provisioned yet.
    #[error("encryption key not yet initialised")]
    NotInitialised,

    /// The key material has an unexpected length.
    #[error("encryption key has invalid length: expected {KEY_LEN} bytes, got {0}")]
    InvalidLength(usize),

    /// The configured key is not valid base64.
    #[error("encryption key is not valid base64")]
    InvalidEncoding,
}

/// Fixed-size key buffer that holds exactly [`KEY_LEN`] bytes.
///
/// Cloned out of [`KeyStore`] for the duration of one operation. The memory is
/// overwritten with zeroes on drop.
#[derive(Clone)]
pub struct KeyBytes(pub Box<[u8; KEY_LEN]>);

impl KeyBytes {
    /// Copy `bytes` into a new key buffer.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidLength`] if `bytes` is not [`KEY_LEN`] long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != KEY_LEN {
            return Err(KeyError::InvalidLength(bytes.len()));
        }
        let mut buf = Box::new([0u8; KEY_LEN]);
        buf.copy_from_slice(bytes);
        Ok(Self(buf))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0[..]
    }
}

impl Drop for KeyBytes {
    fn drop(&mut self) {
        self.0[..].zeroize();
    }
}

impl std::fmt::Debug for KeyBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material.
        f.write_str("KeyBytes([REDACTED])")
    }
}

/// Thread-safe store for the current encryption key.
///
/// Backed by [`ArcSwapOption`] so that the hot encrypt/decrypt path reads the
/// key without taking a lock. Clones share the same underlying slot.
#[derive(Clone, Debug, Default)]
pub struct KeyStore {
    inner: Arc<ArcSwapOption<KeyBytes>>,
}

impl KeyStore {
    /// Create a new, empty [`KeyStore`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded from a base64-encoded key, as supplied by
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidEncoding`] if `encoded` is not base64 and
    /// [`KeyError::InvalidLength`] if it does not decode to [`KEY_LEN`] bytes.
    pub fn from_base64(encoded: &str) -> Result<Self, KeyError> {
        let decoded = Zeroizing::new(
            STANDARD
                .decode(encoded.trim())
                .map_err(|_| KeyError::InvalidEncoding)?,
        );
        let store = Self::new();
        store.store(&decoded)?;
        Ok(store)
    }

    /// Returns `true` if a key is currently held.
    pub fn is_ready(&self) -> bool {
        self.inner.load().is_some()
    }

    /// Store (or replace) the key.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidLength`] if `key_bytes` has the wrong length.
    pub fn store(&self, key_bytes: &[u8]) -> Result<(), KeyError> {
        let key = KeyBytes::from_slice(key_bytes)?;
        self.inner.store(Some(Arc::new(key)));
        Ok(())
    }

    /// Clone out the current key.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::NotInitialised`] if no key has been stored yet.
    pub fn current(&self) -> Result<KeyBytes, KeyError> {
        self.inner
            .load()
            .as_deref()
            .cloned()
            .ok_or(KeyError::NotInitialised)
    }
}

impl KeyProvider for KeyStore {
    fn current_key(&self) -> Result<KeyBytes, KeyError> {
        self.current()
    }
}
