//! Transparent encryption of state-database values.
//!
//! Values are encrypted on write and decrypted on read. Applications above the
//! state database only ever see plaintext.
//!
//! # Stored format
//!
//! ```text
//! ENC:<base64(iv || ciphertext)>
//! ```
//!
//! The `ENC:` prefix marks a value as encrypted. Values without it were written
//! before encryption was enabled and are returned unchanged on read.

pub mod encoding;

use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::StateDbError;
use thiserror::Error;
use tracing::{debug, warn};

use crate::crypto::cipher::{self, CipherError, BLOCK_LEN, IV_LEN};
use crate::key::{KeyError, KeyProvider};

pub use encoding::{decode_version_and_metadata, encode_version_and_metadata, EncodingError};

/// Prefix that appears at the start of every encrypted stored value.
pub const ENC_PREFIX: &str = "ENC:";

/// Errors produced by the value layer.
#[derive(Debug, Error)]
pub enum ValueError {
    /// The key provider could not supply a key.
    #[error(transparent)]
    Key(#[from] KeyError),

    /// Encrypting the value failed.
    #[error("encrypt: {0}")]
    Encrypt(CipherError),

    /// Decrypting a stored value failed.
    #[error("decrypt: {0}")]
    Decrypt(CipherError),

    /// A value carrying the `ENC:` prefix is not a valid encrypted envelope.
    #[error("invalid encrypted value format")]
    InvalidFormat,
}

impl From<ValueError> for StateDbError {
    fn from(e: ValueError) -> Self {
        match e {
            ValueError::Key(e) => StateDbError::KeyUnavailable(e.to_string()),
            ValueError::Encrypt(e) | ValueError::Decrypt(e) if e.is_retryable() => {
                StateDbError::EntropyUnavailable(e.to_string())
            }
            ValueError::Encrypt(e) => StateDbError::Encryption(e.to_string()),
            ValueError::Decrypt(e) => StateDbError::Decryption(e.to_string()),
            ValueError::InvalidFormat => {
                StateDbError::Decryption("invalid encrypted value format".into())
            }
        }
    }
}

/// A parsed, encrypted state value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedValue {
    /// IV used for this value.
    pub iv: [u8; IV_LEN],
    /// AES-256-CBC ciphertext, a whole number of blocks.
    pub ciphertext: Vec<u8>,
}

impl EncryptedValue {
    /// Raw `iv || ciphertext` bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(IV_LEN + self.ciphertext.len());
        out.extend_from_slice(&self.iv);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Split raw `iv || ciphertext` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::InvalidFormat`] unless `bytes` holds an IV followed
    /// by at least one whole ciphertext block.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ValueError> {
        if bytes.len() < IV_LEN + BLOCK_LEN || (bytes.len() - IV_LEN) % BLOCK_LEN != 0 {
            return Err(ValueError::InvalidFormat);
        }
        let (iv_bytes, ciphertext) = bytes.split_at(IV_LEN);
        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(iv_bytes);
        Ok(Self {
            iv,
            ciphertext: ciphertext.to_vec(),
        })
    }

    /// Encode this value to its stored `ENC:` representation.
    pub fn to_string_repr(&self) -> String {
        format!("{ENC_PREFIX}{}", STANDARD.encode(self.to_bytes()))
    }
}

impl FromStr for EncryptedValue {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s.strip_prefix(ENC_PREFIX).ok_or(ValueError::InvalidFormat)?;
        let raw = STANDARD
            .decode(body)
            .map_err(|_| ValueError::InvalidFormat)?;
        Self::from_bytes(&raw)
    }
}

/// Returns `true` if `stored` carries the `ENC:` prefix.
pub fn is_encrypted(stored: &[u8]) -> bool {
    stored.starts_with(ENC_PREFIX.as_bytes())
}

/// Encrypts and decrypts state values with the key supplied by `P`.
///
/// Holds no mutable state; share it freely across threads.
#[derive(Debug, Clone)]
pub struct ValueCipher<P> {
    provider: P,
}

impl<P: KeyProvider> ValueCipher<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Encrypt `value` under a fresh IV and return its `ENC:` stored form.
    ///
    /// `namespace` and `key_name` identify the state entry in logs only.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::Key`] if no key is available and
    /// [`ValueError::Encrypt`] if IV generation or encryption fails.
    pub fn encrypt_value(
        &self,
        value: &[u8],
        namespace: &str,
        key_name: &str,
    ) -> Result<Vec<u8>, ValueError> {
        let key = self.provider.current_key()?;
        let iv = cipher::generate_iv16().map_err(ValueError::Encrypt)?;
        let ciphertext =
            cipher::encrypt(value, key.as_bytes(), &iv).map_err(ValueError::Encrypt)?;

        debug!(namespace, key = key_name, "state value encrypted");
        Ok(EncryptedValue { iv, ciphertext }
            .to_string_repr()
            .into_bytes())
    }

    /// Decrypt a stored value.
    ///
    /// Values without the `ENC:` prefix are returned as-is and do not touch the
    /// key provider.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::InvalidFormat`] for a malformed envelope,
    /// [`ValueError::Key`] if no key is available, and [`ValueError::Decrypt`]
    /// if decryption fails (typically invalid padding from a wrong key).
    pub fn decrypt_value(
        &self,
        stored: &[u8],
        namespace: &str,
        key_name: &str,
    ) -> Result<Vec<u8>, ValueError> {
        if !is_encrypted(stored) {
            return Ok(stored.to_vec());
        }
        let repr = std::str::from_utf8(stored).map_err(|_| ValueError::InvalidFormat)?;
        let envelope: EncryptedValue = repr.parse()?;

        let key = self.provider.current_key()?;
        cipher::decrypt(&envelope.ciphertext, key.as_bytes(), &envelope.iv).map_err(|e| {
            warn!(namespace, key = key_name, error = %e, "state value failed to decrypt");
            ValueError::Decrypt(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KEY_LEN;
    use crate::key::{KeyBytes, KeyStore, MockKeyProvider};

    const TEST_KEY: &[u8; KEY_LEN] = b"my32digitkey12345678901234567890";

    fn store_cipher() -> ValueCipher<KeyStore> {
        let store = KeyStore::new();
        store.store(TEST_KEY).unwrap();
        ValueCipher::new(store)
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let vc = store_cipher();
        let stored = vc.encrypt_value(b"{\"balance\":100}", "mycc", "acct1").unwrap();
        assert!(is_encrypted(&stored));
        let plain = vc.decrypt_value(&stored, "mycc", "acct1").unwrap();
        assert_eq!(plain, b"{\"balance\":100}");
    }

    #[test]
    fn empty_value_round_trips() {
        let vc = store_cipher();
        let stored = vc.encrypt_value(b"", "ns", "k").unwrap();
        assert!(is_encrypted(&stored));
        assert!(vc.decrypt_value(&stored, "ns", "k").unwrap().is_empty());
    }

    #[test]
    fn same_value_encrypts_differently_each_time() {
        let vc = store_cipher();
        let a = vc.encrypt_value(b"same", "ns", "k").unwrap();
        let b = vc.encrypt_value(b"same", "ns", "k").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn known_envelope_decrypts() {
        let envelope = EncryptedValue {
            iv: core::array::from_fn(|i| i as u8),
            ciphertext: hex::decode(
                "9f33319160fa5768b8e61bf4cca33e7131ced77a34d65597d671642969884d0c",
            )
            .unwrap(),
        };
        let stored = envelope.to_string_repr();
        let plain = store_cipher()
            .decrypt_value(stored.as_bytes(), "ns", "k")
            .unwrap();
        assert_eq!(plain, b"hello-ledger-state");
    }

    #[test]
    fn legacy_plaintext_passes_through_without_key() {
        let mut provider = MockKeyProvider::new();
        provider.expect_current_key().times(0);
        let vc = ValueCipher::new(provider);
        assert_eq!(
            vc.decrypt_value(b"plain legacy value", "ns", "k").unwrap(),
            b"plain legacy value"
        );
        assert!(vc.decrypt_value(b"", "ns", "k").unwrap().is_empty());
    }

    #[test]
    fn missing_key_is_reported() {
        let mut provider = MockKeyProvider::new();
        provider
            .expect_current_key()
            .times(1)
            .returning(|| Err(KeyError::NotInitialised));
        let vc = ValueCipher::new(provider);
        let err = vc.encrypt_value(b"v", "ns", "k").unwrap_err();
        assert!(matches!(err, ValueError::Key(KeyError::NotInitialised)));
        assert!(matches!(
            StateDbError::from(err),
            StateDbError::KeyUnavailable(_)
        ));
    }

    #[test]
    fn provider_key_is_used_for_each_call() {
        let mut provider = MockKeyProvider::new();
        provider
            .expect_current_key()
            .times(2)
            .returning(|| KeyBytes::from_slice(TEST_KEY));
        let vc = ValueCipher::new(provider);
        let stored = vc.encrypt_value(b"value", "ns", "k").unwrap();
        assert_eq!(vc.decrypt_value(&stored, "ns", "k").unwrap(), b"value");
    }

    #[test]
    fn wrong_key_fails_or_garbles() {
        let stored = store_cipher().encrypt_value(b"secret", "ns", "k").unwrap();
        let other = KeyStore::new();
        other.store(&[0x42u8; KEY_LEN]).unwrap();
        match ValueCipher::new(other).decrypt_value(&stored, "ns", "k") {
            Err(ValueError::Decrypt(CipherError::Padding)) => {}
            Ok(p) => assert_ne!(p, b"secret"),
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    #[test]
    fn decrypt_failure_maps_to_decryption_error() {
        let err = ValueError::Decrypt(CipherError::Padding);
        assert!(matches!(StateDbError::from(err), StateDbError::Decryption(_)));
        let err = ValueError::Encrypt(CipherError::RandomSource("x".into()));
        let mapped = StateDbError::from(err);
        assert!(matches!(mapped, StateDbError::EntropyUnavailable(_)));
        assert!(mapped.is_retryable());
    }

    #[test]
    fn malformed_envelopes_rejected() {
        let vc = store_cipher();
        let bad_values: [&[u8]; 3] = [
            b"ENC:!!!",
            b"ENC:",
            // 10 bytes: shorter than an IV.
            b"ENC:AAAAAAAAAAAAAA==",
        ];
        for bad in bad_values {
            assert!(matches!(
                vc.decrypt_value(bad, "ns", "k"),
                Err(ValueError::InvalidFormat)
            ));
        }
    }

    #[test]
    fn string_repr_round_trip() {
        let envelope = EncryptedValue {
            iv: [9u8; IV_LEN],
            ciphertext: vec![7u8; 32],
        };
        let s = envelope.to_string_repr();
        assert!(s.starts_with(ENC_PREFIX));
        assert_eq!(s.parse::<EncryptedValue>().unwrap(), envelope);
        assert_eq!(
            EncryptedValue::from_bytes(&envelope.to_bytes()).unwrap(),
            envelope
        );
    }

    #[test]
    fn from_bytes_rejects_partial_blocks() {
        assert!(EncryptedValue::from_bytes(&[0u8; IV_LEN]).is_err());
        assert!(EncryptedValue::from_bytes(&[0u8; IV_LEN + 17]).is_err());
        assert!("v1.abc".parse::<EncryptedValue>().is_err());
    }
}
