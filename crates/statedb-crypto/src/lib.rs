//! AES-256-CBC encryption for ledger state-database values.
//!
//! - [`crypto`]: one-shot encrypt / decrypt / IV generation.
//! - [`key`]: key injection via [`key::KeyProvider`] and the in-memory [`key::KeyStore`].
//! - [`value`]: `ENC:`-prefixed stored values and version-and-metadata encoding.

pub mod crypto;
pub mod key;
pub mod value;

pub use crypto::{decrypt, encrypt, generate_iv, CipherError};
pub use key::{KeyBytes, KeyError, KeyProvider, KeyStore};
pub use value::{EncryptedValue, ValueCipher, ValueError};
