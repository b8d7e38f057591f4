//! AES-256-CBC primitives.
//!
//! This module has no knowledge of key providers or stored value formats.
//! It provides the one-shot encrypt/decrypt/IV operations used by the value layer.
//!
//! # Ciphertext layout
//!
//! ```text
//! AES-256-CBC(PKCS#7(plaintext))    length = 16 * (len / 16 + 1)
//! ```
//!
//! The IV is returned to the caller and is not part of the ciphertext.

pub mod cipher;

pub use cipher::{decrypt, encrypt, generate_iv, generate_iv16, CipherError, IV_LEN, KEY_LEN};
