//! Common error types shared across crates.

use thiserror::Error;

/// Top-level state database encryption error.
///
/// This is what the storage layer sees; the crypto crate converts its
/// layer-specific errors into one of these variants.
/// - [`StateDbError::Encryption`] → value could not be encrypted on write
/// - [`StateDbError::Decryption`] → stored value could not be decrypted on read
/// - [`StateDbError::KeyUnavailable`] → no key has been provisioned
#[derive(Debug, Error)]
pub enum StateDbError {
    /// Encrypting a value before it is written failed.
    #[error("encryption failure: {0}")]
    Encryption(String),

    /// A stored value failed to decrypt (wrong key, corruption, bad padding).
    #[error("decryption failure: {0}")]
    Decryption(String),

    /// The encryption key is not provisioned or is malformed.
    #[error("key unavailable: {0}")]
    KeyUnavailable(String),

    /// A persisted envelope could not be encoded or decoded.
    #[error("encoding failure: {0}")]
    Encoding(String),

    /// The random source could not produce an IV. Retrying may succeed.
    #[error("entropy unavailable: {0}")]
    EntropyUnavailable(String),
}

impl StateDbError {
    /// Returns `true` if a caller-level retry with the same inputs can succeed.
    ///
    /// Cipher failures are deterministic; only the random source is not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StateDbError::EntropyUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_entropy_failures_are_retryable() {
        assert!(StateDbError::EntropyUnavailable("x".into()).is_retryable());
        assert!(!StateDbError::Encryption("x".into()).is_retryable());
        assert!(!StateDbError::Decryption("x".into()).is_retryable());
        assert!(!StateDbError::KeyUnavailable("x".into()).is_retryable());
        assert!(!StateDbError::Encoding("x".into()).is_retryable());
    }

    #[test]
    fn display_includes_message() {
        let e = StateDbError::Decryption("invalid padding".into());
        assert!(e.to_string().contains("invalid padding"));
    }
}
