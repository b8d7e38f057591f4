//! Encryption key provisioning.
//!
//! # Lifecycle
//!
//! 1. At startup the embedding process obtains the key from its secret source
//!    (configuration, a secret manager) and seeds a [`KeyStore`].
//! 2. The key lives only in memory, behind an `Arc<ArcSwapOption<_>>`.
//! 3. Each encrypt/decrypt clones the key into a short-lived [`KeyBytes`], which
//!    zeroes itself on drop.
//!
//! # Security invariants
//!
//! - No key is compiled into the binary. Callers inject a [`KeyProvider`].
//! - Key material is never logged, traced, or printed via `Debug`.

pub mod store;

pub use store::{KeyBytes, KeyError, KeyStore};

/// Source of the current state-database encryption key.
///
/// Implemented by [`KeyStore`]; embedders can supply their own (e.g. backed by
/// an HSM session) without touching the cipher code.
#[cfg_attr(test, mockall::automock)]
pub trait KeyProvider: Send + Sync {
    /// Return a copy of the key to use for the next operation.
    ///
    /// # Errors
    ///
    /// Returns a [`KeyError`] if no usable key is available.
    fn current_key(&self) -> Result<KeyBytes, KeyError>;
}
