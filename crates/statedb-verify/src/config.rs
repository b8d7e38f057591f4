//! Configuration loading and validation for the verification tool.

use anyhow::{Context, Result};
use serde::Deserialize;

/// Validated verification tool configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Base64-encoded 32-byte state-database key. **Required.**
    pub statedb_encryption_key: String,

    /// Plaintext used by the round-trip checks.
    #[serde(default = "default_sample_plaintext")]
    pub sample_plaintext: String,

    /// Number of IVs generated by the uniqueness check.
    #[serde(default = "default_iv_sample_count")]
    pub iv_sample_count: usize,

    /// Tracing log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_sample_plaintext() -> String {
    "hello-ledger-state".into()
}
fn default_iv_sample_count() -> usize {
    10_000
}
fn default_log_level() -> String {
    "info".into()
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("statedb_encryption_key", &"[REDACTED]")
            .field("sample_plaintext", &self.sample_plaintext)
            .field("iv_sample_count", &self.iv_sample_count)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Config {
    /// Load and validate configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build statedb-verify configuration")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise statedb-verify configuration")?;

        c.validate()?;
        Ok(c)
    }

    fn validate(&self) -> Result<()> {
        if self.statedb_encryption_key.trim().is_empty() {
            anyhow::bail!("STATEDB_ENCRYPTION_KEY is required and must not be empty");
        }
        if self.iv_sample_count == 0 {
            anyhow::bail!("IV_SAMPLE_COUNT must be > 0");
        }
        Ok(())
    }
}
