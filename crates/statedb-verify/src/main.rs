//! `statedb-verify` — self-check for state-database value encryption.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise structured JSON logging.
//! 3. Provision the key store from `STATEDB_ENCRYPTION_KEY`.
//! 4. Run every check and exit non-zero if any failed.

mod check;
mod config;
mod telemetry;

use anyhow::{Context, Result};
use statedb_crypto::{KeyStore, ValueCipher};
use tracing::{error, info};

use config::Config;

fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: statedb-verify configuration invalid: {e}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init(&cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        iv_samples = cfg.iv_sample_count,
        "statedb-verify starting"
    );

    // -----------------------------------------------------------------------
    // 3. Key provisioning
    // -----------------------------------------------------------------------
    let store = KeyStore::from_base64(&cfg.statedb_encryption_key)
        .context("failed to load STATEDB_ENCRYPTION_KEY")?;
    let vc = ValueCipher::new(store);

    // -----------------------------------------------------------------------
    // 4. Checks
    // -----------------------------------------------------------------------
    let outcomes = check::run_all(&vc, &cfg);
    if let Some(summary) = check::failure_summary(&outcomes) {
        let failed = outcomes.iter().filter(|o| !o.passed).count();
        error!(
            failed,
            total = outcomes.len(),
            checks = %summary,
            "state encryption verification failed"
        );
        anyhow::bail!("{failed} of {} checks failed: {summary}", outcomes.len());
    }

    info!(total = outcomes.len(), "state encryption verified");
    Ok(())
}
