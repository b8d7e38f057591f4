//! Telemetry initialisation for the verification tool.
//!
//! One flat JSON object per log line on stdout, so `check` and `passed` sit at
//! the top level where CI log scrapers can match them. The tool opens no spans,
//! so span context and targets are left out. Key material and sample plaintext
//! are never recorded in log fields.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Initialise the tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured `log_level`.
///
/// # Errors
///
/// Returns an error if the subscriber has already been set.
pub fn init(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .json()
        .flatten_event(true)
        .with_current_span(false)
        .with_span_list(false)
        .with_target(false)
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise statedb-verify tracing subscriber: {e}"))
}
