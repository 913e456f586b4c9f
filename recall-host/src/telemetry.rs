//! Tracing subscriber setup for RECALL binaries.

use recall_core::RecallError;
use recall_core::config::GeneralConfig;
use tracing_subscriber::EnvFilter;

use crate::error::Result;

/// Install a global `fmt` subscriber.
///
/// `RUST_LOG` wins over `config.log_level` when set. `log_format = "json"`
/// selects structured JSON lines; anything else is human-readable text.
///
/// # Errors
/// Returns `RecallError::Config` for an unparseable level or when a global
/// subscriber is already installed.
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level)
            .map_err(|e| RecallError::Config(format!("log level '{}': {e}", config.log_level)))?,
    };

    let installed = if config.log_format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init()
    };
    installed.map_err(|e| RecallError::Config(format!("tracing subscriber: {e}")))?;
    Ok(())
}
