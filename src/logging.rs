//! Tracing subscriber setup.

use crate::error::{PacerError, Result};
use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global fmt subscriber filtered by `level` (an `EnvFilter` directive).
pub fn init_logging(level: &str) -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_new(level)
                .map_err(|e| PacerError::InvalidConfig(format!("invalid log level: {e}")))?,
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|_| PacerError::InvalidConfig("logging already initialized".into()))
}
