//! # Logging Bootstrap
//!
//! Installs the global tracing subscriber from [`LoggingConfig`].
//!
//! Everything in this crate logs through `tracing` with structured fields
//! (`connection`, `opcode`, `error`), so operators can filter one
//! misbehaving peer out of a busy server's output.

use crate::config::LoggingConfig;
use crate::error::{Result, WireError};

/// Install the global subscriber. Call once at process start, before any
/// connection is accepted.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_target(false);

    let installed = if config.json_format {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed
        .map_err(|e| WireError::Misconfiguration(format!("failed to install tracing subscriber: {e}")))
}
