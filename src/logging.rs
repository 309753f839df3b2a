//! Console + log file output
//!
//! Every line is timestamped and carries its level. tracing has no level above
//! ERROR, so fatal conditions go through [`critical!`](crate::critical) which
//! logs at ERROR with a `CRITICAL:` prefix.

use crate::error::{QcError, Result};
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

pub const DEFAULT_LOG_FILE: &str = "automation_log.txt";

/// Installs the global subscriber. The log file is truncated on every run.
pub fn init(log_file: &Path) -> Result<()> {
    let file = File::create(log_file)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = fmt::layer().with_target(false).with_writer(std::io::stdout);
    let file_layer = fmt::layer()
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(file));

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| QcError::Config(format!("logging already initialised: {}", e)))?;

    tracing::info!("Logging system initialized. Log file: {}", log_file.display());
    Ok(())
}

#[macro_export]
macro_rules! critical {
    ($($arg:tt)*) => {
        ::tracing::error!("CRITICAL: {}", format_args!($($arg)*))
    };
}
