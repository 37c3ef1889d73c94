//! Tracing subscriber setup
//!
//! Console output always; a daily rolling file when `logging.directory` is set.

use crate::config::LoggingConfig;
use crate::error::{Result, StoreError};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Install the global subscriber.
///
/// Keep the returned guard alive for as long as logs should be flushed to the file.
/// Fails if a global subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| StoreError::Config(format!("invalid log level '{}': {}", config.level, e)))?;

    let console = tracing_subscriber::fmt::layer().with_target(true);

    let (file_layer, guard) = match &config.directory {
        Some(dir) => {
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(config.file_name.as_str())
                .max_log_files(config.max_files)
                .build(dir)
                .map_err(|e| StoreError::Config(format!("cannot create log file in {:?}: {}", dir, e)))?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|e| StoreError::Config(format!("logging already initialised: {}", e)))?;

    tracing::info!("Logging initialised (level: {})", config.level);
    Ok(guard)
}
