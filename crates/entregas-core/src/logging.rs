//! Tracing subscriber setup.
//!
//! Filter precedence: `ENTREGAS_LOG`, then `[log].level`, then `warn`.
//! Output goes to stderr; `[log].file = true` adds a daily-rolling file
//! under `<ENTREGAS_HOME>/logs/`.

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LoggingConfig, paths};

/// Env var holding an `EnvFilter` directive.
pub const LOG_ENV: &str = "ENTREGAS_LOG";

const LOG_FILE_PREFIX: &str = "entregas.log";

/// Builds the filter from env, then config, then `warn`.
pub fn build_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(config.level.trim()))
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Installs the global subscriber.
///
/// Returns the file writer's guard when file logging is on; the caller must
/// hold it until exit so buffered lines are flushed.
///
/// # Errors
/// Returns an error if the log directory cannot be created.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    init_in(config, &paths::logs_dir())
}

/// Same as [`init`] with an explicit log directory.
///
/// # Errors
/// Returns an error if the log directory cannot be created.
pub fn init_in(config: &LoggingConfig, logs_dir: &Path) -> Result<Option<WorkerGuard>> {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(build_filter(config));

    let (file_layer, guard) = if config.file {
        std::fs::create_dir_all(logs_dir)
            .with_context(|| format!("Failed to create log directory {}", logs_dir.display()))?;
        let appender = tracing_appender::rolling::daily(logs_dir, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_filter(build_filter(config));
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init();

    Ok(guard)
}
