//! Operational logging
//!
//! The `tracing` subscriber installed here carries service diagnostics only.
//! Audit records are written by the audit sink and never pass through it.
//! Operational logs go to stdout and, unless disabled, to rolling `app` files
//! next to the audit files.

use std::path::Path;

use tracing_appender::{
    non_blocking::{NonBlocking, WorkerGuard},
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

use crate::{
    config::{Config, LogFormat},
    error::{Error, Result},
};

/// File name prefix of the operational log
pub const APP_LOG_PREFIX: &str = "app";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global tracing subscriber
///
/// An unparseable log level falls back to `info`. Fails if a global
/// subscriber is already installed.
///
/// # Returns
/// * `Some(WorkerGuard)` when the operational log file is enabled. It must be
///   kept alive for the duration of the program so buffered lines are flushed.
pub fn init_tracing(config: &Config) -> Result<Option<WorkerGuard>> {
    let log_level = config.service.log_level.clone();
    let filter = EnvFilter::try_new(&log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer: BoxedLayer = match config.service.log_format {
        LogFormat::Json => fmt::layer().json().boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
    };
    let mut layers = vec![console_layer];

    let guard = if config.service.log_file {
        let (writer, guard) = app_log_writer(&config.audit.directory, config.audit.max_files)?;

        // File layer: JSON format for structured parsing
        layers.push(
            fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .boxed(),
        );
        Some(guard)
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| Error::Internal(format!("failed to install tracing subscriber: {e}")))?;

    tracing::info!(
        service = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        format = ?config.service.log_format,
        log_file = config.service.log_file,
        "Tracing initialized"
    );

    Ok(guard)
}

/// Daily-rolled operational log writer under `directory`
///
/// Lines are handed to a background worker, so logging never blocks the
/// caller.
pub fn app_log_writer(directory: &Path, max_files: usize) -> Result<(NonBlocking, WorkerGuard)> {
    std::fs::create_dir_all(directory)?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(APP_LOG_PREFIX)
        .filename_suffix("log")
        .max_log_files(max_files.max(1))
        .build(directory)
        .map_err(|e| Error::Internal(format!("failed to open operational log: {e}")))?;

    Ok(tracing_appender::non_blocking(appender))
}

/// Log the end of the process
pub fn shutdown_tracing() {
    tracing::info!("Tracing shutdown complete");
}
