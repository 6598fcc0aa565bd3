//! Tracing setup shared by the binaries.

use std::fs::OpenOptions;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::adapters::SanitizingMakeWriter;
use crate::config::{LogConfig, LogMode};

/// Install the global subscriber: `RUST_LOG` filter (default `info`), a
/// non-blocking writer to stderr or the configured file, and log sanitization.
///
/// Stdout is never used; the endpoint writes responses there.
/// Keep the returned guard alive until exit so buffered lines are flushed.
///
/// # Errors
/// Returns error if the log file cannot be opened.
pub fn init(config: &LogConfig) -> std::io::Result<WorkerGuard> {
    let (writer, guard) = match config.mode {
        LogMode::File => {
            if let Some(parent) = config.file.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&config.file)?;
            tracing_appender::non_blocking(file)
        }
        LogMode::Stderr => tracing_appender::non_blocking(std::io::stderr()),
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(SanitizingMakeWriter::new(writer));

    if tracing_subscriber::registry().with(filter).with(fmt).try_init().is_err() {
        tracing::warn!("A global tracing subscriber was already installed");
    }
    Ok(guard)
}
