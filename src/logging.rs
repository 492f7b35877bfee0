//! Logging infrastructure for waitless.
//!
//! Uses tracing with console output for humans and daily-rotated JSON
//! files for later inspection.

use crate::config::get_home_dir;
use crate::error::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging with console and file output.
///
/// Returns a guard that must be held for the lifetime of the program
/// to ensure buffered log lines are flushed on shutdown.
pub fn init_logging() -> Result<WorkerGuard> {
    let log_dir = get_home_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "waitless.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,waitless=debug"));

    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false).json();

    let console_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    Ok(guard)
}
