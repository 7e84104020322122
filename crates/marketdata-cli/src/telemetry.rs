//! Tracing initialization.

use std::io;

use tracing_subscriber::fmt::format::{DefaultFields, Format};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, fmt};

/// Writer factory for log output.
type StderrWriter = fn() -> io::Stderr;

/// Initializes the tracing subscriber for structured logging.
///
/// The log level can be configured via the `RUST_LOG` environment variable.
/// If not set, defaults to `info` level. Logs are written to stderr so that
/// command output on stdout stays machine-readable.
///
/// ```bash
/// RUST_LOG=debug marketdata list equity/bars/raw/alphavantage
/// RUST_LOG=marketdata_storage=trace marketdata load ...
/// ```
///
/// # Errors
///
/// Returns an error if the tracing subscriber fails to initialize.
pub(crate) fn init_tracing() -> anyhow::Result<()> {
    let env_filter = create_env_filter()?;
    let fmt_layer = create_fmt_layer();

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;

    Ok(())
}

/// Creates an environment filter for tracing.
fn create_env_filter() -> anyhow::Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("Failed to create env filter: {e}"))
}

/// Creates a formatted tracing layer writing to stderr.
fn create_fmt_layer() -> fmt::Layer<Registry, DefaultFields, Format, StderrWriter> {
    fmt::layer()
        .with_writer(io::stderr as StderrWriter)
        .with_target(true)
        .with_thread_ids(false)
        .with_level(true)
        .with_ansi(true)
}
