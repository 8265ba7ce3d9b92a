//! Tracing subscriber setup with format selection.

use anyhow::{Context, Result};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use super::{TracingConfig, config::LogFormat};

/// Keeps logging set up while alive.
pub struct TracingGuard {
    format: LogFormat,
}

impl Drop for TracingGuard {
    fn drop(&mut self) {
        tracing::trace!(format = ?self.format, "Tracing shut down");
    }
}

/// Install the global subscriber.
///
/// Returns a guard that must be kept alive for the duration of the program.
/// An invalid filter falls back to `warn`.
pub fn init_tracing(config: TracingConfig) -> Result<TracingGuard> {
    let filter = EnvFilter::try_new(config.log_filter()).unwrap_or_else(|_| EnvFilter::new("warn"));

    match config.log_format() {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_file(config.include_location())
                        .with_line_number(config.include_location())
                        .with_target(config.include_target())
                        .with_span_events(FmtSpan::CLOSE)
                        .flatten_event(true),
                )
                .try_init()
                .context("Failed to initialize tracing subscriber")?;
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .pretty()
                        .with_writer(std::io::stderr)
                        .with_file(config.include_location())
                        .with_line_number(config.include_location())
                        .with_target(config.include_target()),
                )
                .try_init()
                .context("Failed to initialize tracing subscriber")?;
        }
        LogFormat::Compact => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .compact()
                        .with_writer(std::io::stderr)
                        .with_file(config.include_location())
                        .with_line_number(config.include_location())
                        .with_target(config.include_target()),
                )
                .try_init()
                .context("Failed to initialize tracing subscriber")?;
        }
    }
    Ok(TracingGuard {
        format: config.log_format(),
    })
}
