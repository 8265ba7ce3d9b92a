//! Logging setup for the `pace` binary.
//!
//! The output format is controlled by `PACE_LOG_FORMAT`:
//! - `json` - one JSON object per event
//! - `pretty` - multi-line, colored (default on a TTY)
//! - `compact` - single line (default otherwise)
//!
//! The filter comes from `-v` flags unless `RUST_LOG` is set.

mod config;
mod tracing_setup;

pub use config::{LogFormat, TracingConfig};
pub use tracing_setup::{TracingGuard, init_tracing};
