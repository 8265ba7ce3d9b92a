//! Configuration types for logging.

use std::str::FromStr;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event.
    Json,
    /// Human-readable pretty format with colors.
    Pretty,
    /// Compact single-line format.
    #[default]
    Compact,
}

impl FromStr for LogFormat {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "json" => Self::Json,
            "pretty" => Self::Pretty,
            _ => Self::default(),
        })
    }
}

/// Configuration for the tracing subscriber.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Log output format.
    log_format: LogFormat,
    /// Filter directives (e.g., "warn", "info,pace_core=trace").
    log_filter: String,
    /// Whether to include source location in logs.
    include_location: bool,
    /// Whether to include target in logs.
    include_target: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::default(),
            log_filter: "warn".to_string(),
            include_location: false,
            include_target: true,
        }
    }
}

impl TracingConfig {
    /// Create a new builder.
    pub fn builder() -> TracingConfigBuilder {
        TracingConfigBuilder::default()
    }

    /// Filter for a `-v` count.
    pub fn filter_for(verbosity: u8) -> &'static str {
        match verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    /// Get the log format.
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Get the log filter.
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Check if source location should be included.
    pub fn include_location(&self) -> bool {
        self.include_location
    }

    /// Check if target should be included.
    pub fn include_target(&self) -> bool {
        self.include_target
    }
}

/// Builder for TracingConfig.
#[derive(Debug, Clone, Default)]
pub struct TracingConfigBuilder {
    log_format: Option<LogFormat>,
    log_filter: Option<String>,
    include_location: Option<bool>,
}

impl TracingConfigBuilder {
    /// Set the log format.
    pub fn log_format(mut self, format: LogFormat) -> Self {
        self.log_format = Some(format);
        self
    }

    /// Set the log filter.
    pub fn log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = Some(filter.into());
        self
    }

    /// Include source location in logs.
    pub fn include_location(mut self, include: bool) -> Self {
        self.include_location = Some(include);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> TracingConfig {
        let defaults = TracingConfig::default();
        TracingConfig {
            log_format: self.log_format.unwrap_or(defaults.log_format),
            log_filter: self.log_filter.unwrap_or(defaults.log_filter),
            include_location: self.include_location.unwrap_or(defaults.include_location),
            include_target: defaults.include_target,
        }
    }
}
