//! Scheduler configuration.
//!
//! Loaded from YAML, from `PACE_*` environment variables, or built in
//! code with the `with_*` methods.

use crate::error::{ChainError, Result};
use crate::speed::{Speed, SpeedPolicy};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for a [`crate::Scheduler`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Speed given to new chains.
    #[serde(default)]
    pub default_speed: Speed,

    /// Whether new chains defer between stages.
    #[serde(default = "default_async_mode")]
    pub async_mode: bool,

    /// Minimum interval between `till` predicate checks in milliseconds.
    #[serde(default = "default_till_interval_ms")]
    pub till_interval_ms: u64,

    /// Cadence for each speed.
    #[serde(default)]
    pub speeds: SpeedPolicy,
}

fn default_async_mode() -> bool {
    true
}
fn default_till_interval_ms() -> u64 {
    10
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_speed: Speed::default(),
            async_mode: default_async_mode(),
            till_interval_ms: default_till_interval_ms(),
            speeds: SpeedPolicy::default(),
        }
    }
}

impl SchedulerConfig {
    /// Create configuration from environment variables.
    ///
    /// Reads:
    /// - `PACE_DEFAULT_SPEED`: speed token or milliseconds (default: normal)
    /// - `PACE_ASYNC`: `true`/`false`/`1`/`0` (default: true)
    /// - `PACE_TILL_INTERVAL_MS`: till poll floor (default: 10)
    ///
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        let default_speed = std::env::var("PACE_DEFAULT_SPEED")
            .ok()
            .and_then(|s| s.parse::<Speed>().ok())
            .unwrap_or_default();

        let async_mode = std::env::var("PACE_ASYNC")
            .ok()
            .and_then(|s| parse_flag(&s))
            .unwrap_or_else(default_async_mode);

        let till_interval_ms = std::env::var("PACE_TILL_INTERVAL_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or_else(default_till_interval_ms);

        Self {
            default_speed,
            async_mode,
            till_interval_ms,
            speeds: SpeedPolicy::default(),
        }
    }

    /// Parse configuration from a YAML document and validate it.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|e| ChainError::Config {
            cause: format!("YAML parse error: {e}"),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ChainError::Config {
            cause: format!("cannot read {}: {e}", path.display()),
        })?;
        Self::from_yaml(&text)
    }

    /// Render configuration as YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| ChainError::Config {
            cause: format!("YAML render error: {e}"),
        })
    }

    /// Check the speed table ordering.
    pub fn validate(&self) -> Result<()> {
        self.speeds.validate()
    }

    /// Set the default speed.
    pub fn with_default_speed(mut self, speed: Speed) -> Self {
        self.default_speed = speed;
        self
    }

    /// Set whether new chains defer between stages.
    pub fn with_async_mode(mut self, async_mode: bool) -> Self {
        self.async_mode = async_mode;
        self
    }

    /// Set the till poll floor.
    pub fn with_till_interval(mut self, interval: Duration) -> Self {
        self.till_interval_ms = interval.as_millis().max(1) as u64;
        self
    }

    /// Replace the speed table.
    pub fn with_speeds(mut self, speeds: SpeedPolicy) -> Self {
        self.speeds = speeds;
        self
    }

    /// Get the till poll floor as Duration.
    pub fn till_interval(&self) -> Duration {
        Duration::from_millis(self.till_interval_ms)
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
