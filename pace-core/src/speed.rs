//! Speed tokens and the policy table that maps them to a cadence.
//!
//! A speed decides two things: how long a chain waits before running its
//! next stage, and how many items an iteration tick processes before it
//! yields. The table is configuration; only the ordering from fastest to
//! slowest is fixed.

use crate::error::{ChainError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Symbolic scheduling speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "SpeedRepr", into = "SpeedRepr")]
pub enum Speed {
    /// Same turn, whole collection per tick.
    Ninja,
    /// Next turn, large chunks.
    Rapid,
    /// Next turn, medium chunks.
    Fast,
    /// Next turn, small chunks. The default "tick" speed.
    #[default]
    Normal,
    /// Short delay, one item per tick.
    Slow,
    /// Longer delay, one item per tick.
    Doze,
    /// About a second between items.
    Limp,
    /// Explicit delay in milliseconds, one item per tick.
    Millis(u64),
}

impl Speed {
    /// The named speeds, fastest first.
    pub const NAMED: [Speed; 7] = [
        Speed::Ninja,
        Speed::Rapid,
        Speed::Fast,
        Speed::Normal,
        Speed::Slow,
        Speed::Doze,
        Speed::Limp,
    ];

    /// Token name, or `None` for [`Speed::Millis`].
    pub fn name(self) -> Option<&'static str> {
        match self {
            Self::Ninja => Some("ninja"),
            Self::Rapid => Some("rapid"),
            Self::Fast => Some("fast"),
            Self::Normal => Some("normal"),
            Self::Slow => Some("slow"),
            Self::Doze => Some("doze"),
            Self::Limp => Some("limp"),
            Self::Millis(_) => None,
        }
    }
}

impl fmt::Display for Speed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Millis(ms) => write!(f, "{ms}ms"),
            named => f.write_str(named.name().unwrap_or_default()),
        }
    }
}

impl FromStr for Speed {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self> {
        let token = s.trim().to_ascii_lowercase();
        let named = match token.as_str() {
            "ninja" => Some(Self::Ninja),
            "rapid" => Some(Self::Rapid),
            "fast" => Some(Self::Fast),
            "normal" | "tick" => Some(Self::Normal),
            "slow" => Some(Self::Slow),
            "doze" => Some(Self::Doze),
            "limp" => Some(Self::Limp),
            _ => None,
        };
        if let Some(speed) = named {
            return Ok(speed);
        }
        let digits = token.strip_suffix("ms").unwrap_or(&token);
        digits
            .trim()
            .parse::<u64>()
            .map(Self::Millis)
            .map_err(|_| ChainError::Config {
                cause: format!("unknown speed '{s}'"),
            })
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum SpeedRepr {
    Millis(u64),
    Name(String),
}

impl TryFrom<SpeedRepr> for Speed {
    type Error = ChainError;

    fn try_from(repr: SpeedRepr) -> Result<Self> {
        match repr {
            SpeedRepr::Millis(ms) => Ok(Self::Millis(ms)),
            SpeedRepr::Name(name) => name.parse(),
        }
    }
}

impl From<Speed> for SpeedRepr {
    fn from(speed: Speed) -> Self {
        match speed {
            Speed::Millis(ms) => Self::Millis(ms),
            named => Self::Name(named.to_string()),
        }
    }
}

impl From<u64> for Speed {
    fn from(ms: u64) -> Self {
        Self::Millis(ms)
    }
}

/// How to hand control back before the next stage runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deferral {
    /// Run in the current turn.
    Immediate,
    /// Run through the clock after the given delay (zero means next turn).
    After(Duration),
}

/// Cadence of a single speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cadence {
    /// Continue in the current turn instead of going through the clock.
    #[serde(default)]
    pub same_turn: bool,

    /// Delay before the next stage when not same-turn.
    #[serde(default)]
    pub delay_ms: u64,

    /// Items processed per iteration tick.
    #[serde(default = "default_chunk")]
    pub chunk: usize,
}

fn default_chunk() -> usize {
    1
}

impl Cadence {
    /// A same-turn cadence.
    pub const fn same_turn(chunk: usize) -> Self {
        Self {
            same_turn: true,
            delay_ms: 0,
            chunk,
        }
    }

    /// A clock-driven cadence.
    pub const fn after(delay_ms: u64, chunk: usize) -> Self {
        Self {
            same_turn: false,
            delay_ms,
            chunk,
        }
    }

    /// The deferral this cadence implies.
    pub fn deferral(&self) -> Deferral {
        if self.same_turn {
            Deferral::Immediate
        } else {
            Deferral::After(Duration::from_millis(self.delay_ms))
        }
    }

    fn latency_rank(&self) -> (bool, u64) {
        (!self.same_turn, self.delay_ms)
    }
}

/// Speed table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedPolicy {
    /// Cadence for [`Speed::Ninja`].
    pub ninja: Cadence,
    /// Cadence for [`Speed::Rapid`].
    pub rapid: Cadence,
    /// Cadence for [`Speed::Fast`].
    pub fast: Cadence,
    /// Cadence for [`Speed::Normal`].
    pub normal: Cadence,
    /// Cadence for [`Speed::Slow`].
    pub slow: Cadence,
    /// Cadence for [`Speed::Doze`].
    pub doze: Cadence,
    /// Cadence for [`Speed::Limp`].
    pub limp: Cadence,
}

impl Default for SpeedPolicy {
    fn default() -> Self {
        Self {
            ninja: Cadence::same_turn(usize::MAX),
            rapid: Cadence::after(0, 256),
            fast: Cadence::after(0, 32),
            normal: Cadence::after(0, 8),
            slow: Cadence::after(16, 1),
            doze: Cadence::after(100, 1),
            limp: Cadence::after(1000, 1),
        }
    }
}

impl SpeedPolicy {
    /// Cadence for a speed. [`Speed::Millis`] bypasses the table.
    pub fn cadence(&self, speed: Speed) -> Cadence {
        match speed {
            Speed::Ninja => self.ninja,
            Speed::Rapid => self.rapid,
            Speed::Fast => self.fast,
            Speed::Normal => self.normal,
            Speed::Slow => self.slow,
            Speed::Doze => self.doze,
            Speed::Limp => self.limp,
            Speed::Millis(ms) => Cadence::after(ms, 1),
        }
    }

    /// Check that every chunk is non-zero and that no named speed is faster
    /// (lower latency or larger chunks) than the one before it.
    pub fn validate(&self) -> Result<()> {
        for speed in Speed::NAMED {
            if self.cadence(speed).chunk == 0 {
                return Err(ChainError::Config {
                    cause: format!("speed '{speed}' has a zero chunk size"),
                });
            }
        }
        for pair in Speed::NAMED.windows(2) {
            let (faster, slower) = (self.cadence(pair[0]), self.cadence(pair[1]));
            if faster.latency_rank() > slower.latency_rank() {
                return Err(ChainError::Config {
                    cause: format!("speed '{}' is slower than '{}'", pair[0], pair[1]),
                });
            }
            if faster.chunk < slower.chunk {
                return Err(ChainError::Config {
                    cause: format!(
                        "speed '{}' processes fewer items per tick than '{}'",
                        pair[0], pair[1]
                    ),
                });
            }
        }
        Ok(())
    }
}
