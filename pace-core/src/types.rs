//! Identifier and state types shared across the crate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CHAIN_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier for a chain instance.
///
/// Unique within the process; used in log fields and error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChainId(u64);

impl ChainId {
    /// Create a chain ID from a raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocate the next unused chain ID.
    pub fn next() -> Self {
        Self(NEXT_CHAIN_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chain_{}", self.0)
    }
}

/// Run state of a chain.
///
/// Whether a chain has been closed with `end()` is tracked separately,
/// since it does not interact with the run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainState {
    /// Built but not yet begun.
    Initial,
    /// Draining stages.
    Running,
    /// Reached the end of its queue with a value or an unrecovered error.
    Fired,
    /// Canceled before reaching the end of its queue.
    Canceled,
}

impl ChainState {
    /// Check if the chain can no longer change state by itself.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Fired | Self::Canceled)
    }
}

impl fmt::Display for ChainState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initial => "initial",
            Self::Running => "running",
            Self::Fired => "fired",
            Self::Canceled => "canceled",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_ids_are_unique() {
        let a = ChainId::next();
        let b = ChainId::next();
        assert_ne!(a, b);
        assert!(b.as_u64() > a.as_u64());
    }

    #[test]
    fn chain_id_display() {
        assert_eq!(ChainId::new(7).to_string(), "chain_7");
    }

    #[test]
    fn terminal_states() {
        assert!(!ChainState::Initial.is_terminal());
        assert!(!ChainState::Running.is_terminal());
        assert!(ChainState::Fired.is_terminal());
        assert!(ChainState::Canceled.is_terminal());
    }
}
