//! Prelude for convenient imports.
//!
//! # Example
//!
//! ```
//! use pace_core::prelude::*;
//! ```

// Core types
pub use crate::types::{ChainId, ChainState};
pub use crate::value::Value;

// Error handling
pub use crate::error::{ChainError, Result, ResultExt};

// Chains
pub use crate::chain::{Chain, ChainLike, ChainOptions, Flow, Settled, SettledFuture};

// Scheduling
pub use crate::clock::{Clock, ManualClock, TokioClock};
pub use crate::config::SchedulerConfig;
pub use crate::scheduler::Scheduler;
pub use crate::speed::{Cadence, Deferral, Speed, SpeedPolicy};

// Verbs
pub use crate::registry::{VerbCall, VerbRegistry};
