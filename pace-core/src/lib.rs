//! pace core library
//!
//! Cooperative chains of possibly-deferred steps on a single thread.
//!
//! # Overview
//!
//! A [`Chain`] is an ordered queue of stages. Each stage's handler gets the
//! previous stage's value (or error) and returns a value, an error, or
//! another chain to wait on. A [`Scheduler`] decides, per [`Speed`], whether
//! the next stage runs in the current turn or is handed to its [`Clock`].
//!
//! # Key Components
//!
//! - **Chain**: lifecycle state machine, cancellation, args and data
//! - **Scheduler**: speed table plus an injected clock
//! - **Flow / ChainLike**: flattening of nested chains
//! - **VerbRegistry**: named custom stages added with `Chain::call`
//!
//! # Example
//!
//! ```
//! use pace_core::prelude::*;
//! use std::time::Duration;
//!
//! let (scheduler, clock) = Scheduler::manual();
//! let chain = scheduler
//!     .chain()
//!     .wait(Duration::from_millis(250))
//!     .then(|v, _| Ok(format!("hello {}", v.as_str().unwrap_or("?"))));
//! chain.begin("world").unwrap();
//!
//! clock.advance(Duration::from_millis(250));
//! assert_eq!(chain.result(), Some(Value::from("hello world")));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chain;
pub mod clock;
pub mod config;
pub mod error;
pub mod prelude;
pub mod registry;
pub mod scheduler;
pub mod speed;
pub mod types;
pub mod value;

// Re-export key types at crate root for convenience
pub use chain::{Chain, ChainLike, ChainOptions, Flow, Settled, SettledFuture};
pub use clock::{Clock, ManualClock, TokioClock};
pub use config::SchedulerConfig;
pub use error::{ChainError, Result};
pub use registry::{VerbCall, VerbRegistry};
pub use scheduler::Scheduler;
pub use speed::{Cadence, Deferral, Speed, SpeedPolicy};
pub use types::{ChainId, ChainState};
pub use value::Value;
