//! pace flow library
//!
//! Iteration and combinators on top of `pace-core` chains.
//!
//! # Key Components
//!
//! - **iter**: immediate loops and the chain-driven [`Stepper`], both with
//!   [`LoopControl`] early exit
//! - **combinators**: [`parallel`] groups, [`sequence`] builders and
//!   one-line shortcuts
//!
//! # Example
//!
//! ```
//! use pace_core::prelude::*;
//! use pace_flow::prelude::*;
//!
//! let (scheduler, clock) = Scheduler::manual();
//! let chain = parallel(
//!     &scheduler,
//!     Tasks::keyed([
//!         ("a", Task::value(1)),
//!         ("b", Task::from(scheduler.chain().then(|_, _| Ok(2)))),
//!     ]),
//! );
//! clock.run_until_idle();
//! assert_eq!(chain.result().and_then(|v| v.get("b")), Some(Value::int(2)));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod combinators;
pub mod iter;
pub mod prelude;

pub use combinators::{Step, Task, Tasks, parallel, sequence};
pub use iter::{Key, LoopControl, RangeSpec, Repeat, Stepper};
