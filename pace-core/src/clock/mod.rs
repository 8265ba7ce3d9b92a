//! Clock abstraction for deferring stage execution.
//!
//! Chains never touch timers directly. They ask the scheduler's [`Clock`]
//! to run a task after a delay, which lets tests drive virtual time with
//! [`ManualClock`] while applications run on a tokio `LocalSet` through
//! [`TokioClock`].

mod manual;
mod runtime;

pub use manual::ManualClock;
pub use runtime::TokioClock;

use std::time::Duration;

/// A deferred unit of work.
pub type Task = Box<dyn FnOnce() + 'static>;

/// Provider trait for deferred execution.
///
/// Implementations run tasks on the thread that scheduled them. Tasks with
/// the same due time run in the order they were scheduled.
pub trait Clock {
    /// Time elapsed since the clock was created.
    fn now(&self) -> Duration;

    /// Run `task` once `delay` has elapsed. A zero delay means the next turn,
    /// never the current one.
    fn schedule(&self, delay: Duration, task: Task);

    /// Check if this clock runs on virtual time.
    fn is_manual(&self) -> bool {
        false
    }
}
