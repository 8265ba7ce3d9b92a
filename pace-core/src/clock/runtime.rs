//! Clock backed by the tokio timer on a `LocalSet`.

use super::{Clock, Task};
use std::time::Duration;
use tokio::time::Instant;

/// Clock that spawns each task onto the current tokio `LocalSet`.
///
/// Chains are `!Send`, so their tasks must stay on one thread. Every call
/// to [`Clock::schedule`] uses `tokio::task::spawn_local`, which panics
/// outside of a `LocalSet` context; run chains inside
/// `LocalSet::run_until` or `LocalSet::block_on`.
#[derive(Debug, Clone)]
pub struct TokioClock {
    start: Instant,
}

impl TokioClock {
    /// Create a clock whose `now()` counts from this instant.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn schedule(&self, delay: Duration, task: Task) {
        tokio::task::spawn_local(async move {
            if delay.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(delay).await;
            }
            task();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[tokio::test(start_paused = true)]
    async fn tasks_run_in_due_order() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let clock = TokioClock::new();
                let log = Rc::new(RefCell::new(Vec::new()));

                let sink = log.clone();
                clock.schedule(
                    Duration::from_millis(50),
                    Box::new(move || sink.borrow_mut().push("slow")),
                );
                let sink = log.clone();
                clock.schedule(
                    Duration::from_millis(10),
                    Box::new(move || sink.borrow_mut().push("quick")),
                );

                tokio::time::sleep(Duration::from_millis(100)).await;
                assert_eq!(*log.borrow(), vec!["quick", "slow"]);
                assert!(clock.now() >= Duration::from_millis(100));
            })
            .await;
    }
}
