//! Virtual-time clock for deterministic tests.

use super::{Clock, Task};
use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::rc::Rc;
use std::time::Duration;

/// Clock that only moves when told to.
///
/// Cloning shares the same timeline, so a test can keep one handle while
/// the scheduler owns another.
#[derive(Clone, Default)]
pub struct ManualClock {
    inner: Rc<ManualInner>,
}

#[derive(Default)]
struct ManualInner {
    now: Cell<Duration>,
    seq: Cell<u64>,
    timers: RefCell<BinaryHeap<Timer>>,
}

struct Timer {
    due: Duration,
    seq: u64,
    task: Task,
}

// BinaryHeap is a max-heap; invert so the earliest (due, seq) pops first.
impl Ord for Timer {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.due, other.seq).cmp(&(self.due, self.seq))
    }
}

impl PartialOrd for Timer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Timer {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Timer {}

impl ManualClock {
    /// Create a manual clock at time zero with nothing scheduled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks waiting to run.
    pub fn pending(&self) -> usize {
        self.inner.timers.borrow().len()
    }

    /// Due time of the next task, if any.
    pub fn next_due(&self) -> Option<Duration> {
        self.inner.timers.borrow().peek().map(|t| t.due)
    }

    /// Move time forward by `by`, running every task that falls due on the
    /// way, including tasks those tasks schedule. Returns how many ran.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.inner.now.get() + by;
        let mut ran = 0;
        while let Some(task) = self.pop_due(target) {
            task();
            ran += 1;
        }
        self.inner.now.set(target);
        ran
    }

    /// Run every task due now without moving time.
    ///
    /// Zero-delay tasks scheduled by those tasks are due now too and also
    /// run, so a chain deferring with `After(0)` drains in one call. Use
    /// [`ManualClock::run_steps`] to step one task at a time.
    pub fn turn(&self) -> usize {
        self.advance(Duration::ZERO)
    }

    /// Run tasks in due order, jumping time forward, until none remain.
    ///
    /// Never returns if the scheduled work reschedules itself forever; use
    /// [`ManualClock::run_steps`] for open-ended loops.
    pub fn run_until_idle(&self) -> usize {
        self.run_steps(usize::MAX)
    }

    /// Like [`ManualClock::run_until_idle`] but stops after `limit` tasks.
    pub fn run_steps(&self, limit: usize) -> usize {
        let mut ran = 0;
        while ran < limit {
            let Some(task) = self.pop_due(Duration::MAX) else {
                break;
            };
            task();
            ran += 1;
        }
        ran
    }

    fn pop_due(&self, limit: Duration) -> Option<Task> {
        let mut timers = self.inner.timers.borrow_mut();
        if timers.peek().is_none_or(|t| t.due > limit) {
            return None;
        }
        let timer = timers.pop()?;
        if timer.due > self.inner.now.get() {
            self.inner.now.set(timer.due);
        }
        Some(timer.task)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.inner.now.get()
    }

    fn schedule(&self, delay: Duration, task: Task) {
        let seq = self.inner.seq.get();
        self.inner.seq.set(seq + 1);
        self.inner.timers.borrow_mut().push(Timer {
            due: self.inner.now.get() + delay,
            seq,
            task,
        });
    }

    fn is_manual(&self) -> bool {
        true
    }
}

impl std::fmt::Debug for ManualClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualClock")
            .field("now", &self.inner.now.get())
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<&'static str>>>, impl Fn(&'static str) -> Task) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        let make = move |name: &'static str| -> Task {
            let sink = sink.clone();
            Box::new(move || sink.borrow_mut().push(name))
        };
        (log, make)
    }

    #[test]
    fn runs_in_due_then_schedule_order() {
        let clock = ManualClock::new();
        let (log, task) = recorder();
        clock.schedule(Duration::from_millis(20), task("late"));
        clock.schedule(Duration::ZERO, task("first"));
        clock.schedule(Duration::ZERO, task("second"));

        assert_eq!(clock.turn(), 2);
        assert_eq!(*log.borrow(), vec!["first", "second"]);
        assert_eq!(clock.pending(), 1);

        clock.advance(Duration::from_millis(19));
        assert_eq!(log.borrow().len(), 2);
        clock.advance(Duration::from_millis(1));
        assert_eq!(*log.borrow(), vec!["first", "second", "late"]);
        assert_eq!(clock.now(), Duration::from_millis(20));
    }

    #[test]
    fn turn_runs_zero_delay_follow_ups_only() {
        let clock = ManualClock::new();
        let (log, task) = recorder();
        let inner_clock = clock.clone();
        let now_task = task("now");
        let later_task = task("later");
        clock.schedule(
            Duration::ZERO,
            Box::new(move || {
                inner_clock.schedule(Duration::ZERO, now_task);
                inner_clock.schedule(Duration::from_millis(1), later_task);
            }),
        );

        assert_eq!(clock.turn(), 2);
        assert_eq!(*log.borrow(), vec!["now"]);
        assert_eq!(clock.pending(), 1);
        assert_eq!(clock.now(), Duration::ZERO);
    }

    #[test]
    fn nested_scheduling_during_advance() {
        let clock = ManualClock::new();
        let hits = Rc::new(Cell::new(0));
        let inner_clock = clock.clone();
        let inner_hits = hits.clone();
        clock.schedule(
            Duration::from_millis(5),
            Box::new(move || {
                inner_hits.set(inner_hits.get() + 1);
                let again = inner_hits.clone();
                inner_clock.schedule(
                    Duration::from_millis(5),
                    Box::new(move || again.set(again.get() + 1)),
                );
            }),
        );

        assert_eq!(clock.advance(Duration::from_millis(10)), 2);
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn run_until_idle_jumps_time() {
        let clock = ManualClock::new();
        let (log, task) = recorder();
        clock.schedule(Duration::from_secs(3), task("a"));
        clock.schedule(Duration::from_secs(1), task("b"));
        assert_eq!(clock.next_due(), Some(Duration::from_secs(1)));

        assert_eq!(clock.run_until_idle(), 2);
        assert_eq!(*log.borrow(), vec!["b", "a"]);
        assert_eq!(clock.now(), Duration::from_secs(3));
        assert_eq!(clock.pending(), 0);
    }

    #[test]
    fn run_steps_bounds_work() {
        let clock = ManualClock::new();
        let (_, task) = recorder();
        for _ in 0..5 {
            clock.schedule(Duration::ZERO, task("x"));
        }
        assert_eq!(clock.run_steps(3), 3);
        assert_eq!(clock.pending(), 2);
    }
}
