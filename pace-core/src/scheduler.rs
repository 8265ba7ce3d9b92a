//! The scheduler clock: speed policy plus an injected [`Clock`].
//!
//! A `Scheduler` is a cheap, cloneable handle. Every chain keeps one and
//! asks it how to defer its next stage.

use crate::chain::{Chain, ChainOptions};
use crate::clock::{Clock, ManualClock, Task, TokioClock};
use crate::config::SchedulerConfig;
use crate::registry::{self, VerbRegistry};
use crate::speed::{Deferral, Speed};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

/// Handle to a clock, a speed table and a verb registry.
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<SchedulerInner>,
}

struct SchedulerInner {
    clock: Rc<dyn Clock>,
    config: SchedulerConfig,
    verbs: Arc<VerbRegistry>,
}

impl Scheduler {
    /// Create a scheduler with the default configuration and the
    /// process-wide verb registry.
    pub fn new(clock: impl Clock + 'static) -> Self {
        Self::with_config(clock, SchedulerConfig::default())
    }

    /// Create a scheduler with an explicit configuration.
    pub fn with_config(clock: impl Clock + 'static, config: SchedulerConfig) -> Self {
        Self::build(Rc::new(clock), config, registry::verbs().clone())
    }

    /// Create a scheduler on virtual time, returning the clock handle that
    /// drives it.
    pub fn manual() -> (Self, ManualClock) {
        let clock = ManualClock::new();
        (Self::new(clock.clone()), clock)
    }

    /// Create a scheduler that runs on the current tokio `LocalSet`.
    pub fn tokio() -> Self {
        Self::new(TokioClock::new())
    }

    /// Use a private verb registry instead of the process-wide one.
    pub fn with_verbs(self, verbs: Arc<VerbRegistry>) -> Self {
        Self::build(self.inner.clock.clone(), self.inner.config.clone(), verbs)
    }

    fn build(clock: Rc<dyn Clock>, config: SchedulerConfig, verbs: Arc<VerbRegistry>) -> Self {
        Self {
            inner: Rc::new(SchedulerInner {
                clock,
                config,
                verbs,
            }),
        }
    }

    /// Create a chain with this scheduler's defaults.
    pub fn chain(&self) -> Chain {
        Chain::new(self)
    }

    /// Create a chain with explicit options.
    pub fn chain_with(&self, options: ChainOptions) -> Chain {
        Chain::with_options(self, options)
    }

    /// Decide how to defer work at `speed`.
    pub fn deferral(&self, speed: Speed, async_mode: bool) -> Deferral {
        if !async_mode {
            return Deferral::Immediate;
        }
        self.inner.config.speeds.cadence(speed).deferral()
    }

    /// Items an iteration tick processes at `speed`.
    pub fn chunk_size(&self, speed: Speed) -> usize {
        self.inner.config.speeds.cadence(speed).chunk.max(1)
    }

    /// Interval between `till` checks at `speed`.
    pub fn poll_interval(&self, speed: Speed) -> Duration {
        let floor = self.inner.config.till_interval();
        match self.deferral(speed, true) {
            Deferral::After(delay) => delay.max(floor),
            Deferral::Immediate => floor,
        }
    }

    /// Run `task` now or through the clock, per the speed table.
    pub fn schedule(&self, speed: Speed, async_mode: bool, task: Task) {
        match self.deferral(speed, async_mode) {
            Deferral::Immediate => task(),
            Deferral::After(delay) => self.inner.clock.schedule(delay, task),
        }
    }

    /// Run `task` through the clock after `delay`, whatever the speed.
    pub fn after(&self, delay: Duration, task: Task) {
        self.inner.clock.schedule(delay, task);
    }

    /// Current clock time.
    pub fn now(&self) -> Duration {
        self.inner.clock.now()
    }

    /// The active configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    /// The verb registry chains built on this scheduler consult.
    pub fn verbs(&self) -> &Arc<VerbRegistry> {
        &self.inner.verbs
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("manual", &self.inner.clock.is_manual())
            .field("default_speed", &self.inner.config.default_speed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn sync_mode_is_always_immediate() {
        let (scheduler, _) = Scheduler::manual();
        assert_eq!(scheduler.deferral(Speed::Limp, false), Deferral::Immediate);
        assert_eq!(
            scheduler.deferral(Speed::Limp, true),
            Deferral::After(Duration::from_secs(1))
        );
    }

    #[test]
    fn schedule_runs_same_turn_or_through_clock() {
        let (scheduler, clock) = Scheduler::manual();
        let hits = Rc::new(Cell::new(0));

        let h = hits.clone();
        scheduler.schedule(Speed::Ninja, true, Box::new(move || h.set(h.get() + 1)));
        assert_eq!(hits.get(), 1);

        let h = hits.clone();
        scheduler.schedule(Speed::Millis(30), true, Box::new(move || h.set(h.get() + 1)));
        assert_eq!(hits.get(), 1);
        clock.advance(Duration::from_millis(29));
        assert_eq!(hits.get(), 1);
        clock.advance(Duration::from_millis(1));
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn chunk_sizes_follow_table() {
        let (scheduler, _) = Scheduler::manual();
        assert_eq!(scheduler.chunk_size(Speed::Ninja), usize::MAX);
        assert!(scheduler.chunk_size(Speed::Rapid) > scheduler.chunk_size(Speed::Normal));
        assert_eq!(scheduler.chunk_size(Speed::Limp), 1);
        assert_eq!(scheduler.chunk_size(Speed::Millis(3)), 1);
    }

    #[test]
    fn poll_interval_has_floor() {
        let (scheduler, _) = Scheduler::manual();
        assert_eq!(scheduler.poll_interval(Speed::Ninja), Duration::from_millis(10));
        assert_eq!(scheduler.poll_interval(Speed::Doze), Duration::from_millis(100));
    }

    #[test]
    fn private_registry() {
        let (scheduler, _) = Scheduler::manual();
        let private = Arc::new(VerbRegistry::new());
        let scheduler = scheduler.with_verbs(private.clone());
        assert!(Arc::ptr_eq(scheduler.verbs(), &private));
    }
}
