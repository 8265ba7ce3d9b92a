//! Common test utilities for integration tests.

#![allow(dead_code)]

use pace_core::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

/// Shared log of events recorded by handlers.
#[derive(Clone, Default)]
pub struct Journal {
    entries: Rc<RefCell<Vec<String>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.entries.borrow_mut().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }
}

/// Scheduler on virtual time with a private verb registry.
pub fn test_scheduler() -> (Scheduler, ManualClock) {
    let (scheduler, clock) = Scheduler::manual();
    (
        scheduler.with_verbs(std::sync::Arc::new(VerbRegistry::new())),
        clock,
    )
}

/// Integer view of a value, zero if not numeric.
pub fn int(value: &Value) -> i64 {
    value.as_i64().unwrap_or_default()
}
