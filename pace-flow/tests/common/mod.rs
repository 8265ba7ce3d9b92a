//! Common test utilities for integration tests.

#![allow(dead_code)]

use pace_core::prelude::*;
use std::cell::Cell;
use std::rc::Rc;

/// Shared side-effect counter.
#[derive(Clone, Default)]
pub struct Counter(Rc<Cell<usize>>);

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bump(&self) {
        self.0.set(self.0.get() + 1);
    }

    pub fn get(&self) -> usize {
        self.0.get()
    }
}

/// Scheduler on virtual time.
pub fn test_scheduler() -> (Scheduler, ManualClock) {
    Scheduler::manual()
}

/// Build a value from JSON.
pub fn v(json: serde_json::Value) -> Value {
    Value(json)
}

/// Integer view of a value, zero if not numeric.
pub fn int(value: &Value) -> i64 {
    value.as_i64().unwrap_or_default()
}
