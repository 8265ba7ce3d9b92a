//! Driving a chain: the stage pump, flattening, firing and cancellation.
//!
//! No `RefCell` borrow is held while user code runs. Handlers may append
//! to, cancel, or read the chain they run on.

use super::flow::{ChainLike, Settled};
use super::stage::{PredicateFn, Stage};
use super::{Chain, Flow};
use crate::error::{ChainError, Result};
use crate::registry::VerbCall;
use crate::speed::Deferral;
use crate::types::ChainState;
use crate::value::Value;
use std::rc::Rc;

/// Whether the pump may move on to the next stage.
enum Step {
    /// The stage stored its outcome.
    Done,
    /// The stage resumes the chain later through a timer or a nested chain.
    Suspended,
}

impl Chain {
    pub(super) fn schedule_pump(&self) {
        let (speed, async_mode) = {
            let inner = self.inner.borrow();
            (inner.speed, inner.async_mode)
        };
        let chain = self.clone();
        self.scheduler
            .schedule(speed, async_mode, Box::new(move || chain.pump()));
    }

    fn is_running(&self) -> bool {
        self.inner.borrow().state == ChainState::Running
    }

    /// Run stages until one suspends, the chain has to defer, or the queue
    /// is empty.
    fn pump(&self) {
        loop {
            let stage = {
                let mut inner = self.inner.borrow_mut();
                if inner.state != ChainState::Running {
                    return;
                }
                inner.stages.pop_front()
            };
            let Some(stage) = stage else {
                self.fire();
                return;
            };
            if let Step::Suspended = self.run_stage(stage) {
                return;
            }
            if !self.ready_for_next() {
                return;
            }
        }
    }

    /// After a stage completes: fire if nothing is left, otherwise decide
    /// whether the next stage runs in this turn.
    fn ready_for_next(&self) -> bool {
        let (speed, async_mode) = {
            let inner = self.inner.borrow();
            if inner.state != ChainState::Running {
                return false;
            }
            if !inner.stages.is_empty() {
                (inner.speed, inner.async_mode)
            } else {
                drop(inner);
                self.fire();
                return false;
            }
        };
        match self.scheduler.deferral(speed, async_mode) {
            Deferral::Immediate => true,
            Deferral::After(delay) => {
                let chain = self.clone();
                self.scheduler.after(delay, Box::new(move || chain.pump()));
                false
            }
        }
    }

    /// Continue after a suspended stage produced its outcome.
    fn resume(&self, outcome: Result<Value>, record: bool) {
        if !self.is_running() {
            return;
        }
        self.store(outcome, record);
        if self.ready_for_next() {
            self.pump();
        }
    }

    fn store(&self, outcome: Result<Value>, record: bool) {
        let mut inner = self.inner.borrow_mut();
        if record {
            if let Ok(value) = &outcome {
                inner.results.push(value.clone());
            }
        }
        inner.outcome = outcome;
    }

    fn run_stage(&self, stage: Stage) -> Step {
        let (outcome, id) = {
            let mut inner = self.inner.borrow_mut();
            (std::mem::replace(&mut inner.outcome, Ok(Value::null())), inner.id)
        };
        tracing::trace!(chain = %id, stage = stage.kind(), ok = outcome.is_ok(), "Running stage");

        match stage {
            Stage::Then {
                on_success,
                on_failure,
                record,
            } => match (outcome, on_success, on_failure) {
                (Ok(value), Some(on_success), _) => {
                    let input = self.take_input(value);
                    let produced = on_success(input, self);
                    self.settle(produced, record)
                }
                (Err(error), _, Some(on_failure)) => {
                    let produced = on_failure(error, self);
                    self.settle(produced, record)
                }
                (outcome, _, _) => self.pass(outcome),
            },
            Stage::Ensure(on_any) => {
                let produced = on_any(outcome, self);
                self.settle(produced, true)
            }
            Stage::Wait { delay, value } => match outcome {
                Err(error) => self.pass(Err(error)),
                Ok(prior) => {
                    let next = value.unwrap_or(prior);
                    let chain = self.clone();
                    self.scheduler
                        .after(delay, Box::new(move || chain.resume(Ok(next), false)));
                    Step::Suspended
                }
            },
            Stage::Till(predicate) => match outcome {
                Err(error) => self.pass(Err(error)),
                Ok(value) => self.poll(predicate, value),
            },
            Stage::Verb {
                name,
                inputs,
                resolver,
            } => match (outcome, resolver) {
                (Err(error), _) => self.pass(Err(error)),
                (Ok(_), None) => self.pass(Err(ChainError::UnknownVerb { name })),
                (Ok(_), Some(resolver)) => {
                    let results = self.inner.borrow().results.clone();
                    let produced = resolver(VerbCall { inputs, results }, self);
                    self.settle(produced, true)
                }
            },
            Stage::Speed(speed) => {
                self.inner.borrow_mut().speed = speed;
                self.pass(outcome)
            }
            Stage::Async(async_mode) => {
                self.inner.borrow_mut().async_mode = async_mode;
                self.pass(outcome)
            }
        }
    }

    fn pass(&self, outcome: Result<Value>) -> Step {
        self.store(outcome, false);
        Step::Done
    }

    /// The success handler's input: pending arguments if set, else the value.
    fn take_input(&self, value: Value) -> Value {
        let mut inner = self.inner.borrow_mut();
        match inner.pending_args.take() {
            None => value,
            Some(mut args) => {
                inner.last_args = args.clone();
                if args.len() == 1 {
                    args.pop().unwrap_or_default()
                } else {
                    Value::array(args)
                }
            }
        }
    }

    /// Flatten what a handler returned into the chain's outcome.
    fn settle(&self, produced: Result<Flow>, record: bool) -> Step {
        if !self.is_running() {
            tracing::trace!(chain = %self.id(), "Handler result dropped after cancel");
            return Step::Done;
        }
        match produced {
            Ok(Flow::Value(value)) => self.pass_recorded(Ok(value), record),
            Ok(Flow::Nested(child)) => self.adopt(child, record),
            Err(error) => self.pass(Err(error)),
        }
    }

    fn pass_recorded(&self, outcome: Result<Value>, record: bool) -> Step {
        self.store(outcome, record);
        Step::Done
    }

    /// Wait on a nested chain. Canceling this chain cancels the nested one
    /// until it settles.
    fn adopt(&self, child: Rc<dyn ChainLike>, record: bool) -> Step {
        let id = self.id();
        if child.chain_id() == Some(id) {
            return self.pass(Err(ChainError::CyclicChain { chain: id }));
        }
        self.inner.borrow_mut().child = Some(child.clone());
        child.start();

        if let Some(settled) = child.settlement() {
            self.inner.borrow_mut().child = None;
            return match settled {
                Settled::Fired(outcome) => self.pass_recorded(outcome, record),
                Settled::Canceled => {
                    self.cancel();
                    Step::Done
                }
            };
        }

        tracing::trace!(chain = %id, nested = ?child.chain_id(), "Waiting on nested chain");
        let outer = self.clone();
        child.subscribe(Box::new(move |settled: &Settled| {
            outer.inner.borrow_mut().child = None;
            match settled {
                Settled::Fired(outcome) => outer.resume(outcome.clone(), record),
                Settled::Canceled => {
                    outer.cancel();
                }
            }
        }));
        Step::Suspended
    }

    fn poll(&self, mut predicate: PredicateFn, value: Value) -> Step {
        if predicate() {
            return self.pass(Ok(value));
        }
        self.repoll(predicate, value);
        Step::Suspended
    }

    fn repoll(&self, predicate: PredicateFn, value: Value) {
        let interval = self.scheduler.poll_interval(self.current_speed());
        let chain = self.clone();
        self.scheduler.after(
            interval,
            Box::new(move || chain.poll_again(predicate, value)),
        );
    }

    fn poll_again(&self, mut predicate: PredicateFn, value: Value) {
        if !self.is_running() {
            return;
        }
        if predicate() {
            self.resume(Ok(value), false);
        } else {
            self.repoll(predicate, value);
        }
    }

    fn fire(&self) {
        let (listeners, settled, id) = {
            let mut inner = self.inner.borrow_mut();
            if inner.state != ChainState::Running {
                return;
            }
            inner.state = ChainState::Fired;
            (
                std::mem::take(&mut inner.listeners),
                Settled::Fired(inner.outcome.clone()),
                inner.id,
            )
        };
        match &settled {
            Settled::Fired(Err(error)) => {
                tracing::debug!(chain = %id, error = %error, "Chain fired with unrecovered error")
            }
            _ => tracing::debug!(chain = %id, "Chain fired"),
        }
        for listener in listeners {
            listener(&settled);
        }
    }

    /// Cancel the chain.
    ///
    /// From `Initial` or `Running`: the chain becomes `Canceled` and its
    /// queued stages are discarded. Then its cancellers run in registration
    /// order and a nested chain being waited on is canceled. A handler that
    /// is running finishes, but its result is ignored. Returns `false` if
    /// the chain had already fired or been canceled.
    ///
    /// The state changes before any canceller runs. A canceller therefore
    /// sees a canceled chain: its appends are ignored and a second `cancel`
    /// returns `false`.
    pub fn cancel(&self) -> bool {
        let (cancellers, child, listeners, id) = {
            let mut inner = self.inner.borrow_mut();
            if inner.state.is_terminal() {
                return false;
            }
            inner.state = ChainState::Canceled;
            inner.stages.clear();
            inner.pending_args = None;
            (
                std::mem::take(&mut inner.cancellers),
                inner.child.take(),
                std::mem::take(&mut inner.listeners),
                inner.id,
            )
        };
        tracing::debug!(chain = %id, cancellers = cancellers.len(), "Chain canceled");
        for canceller in cancellers {
            canceller();
        }
        if let Some(child) = child {
            child.cancel();
        }
        for listener in listeners {
            listener(&Settled::Canceled);
        }
        true
    }
}
