//! The chain: an ordered queue of stages with a lifecycle.
//!
//! A [`Chain`] is a handle; clones refer to the same chain. Building calls
//! (`then`, `rescue`, `ensure`, `wait`, `till`, `speed`, `async_mode`,
//! `call`) append stages and return the handle for fluent use. Nothing runs
//! until [`Chain::begin`] or [`Chain::raise`].
//!
//! Every handler receives the chain it runs on, so it can cancel the rest
//! of the chain, read or write chain data, or set arguments for the next
//! handler.
//!
//! # Example
//!
//! ```
//! use pace_core::prelude::*;
//!
//! let (scheduler, clock) = Scheduler::manual();
//! let chain = scheduler
//!     .chain()
//!     .then(|_, _| Ok(1))
//!     .then(|v, _| Ok(v.as_i64().unwrap_or_default() + 1))
//!     .then(|v, _| Ok(v.as_i64().unwrap_or_default() * 100));
//! chain.begin(()).unwrap();
//! clock.run_until_idle();
//! assert_eq!(chain.result(), Some(Value::int(200)));
//! ```

mod flow;
mod run;
mod stage;

pub use flow::{ChainLike, Flow, Listener, Settled, SettledFuture};

use crate::error::{ChainError, Result};
use crate::scheduler::Scheduler;
use crate::speed::Speed;
use crate::types::{ChainId, ChainState};
use crate::value::Value;
use stage::{Stage, ensure_fn, failure_fn, success_fn};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

/// Construction options for a chain.
///
/// Unset fields take the scheduler's configured defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChainOptions {
    async_mode: Option<bool>,
    speed: Option<Speed>,
}

impl ChainOptions {
    /// Options with every field unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether stages defer between each other.
    pub fn async_mode(mut self, async_mode: bool) -> Self {
        self.async_mode = Some(async_mode);
        self
    }

    /// Initial speed.
    pub fn speed(mut self, speed: Speed) -> Self {
        self.speed = Some(speed);
        self
    }
}

/// Handle to a chain of stages.
#[derive(Clone)]
pub struct Chain {
    inner: Rc<RefCell<ChainInner>>,
    scheduler: Scheduler,
}

struct ChainInner {
    id: ChainId,
    stages: VecDeque<Stage>,
    state: ChainState,
    ended: bool,
    outcome: Result<Value>,
    cancellers: Vec<Box<dyn FnOnce()>>,
    child: Option<Rc<dyn ChainLike>>,
    listeners: Vec<Listener>,
    pending_args: Option<Vec<Value>>,
    last_args: Vec<Value>,
    data: HashMap<String, Value>,
    results: Vec<Value>,
    speed: Speed,
    async_mode: bool,
}

impl Chain {
    /// Create a chain with the scheduler's default speed and async mode.
    pub fn new(scheduler: &Scheduler) -> Self {
        Self::with_options(scheduler, ChainOptions::default())
    }

    /// Create a chain with explicit options.
    pub fn with_options(scheduler: &Scheduler, options: ChainOptions) -> Self {
        let config = scheduler.config();
        let inner = ChainInner {
            id: ChainId::next(),
            stages: VecDeque::new(),
            state: ChainState::Initial,
            ended: false,
            outcome: Ok(Value::null()),
            cancellers: Vec::new(),
            child: None,
            listeners: Vec::new(),
            pending_args: None,
            last_args: Vec::new(),
            data: HashMap::new(),
            results: Vec::new(),
            speed: options.speed.unwrap_or(config.default_speed),
            async_mode: options.async_mode.unwrap_or(config.async_mode),
        };
        Self {
            inner: Rc::new(RefCell::new(inner)),
            scheduler: scheduler.clone(),
        }
    }

    // -------------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------------

    /// Unique identifier of this chain.
    pub fn id(&self) -> ChainId {
        self.inner.borrow().id
    }

    /// Current run state.
    pub fn state(&self) -> ChainState {
        self.inner.borrow().state
    }

    /// Check if `end()` has been called.
    pub fn is_ended(&self) -> bool {
        self.inner.borrow().ended
    }

    /// Check if the chain has drained its queue.
    pub fn is_fired(&self) -> bool {
        self.state() == ChainState::Fired
    }

    /// Check if the chain was canceled.
    pub fn is_canceled(&self) -> bool {
        self.state() == ChainState::Canceled
    }

    /// Number of stages still queued.
    pub fn len(&self) -> usize {
        self.inner.borrow().stages.len()
    }

    /// Check if no stages are queued.
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().stages.is_empty()
    }

    /// The last value produced, unless the chain currently holds an error.
    pub fn result(&self) -> Option<Value> {
        self.inner.borrow().outcome.as_ref().ok().cloned()
    }

    /// The error the chain currently holds, if any.
    pub fn error(&self) -> Option<ChainError> {
        self.inner.borrow().outcome.as_ref().err().cloned()
    }

    /// The current outcome.
    pub fn outcome(&self) -> Result<Value> {
        self.inner.borrow().outcome.clone()
    }

    /// Current speed.
    pub fn current_speed(&self) -> Speed {
        self.inner.borrow().speed
    }

    /// Whether stages currently defer between each other.
    pub fn is_async(&self) -> bool {
        self.inner.borrow().async_mode
    }

    /// The scheduler this chain runs on.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Terminal outcome, if the chain has fired or been canceled.
    pub fn settlement(&self) -> Option<Settled> {
        let inner = self.inner.borrow();
        match inner.state {
            ChainState::Fired => Some(Settled::Fired(inner.outcome.clone())),
            ChainState::Canceled => Some(Settled::Canceled),
            _ => None,
        }
    }

    /// Run `listener` when the chain settles, or right away if it already has.
    pub fn on_settled(&self, listener: impl FnOnce(&Settled) + 'static) {
        match self.settlement() {
            Some(settled) => listener(&settled),
            None => self.inner.borrow_mut().listeners.push(Box::new(listener)),
        }
    }

    /// Future that resolves when the chain settles.
    pub fn settled(&self) -> SettledFuture {
        SettledFuture::attach(self)
    }

    // -------------------------------------------------------------------------
    // Building
    // -------------------------------------------------------------------------

    /// Append a success handler. Errors skip it.
    pub fn then<F, R>(&self, on_success: F) -> Chain
    where
        F: FnOnce(Value, &Chain) -> Result<R> + 'static,
        R: Into<Flow>,
    {
        self.push(Stage::Then {
            on_success: Some(success_fn(on_success)),
            on_failure: None,
            record: true,
        })
    }

    /// Append a stage with both a success and a failure handler.
    pub fn then_or<F, G, R, S>(&self, on_success: F, on_failure: G) -> Chain
    where
        F: FnOnce(Value, &Chain) -> Result<R> + 'static,
        G: FnOnce(ChainError, &Chain) -> Result<S> + 'static,
        R: Into<Flow>,
        S: Into<Flow>,
    {
        self.push(Stage::Then {
            on_success: Some(success_fn(on_success)),
            on_failure: Some(failure_fn(on_failure)),
            record: true,
        })
    }

    /// Append a failure handler. Values skip it.
    pub fn rescue<G, S>(&self, on_failure: G) -> Chain
    where
        G: FnOnce(ChainError, &Chain) -> Result<S> + 'static,
        S: Into<Flow>,
    {
        self.push(Stage::Then {
            on_success: None,
            on_failure: Some(failure_fn(on_failure)),
            record: true,
        })
    }

    /// Append a handler that runs on success and failure alike.
    pub fn ensure<H, R>(&self, on_any: H) -> Chain
    where
        H: FnOnce(Result<Value>, &Chain) -> Result<R> + 'static,
        R: Into<Flow>,
    {
        self.push(Stage::Ensure(ensure_fn(on_any)))
    }

    /// Insert a success handler ahead of every stage still queued.
    ///
    /// Used to continue work that is already in progress, so it is not
    /// blocked by `end()`.
    pub fn then_next<F, R>(&self, on_success: F) -> Chain
    where
        F: FnOnce(Value, &Chain) -> Result<R> + 'static,
        R: Into<Flow>,
    {
        self.insert(
            Stage::Then {
                on_success: Some(success_fn(on_success)),
                on_failure: None,
                record: false,
            },
            true,
        )
    }

    /// Suspend for `delay`, then continue with the prior value.
    pub fn wait(&self, delay: Duration) -> Chain {
        self.push(Stage::Wait { delay, value: None })
    }

    /// Suspend for `delay`, then continue with `value`.
    pub fn wait_value(&self, delay: Duration, value: impl Into<Value>) -> Chain {
        self.push(Stage::Wait {
            delay,
            value: Some(value.into()),
        })
    }

    /// Suspend until `predicate` returns true.
    ///
    /// The predicate is checked when the stage is reached, then on a timer.
    pub fn till(&self, predicate: impl FnMut() -> bool + 'static) -> Chain {
        self.push(Stage::Till(Box::new(predicate)))
    }

    /// Change the speed for the stages after this one.
    pub fn speed(&self, speed: Speed) -> Chain {
        self.push(Stage::Speed(speed))
    }

    /// Change whether the stages after this one defer.
    pub fn async_mode(&self, async_mode: bool) -> Chain {
        self.push(Stage::Async(async_mode))
    }

    /// Append a registered verb.
    ///
    /// The verb is looked up now; if it is not registered the stage fails
    /// with [`ChainError::UnknownVerb`] when reached.
    pub fn call(&self, name: &str, inputs: Vec<Value>) -> Chain {
        let resolver = self.scheduler.verbs().get(name);
        if resolver.is_none() {
            tracing::warn!(chain = %self.id(), verb = %name, "Unknown verb");
        }
        self.push(Stage::Verb {
            name: name.to_string(),
            inputs,
            resolver,
        })
    }

    /// Register a cleanup callback run when the chain is canceled.
    ///
    /// Cancellers accumulate. One registered on a fired chain is kept, since
    /// appending a stage restarts the chain and it may still be canceled.
    pub fn canceller(&self, canceller: impl FnOnce() + 'static) -> Chain {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.state == ChainState::Canceled {
                tracing::debug!(chain = %inner.id, state = %inner.state, "Canceller ignored");
            } else {
                inner.cancellers.push(Box::new(canceller));
            }
        }
        self.clone()
    }

    /// Close the chain to further appends. Queued stages still run.
    pub fn end(&self) -> Chain {
        self.inner.borrow_mut().ended = true;
        self.clone()
    }

    // -------------------------------------------------------------------------
    // Arguments and data
    // -------------------------------------------------------------------------

    /// Set the value(s) the next handler receives instead of the prior result.
    ///
    /// One value is delivered as is; several are delivered as an array that
    /// [`Value::destructure`] splits back apart.
    pub fn set_args(&self, args: Vec<Value>) -> Chain {
        self.inner.borrow_mut().pending_args = Some(args);
        self.clone()
    }

    /// Arguments waiting for the next handler, or the last ones delivered.
    pub fn args(&self) -> Vec<Value> {
        let inner = self.inner.borrow();
        inner
            .pending_args
            .clone()
            .unwrap_or_else(|| inner.last_args.clone())
    }

    /// Read a data entry.
    pub fn data(&self, key: &str) -> Option<Value> {
        self.inner.borrow().data.get(key).cloned()
    }

    /// Write a data entry.
    pub fn set_data(&self, key: impl Into<String>, value: impl Into<Value>) -> Chain {
        self.inner
            .borrow_mut()
            .data
            .insert(key.into(), value.into());
        self.clone()
    }

    /// Write several data entries.
    pub fn merge_data<K: Into<String>>(&self, entries: impl IntoIterator<Item = (K, Value)>) -> Chain {
        {
            let mut inner = self.inner.borrow_mut();
            for (key, value) in entries {
                inner.data.insert(key.into(), value);
            }
        }
        self.clone()
    }

    /// Remove a data entry.
    pub fn remove_data(&self, key: &str) -> Option<Value> {
        self.inner.borrow_mut().data.remove(key)
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Start the chain with `value` as the first handler's input.
    pub fn begin(&self, value: impl Into<Value>) -> Result<Chain> {
        self.start_with(Ok(value.into()), "begin")
    }

    /// Start the chain holding `error`, so the first failure handler runs.
    pub fn raise(&self, error: ChainError) -> Result<Chain> {
        self.start_with(Err(error), "raise")
    }

    fn start_with(&self, seed: Result<Value>, operation: &'static str) -> Result<Chain> {
        let (id, stages) = {
            let mut inner = self.inner.borrow_mut();
            if inner.state != ChainState::Initial {
                return Err(ChainError::InvalidState {
                    operation,
                    state: inner.state,
                });
            }
            inner.state = ChainState::Running;
            if let Ok(value) = &seed {
                inner.results.push(value.clone());
            }
            inner.outcome = seed;
            (inner.id, inner.stages.len())
        };
        tracing::debug!(chain = %id, stages, operation, "Chain started");
        self.schedule_pump();
        Ok(self.clone())
    }

    fn push(&self, stage: Stage) -> Chain {
        self.insert(stage, false)
    }

    fn insert(&self, stage: Stage, front: bool) -> Chain {
        let restart = {
            let mut inner = self.inner.borrow_mut();
            let closed = inner.state == ChainState::Canceled || (inner.ended && !front);
            if closed {
                if inner.state == ChainState::Canceled {
                    tracing::debug!(
                        chain = %inner.id,
                        stage = stage.kind(),
                        "Ignoring stage on canceled chain"
                    );
                } else {
                    tracing::warn!(
                        chain = %inner.id,
                        stage = stage.kind(),
                        state = %inner.state,
                        "Ignoring stage appended after end"
                    );
                }
                return self.clone();
            }
            if front {
                inner.stages.push_front(stage);
            } else {
                inner.stages.push_back(stage);
            }
            if inner.state == ChainState::Fired {
                inner.state = ChainState::Running;
                true
            } else {
                false
            }
        };
        if restart {
            tracing::debug!(chain = %self.id(), "Restarting fired chain");
            self.schedule_pump();
        }
        self.clone()
    }
}

impl ChainLike for Chain {
    fn chain_id(&self) -> Option<ChainId> {
        Some(self.id())
    }

    fn start(&self) {
        if self.state() == ChainState::Initial {
            // Cannot fail: the state was just checked on this thread.
            let _ = self.begin(Value::null());
        }
    }

    fn settlement(&self) -> Option<Settled> {
        Chain::settlement(self)
    }

    fn subscribe(&self, listener: Listener) {
        self.on_settled(listener);
    }

    fn cancel(&self) -> bool {
        Chain::cancel(self)
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Chain")
            .field("id", &inner.id)
            .field("state", &inner.state)
            .field("ended", &inner.ended)
            .field("stages", &inner.stages.len())
            .field("speed", &inner.speed)
            .finish()
    }
}
