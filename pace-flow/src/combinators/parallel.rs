//! Run several tasks at once and wait for all of them.
//!
//! Results keep their position (or key). The first failure fails the whole
//! group; tasks still running are left alone. Canceling the group cancels
//! the nested chains it is still waiting on, and a nested chain that is
//! canceled cancels the group.

use pace_core::chain::Listener;
use pace_core::{Chain, ChainLike, Flow, Result, Scheduler, Settled, Value};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// One unit of work in a parallel group.
pub enum Task {
    /// Run when the group starts; may return a nested chain.
    Call(Box<dyn FnOnce() -> Result<Flow>>),
    /// A chain to start (if not already begun) and wait on.
    Nested(Rc<dyn ChainLike>),
    /// An already known value.
    Value(Value),
}

impl Task {
    /// A task that runs `f` when the group starts.
    pub fn call<F, R>(f: F) -> Self
    where
        F: FnOnce() -> Result<R> + 'static,
        R: Into<Flow>,
    {
        Self::Call(Box::new(move || f().map(Into::into)))
    }

    /// A task that waits on `chain`.
    pub fn nested(chain: impl ChainLike + 'static) -> Self {
        Self::Nested(Rc::new(chain))
    }

    /// A task that is already done.
    pub fn value(value: impl Into<Value>) -> Self {
        Self::Value(value.into())
    }
}

impl From<Value> for Task {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<Chain> for Task {
    fn from(chain: Chain) -> Self {
        Self::nested(chain)
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call(_) => f.write_str("Task::Call"),
            Self::Nested(chain) => write!(f, "Task::Nested({:?})", chain.chain_id()),
            Self::Value(value) => write!(f, "Task::Value({value})"),
        }
    }
}

/// Tasks of a parallel group, positional or keyed.
#[derive(Debug)]
pub enum Tasks {
    /// Resolves to an array in task order.
    List(Vec<Task>),
    /// Resolves to an object with the same keys.
    Keyed(Vec<(String, Task)>),
}

impl Tasks {
    /// Positional tasks.
    pub fn list(tasks: impl IntoIterator<Item = Task>) -> Self {
        Self::List(tasks.into_iter().collect())
    }

    /// Keyed tasks.
    pub fn keyed<K: Into<String>>(tasks: impl IntoIterator<Item = (K, Task)>) -> Self {
        Self::Keyed(tasks.into_iter().map(|(k, t)| (k.into(), t)).collect())
    }

    /// Number of tasks.
    pub fn len(&self) -> usize {
        match self {
            Self::List(tasks) => tasks.len(),
            Self::Keyed(tasks) => tasks.len(),
        }
    }

    /// Check if there are no tasks.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<Task>> for Tasks {
    fn from(tasks: Vec<Task>) -> Self {
        Self::List(tasks)
    }
}

impl From<Vec<(String, Task)>> for Tasks {
    fn from(tasks: Vec<(String, Task)>) -> Self {
        Self::Keyed(tasks)
    }
}

/// Run `tasks` together. Returns a begun chain resolving to their results.
///
/// Tasks start when the returned chain reaches its first stage, so a chain
/// canceled before then starts nothing.
pub fn parallel(scheduler: &Scheduler, tasks: impl Into<Tasks>) -> Chain {
    let join = Join::new(tasks.into());
    let chain = scheduler.chain();
    let nested: Rc<dyn ChainLike> = join;
    chain.then(move |_, _| Ok(Flow::Nested(nested)));
    if let Err(error) = chain.begin(Value::null()) {
        tracing::warn!(chain = %chain.id(), error = %error, "Parallel chain did not start");
    }
    chain
}

/// Waits on every task of a group.
struct Join {
    me: Weak<Join>,
    state: RefCell<JoinState>,
}

struct JoinState {
    tasks: Option<Vec<Task>>,
    keys: Option<Vec<String>>,
    slots: Vec<Option<Value>>,
    remaining: usize,
    outstanding: Vec<(usize, Rc<dyn ChainLike>)>,
    settled: Option<Settled>,
    listeners: Vec<Listener>,
}

impl Join {
    fn new(tasks: Tasks) -> Rc<Self> {
        let (keys, tasks) = match tasks {
            Tasks::List(tasks) => (None, tasks),
            Tasks::Keyed(tasks) => {
                let (keys, tasks) = tasks.into_iter().unzip();
                (Some(keys), tasks)
            }
        };
        let count = tasks.len();
        Rc::new_cyclic(|me| Self {
            me: me.clone(),
            state: RefCell::new(JoinState {
                tasks: Some(tasks),
                keys,
                slots: vec![None; count],
                remaining: count,
                outstanding: Vec::new(),
                settled: None,
                listeners: Vec::new(),
            }),
        })
    }

    fn watch(&self, index: usize, child: Rc<dyn ChainLike>) {
        child.start();
        if let Some(settled) = child.settlement() {
            self.task_settled(index, settled);
            return;
        }
        self.state
            .borrow_mut()
            .outstanding
            .push((index, child.clone()));
        let me = self.me.clone();
        child.subscribe(Box::new(move |settled: &Settled| {
            if let Some(join) = me.upgrade() {
                join.task_settled(index, settled.clone());
            }
        }));
    }

    fn task_settled(&self, index: usize, settled: Settled) {
        let collected = {
            let mut state = self.state.borrow_mut();
            state.outstanding.retain(|(i, _)| *i != index);
            if state.settled.is_some() {
                return;
            }
            match settled {
                Settled::Fired(Ok(value)) => {
                    state.slots[index] = Some(value);
                    state.remaining -= 1;
                    (state.remaining == 0).then(|| state.collect())
                }
                Settled::Fired(Err(error)) => {
                    tracing::debug!(task = index, error = %error, "Parallel task failed");
                    drop(state);
                    self.complete(Settled::Fired(Err(error)));
                    return;
                }
                Settled::Canceled => {
                    drop(state);
                    tracing::debug!(task = index, "Parallel task canceled");
                    self.cancel();
                    return;
                }
            }
        };
        if let Some(value) = collected {
            self.complete(Settled::Fired(Ok(value)));
        }
    }

    fn complete(&self, settled: Settled) -> Vec<(usize, Rc<dyn ChainLike>)> {
        let (listeners, outstanding) = {
            let mut state = self.state.borrow_mut();
            if state.settled.is_some() {
                return Vec::new();
            }
            state.settled = Some(settled.clone());
            (
                std::mem::take(&mut state.listeners),
                std::mem::take(&mut state.outstanding),
            )
        };
        for listener in listeners {
            listener(&settled);
        }
        outstanding
    }
}

impl JoinState {
    fn collect(&mut self) -> Value {
        let slots = std::mem::take(&mut self.slots)
            .into_iter()
            .map(Option::unwrap_or_default);
        match self.keys.take() {
            Some(keys) => Value::object(keys.into_iter().zip(slots)),
            None => Value::array(slots),
        }
    }
}

impl ChainLike for Join {
    fn start(&self) {
        let tasks = self.state.borrow_mut().tasks.take();
        let Some(tasks) = tasks else {
            return;
        };
        tracing::debug!(tasks = tasks.len(), "Parallel group started");
        if tasks.is_empty() {
            let value = self.state.borrow_mut().collect();
            self.complete(Settled::Fired(Ok(value)));
            return;
        }
        for (index, task) in tasks.into_iter().enumerate() {
            if self.state.borrow().settled.as_ref().is_some_and(Settled::is_canceled) {
                break;
            }
            match task {
                Task::Value(value) => self.task_settled(index, Settled::Fired(Ok(value))),
                Task::Nested(child) => self.watch(index, child),
                Task::Call(f) => match f() {
                    Ok(Flow::Value(value)) => self.task_settled(index, Settled::Fired(Ok(value))),
                    Ok(Flow::Nested(child)) => self.watch(index, child),
                    Err(error) => self.task_settled(index, Settled::Fired(Err(error))),
                },
            }
        }
    }

    fn settlement(&self) -> Option<Settled> {
        self.state.borrow().settled.clone()
    }

    fn subscribe(&self, listener: Listener) {
        let settled = self.state.borrow().settled.clone();
        match settled {
            Some(settled) => listener(&settled),
            None => self.state.borrow_mut().listeners.push(listener),
        }
    }

    fn cancel(&self) -> bool {
        if self.state.borrow().settled.is_some() {
            return false;
        }
        let outstanding = self.complete(Settled::Canceled);
        for (_, child) in outstanding {
            child.cancel();
        }
        true
    }
}
