//! Build a chain from a list of steps.

use super::parallel::{Task, Tasks, parallel};
use pace_core::{Chain, ChainError, Flow, Result, Scheduler, Value};

type ThenFn = Box<dyn FnOnce(Value, &Chain) -> Result<Flow>>;
type RescueFn = Box<dyn FnOnce(ChainError, &Chain) -> Result<Flow>>;

/// One entry of a sequence.
pub enum Step {
    /// A success handler.
    Then(ThenFn),
    /// A failure handler.
    Rescue(RescueFn),
    /// Positional tasks run through [`parallel`].
    Parallel(Vec<Task>),
    /// Keyed tasks run through [`parallel`].
    Keyed(Vec<(String, Task)>),
    /// Steps spliced in place.
    Nested(Vec<Step>),
}

impl Step {
    /// A success handler step.
    pub fn then<F, R>(f: F) -> Self
    where
        F: FnOnce(Value, &Chain) -> Result<R> + 'static,
        R: Into<Flow>,
    {
        Self::Then(Box::new(move |value: Value, chain: &Chain| {
            f(value, chain).map(Into::into)
        }))
    }

    /// A failure handler step.
    pub fn rescue<G, S>(f: G) -> Self
    where
        G: FnOnce(ChainError, &Chain) -> Result<S> + 'static,
        S: Into<Flow>,
    {
        Self::Rescue(Box::new(move |error: ChainError, chain: &Chain| {
            f(error, chain).map(Into::into)
        }))
    }

    /// A positional parallel group.
    pub fn parallel(tasks: impl IntoIterator<Item = Task>) -> Self {
        Self::Parallel(tasks.into_iter().collect())
    }

    /// A keyed parallel group.
    pub fn keyed<K: Into<String>>(tasks: impl IntoIterator<Item = (K, Task)>) -> Self {
        Self::Keyed(tasks.into_iter().map(|(k, t)| (k.into(), t)).collect())
    }

    /// Steps spliced in place.
    pub fn nested(steps: impl IntoIterator<Item = Step>) -> Self {
        Self::Nested(steps.into_iter().collect())
    }
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Then(_) => f.write_str("Step::Then"),
            Self::Rescue(_) => f.write_str("Step::Rescue"),
            Self::Parallel(tasks) => f.debug_tuple("Step::Parallel").field(tasks).finish(),
            Self::Keyed(tasks) => f.debug_tuple("Step::Keyed").field(tasks).finish(),
            Self::Nested(steps) => f.debug_tuple("Step::Nested").field(steps).finish(),
        }
    }
}

/// Append `steps` to a new chain, in order. The chain is not begun.
pub fn sequence(scheduler: &Scheduler, steps: impl IntoIterator<Item = Step>) -> Chain {
    let chain = scheduler.chain();
    append(&chain, steps);
    chain
}

fn append(chain: &Chain, steps: impl IntoIterator<Item = Step>) {
    for step in steps {
        match step {
            Step::Then(f) => {
                chain.then(f);
            }
            Step::Rescue(f) => {
                chain.rescue(f);
            }
            Step::Parallel(tasks) => {
                chain.then(move |_, chain: &Chain| Ok(parallel(chain.scheduler(), Tasks::List(tasks))));
            }
            Step::Keyed(tasks) => {
                chain.then(move |_, chain: &Chain| Ok(parallel(chain.scheduler(), Tasks::Keyed(tasks))));
            }
            Step::Nested(steps) => append(chain, steps),
        }
    }
}
