//! Queued stages and the boxed handler types they carry.

use super::Chain;
use super::flow::Flow;
use crate::error::{ChainError, Result};
use crate::registry::Resolver;
use crate::speed::Speed;
use crate::value::Value;
use std::time::Duration;

pub(crate) type SuccessFn = Box<dyn FnOnce(Value, &Chain) -> Result<Flow>>;
pub(crate) type FailureFn = Box<dyn FnOnce(ChainError, &Chain) -> Result<Flow>>;
pub(crate) type EnsureFn = Box<dyn FnOnce(Result<Value>, &Chain) -> Result<Flow>>;
pub(crate) type PredicateFn = Box<dyn FnMut() -> bool>;

pub(crate) fn success_fn<F, R>(f: F) -> SuccessFn
where
    F: FnOnce(Value, &Chain) -> Result<R> + 'static,
    R: Into<Flow>,
{
    Box::new(move |value: Value, chain: &Chain| f(value, chain).map(Into::into))
}

pub(crate) fn failure_fn<F, R>(f: F) -> FailureFn
where
    F: FnOnce(ChainError, &Chain) -> Result<R> + 'static,
    R: Into<Flow>,
{
    Box::new(move |error: ChainError, chain: &Chain| f(error, chain).map(Into::into))
}

pub(crate) fn ensure_fn<F, R>(f: F) -> EnsureFn
where
    F: FnOnce(Result<Value>, &Chain) -> Result<R> + 'static,
    R: Into<Flow>,
{
    Box::new(move |outcome: Result<Value>, chain: &Chain| f(outcome, chain).map(Into::into))
}

pub(crate) enum Stage {
    /// Success and/or failure handler. `record` adds the value to the
    /// results verbs see.
    Then {
        on_success: Option<SuccessFn>,
        on_failure: Option<FailureFn>,
        record: bool,
    },
    Ensure(EnsureFn),
    Wait {
        delay: Duration,
        value: Option<Value>,
    },
    Till(PredicateFn),
    Verb {
        name: String,
        inputs: Vec<Value>,
        resolver: Option<Resolver>,
    },
    Speed(Speed),
    Async(bool),
}

impl Stage {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::Then {
                on_success: Some(_),
                ..
            } => "then",
            Self::Then { .. } => "rescue",
            Self::Ensure(_) => "ensure",
            Self::Wait { .. } => "wait",
            Self::Till(_) => "till",
            Self::Verb { .. } => "verb",
            Self::Speed(_) => "speed",
            Self::Async(_) => "async",
        }
    }
}
