//! What a handler hands back, and how other chains are awaited.

use crate::error::Result;
use crate::types::ChainId;
use crate::value::Value;
use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

/// Terminal outcome of a chain.
#[derive(Debug, Clone, PartialEq)]
pub enum Settled {
    /// Drained its queue with a value or an unrecovered error.
    Fired(Result<Value>),
    /// Canceled before draining its queue.
    Canceled,
}

impl Settled {
    /// Check if the chain was canceled.
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }

    /// The fired outcome, or `None` if canceled.
    pub fn into_result(self) -> Option<Result<Value>> {
        match self {
            Self::Fired(outcome) => Some(outcome),
            Self::Canceled => None,
        }
    }
}

/// One-shot callback for a chain's terminal event.
pub type Listener = Box<dyn FnOnce(&Settled) + 'static>;

/// Capability needed to await something as a nested chain.
///
/// A handler that returns a `ChainLike` suspends its chain until the nested
/// one settles. Anything else a handler returns is a plain value.
pub trait ChainLike {
    /// Identity used to reject a chain waiting on itself.
    fn chain_id(&self) -> Option<ChainId> {
        None
    }

    /// Begin the chain if it has not been begun.
    fn start(&self);

    /// Terminal outcome, if already settled.
    fn settlement(&self) -> Option<Settled>;

    /// Run `listener` once when the chain settles.
    fn subscribe(&self, listener: Listener);

    /// Cancel the chain. Returns whether anything was canceled.
    fn cancel(&self) -> bool;
}

/// A stage result: either a value, or a chain to wait on.
#[derive(Clone)]
pub enum Flow {
    /// Resolve immediately with this value.
    Value(Value),
    /// Wait for this chain and adopt its outcome.
    Nested(Rc<dyn ChainLike>),
}

impl Flow {
    /// Wrap any chain-like object.
    pub fn nested(chain: impl ChainLike + 'static) -> Self {
        Self::Nested(Rc::new(chain))
    }

    /// The immediate value, if this is not a nested chain.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) => Some(v),
            Self::Nested(_) => None,
        }
    }
}

impl std::fmt::Debug for Flow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::Nested(c) => f.debug_tuple("Nested").field(&c.chain_id()).finish(),
        }
    }
}

impl From<Value> for Flow {
    fn from(v: Value) -> Self {
        Self::Value(v)
    }
}

impl From<super::Chain> for Flow {
    fn from(chain: super::Chain) -> Self {
        Self::Nested(Rc::new(chain))
    }
}

macro_rules! flow_from_value {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Flow {
                fn from(v: $t) -> Self {
                    Self::Value(Value::from(v))
                }
            }
        )*
    };
}

flow_from_value!(
    (),
    bool,
    i32,
    i64,
    u32,
    u64,
    usize,
    f64,
    &str,
    String,
    serde_json::Value,
    Vec<Value>
);

impl<T: Into<Value>> From<Option<T>> for Flow {
    fn from(v: Option<T>) -> Self {
        Self::Value(v.into())
    }
}

/// Future returned by [`super::Chain::settled`].
pub struct SettledFuture {
    slot: Rc<RefCell<Slot>>,
}

#[derive(Default)]
struct Slot {
    settled: Option<Settled>,
    waker: Option<Waker>,
}

impl SettledFuture {
    pub(crate) fn attach(chain: &dyn ChainLike) -> Self {
        let slot = Rc::new(RefCell::new(Slot::default()));
        let sink = slot.clone();
        chain.subscribe(Box::new(move |settled: &Settled| {
            let waker = {
                let mut slot = sink.borrow_mut();
                slot.settled = Some(settled.clone());
                slot.waker.take()
            };
            if let Some(waker) = waker {
                waker.wake();
            }
        }));
        Self { slot }
    }
}

impl Future for SettledFuture {
    type Output = Settled;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Settled> {
        let mut slot = self.slot.borrow_mut();
        match slot.settled.take() {
            Some(settled) => Poll::Ready(settled),
            None => {
                slot.waker = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}
