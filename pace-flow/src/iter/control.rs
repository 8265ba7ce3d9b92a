//! Loop control and item keys.

use pace_core::Value;
use std::fmt;

/// What a loop callback wants next.
///
/// `Break` ends the loop it was returned to, and only that loop; the
/// operation resolves with the work done so far. It is never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl<T> {
    /// Keep going, with this item's result.
    Continue(T),
    /// Stop before the next item.
    Break,
}

impl<T> LoopControl<T> {
    /// Check if this is [`LoopControl::Break`].
    pub fn is_break(&self) -> bool {
        matches!(self, Self::Break)
    }

    /// Map the continued value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> LoopControl<U> {
        match self {
            Self::Continue(v) => LoopControl::Continue(f(v)),
            Self::Break => LoopControl::Break,
        }
    }

    /// The continued value, if any.
    pub fn continued(self) -> Option<T> {
        match self {
            Self::Continue(v) => Some(v),
            Self::Break => None,
        }
    }
}

impl<T> From<T> for LoopControl<T> {
    fn from(v: T) -> Self {
        Self::Continue(v)
    }
}

/// Position of an item in its source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// Array, string or counter position.
    Index(usize),
    /// Object property name.
    Name(String),
}

impl Key {
    /// The key as a value: an integer index or a string name.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Index(i) => Value::from(*i),
            Self::Name(name) => Value::string(name.clone()),
        }
    }

    /// The index, if positional.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Self::Index(i) => Some(*i),
            Self::Name(_) => None,
        }
    }

    /// The name, if a property key.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Index(_) => None,
            Self::Name(name) => Some(name),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{i}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}
