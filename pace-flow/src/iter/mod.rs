//! Iteration over arrays, objects, strings, counts and iterators.
//!
//! Two families share one vocabulary:
//!
//! - free functions ([`for_each`], [`map`], ...) run to completion at once;
//! - [`Stepper`] runs the same operations on a chain, yielding between
//!   chunks and flattening nested chains returned by callbacks.
//!
//! Callbacks stop a loop early with [`LoopControl::Break`].

mod control;
mod immediate;
mod range;
mod source;
mod stepper;

pub use control::{Key, LoopControl};
pub use immediate::{
    every, filter, for_each, for_ever, iterate, map, range, reduce, repeat, some, zip, zip_with,
};
pub use range::{RangeIter, RangeSpec, Repeat};
pub use source::{Shape, Source};
pub use stepper::Stepper;
