//! Prelude for convenient imports.
//!
//! Free functions stay under their modules (`iter::map`,
//! `combinators::wait`) since their names are common.

pub use crate::combinators::{Step, Task, Tasks, parallel, sequence};
pub use crate::iter::{Key, LoopControl, RangeSpec, Repeat, Shape, Source, Stepper};
