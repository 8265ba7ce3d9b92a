//! Combinators that build chains out of other chains and tasks.

mod parallel;
mod sequence;
mod shortcuts;

pub use parallel::{Task, Tasks, parallel};
pub use sequence::{Step, sequence};
pub use shortcuts::{fail, later, succeed, wait};
