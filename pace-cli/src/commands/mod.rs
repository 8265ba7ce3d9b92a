//! CLI command implementations.

pub mod bench;
pub mod speeds;
pub mod version;
