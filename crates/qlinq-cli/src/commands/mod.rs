//! CLI command implementations.

pub mod backends;
pub mod common;
pub mod expval;
pub mod simulate;
pub mod version;
