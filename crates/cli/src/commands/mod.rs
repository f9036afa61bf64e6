//! CLI command implementations.

pub mod server;
pub mod snapshot;
