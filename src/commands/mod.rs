//! Commands module - CLI command implementations, one module per command.

pub mod jobs;
pub mod migrate;
pub mod serve;
