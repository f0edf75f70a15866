//! CLI module - Command-line interface for the application.
//!
//! - `serve` - Start the HTTP server
//! - `migrate` - Database migrations
//! - `jobs` - Batch scheduler and batch maintenance

pub mod args;

pub use args::{Cli, Commands};
