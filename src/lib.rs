//! Tea Logistics - back office for a tea trading business.
//!
//! Products, stock per location, outbound deliveries, inbound receivings,
//! per-user notifications, scheduled batch jobs and reports, served as a
//! REST API with JWT authentication.
//!
//! # Layers
//!
//! - **cli** / **commands**: `serve`, `migrate` and `jobs` subcommands
//! - **config**: environment configuration and constants
//! - **domain**: entities, status machines and pure business rules
//! - **services**: use cases over the unit of work
//! - **infra**: PostgreSQL repositories, migrations and the redis cache
//! - **jobs**: batch tasks, retrying runner and cron scheduler
//! - **api**: axum handlers, middleware, routes and OpenAPI
//! - **types**: pagination and response wrappers
//! - **errors**: the single `AppError` type
//!
//! # CLI Usage
//!
//! ```bash
//! tea-logistics migrate up
//! tea-logistics serve --port 8080
//! tea-logistics jobs work
//! ```

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod infra;
pub mod jobs;
pub mod services;
pub mod types;

// Re-export commonly used types at crate root
pub use api::AppState;
pub use config::Config;
pub use domain::{Password, User, UserRole};
pub use errors::{AppError, AppResult};
pub use infra::Cache;
