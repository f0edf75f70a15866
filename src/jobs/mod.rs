//! Background batch jobs.
//!
//! `tasks` holds the work for each batch type, `runner` wraps it in
//! retries and timeouts, and `scheduler` starts batches whose cron
//! matches the current minute.

mod runner;
mod scheduler;
pub mod tasks;

pub use runner::BatchRunner;
pub use scheduler::Scheduler;
pub use tasks::JobEnv;
