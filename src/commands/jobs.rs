//! Jobs command - batch scheduler and maintenance.
//!
//! ```bash
//! # Run the cron scheduler until Ctrl+C
//! tea-logistics jobs work
//!
//! # Execute one batch and print its result
//! tea-logistics jobs run 7d1c...
//!
//! # Batch counts by status
//! tea-logistics jobs list
//!
//! # Delete failed batches
//! tea-logistics jobs clear
//! ```

use std::sync::Arc;

use uuid::Uuid;

use crate::cli::args::{JobsAction, JobsArgs};
use crate::commands::serve::shutdown_signal;
use crate::config::Config;
use crate::domain::Batch;
use crate::errors::{AppError, AppResult};
use crate::infra::{Cache, Database};
use crate::jobs::Scheduler;
use crate::services::{BatchService, ServiceContainer, Services};

/// Execute the jobs command
pub async fn execute(args: JobsArgs, config: Config) -> AppResult<()> {
    let batches = batch_service(config).await?;

    match args.action {
        JobsAction::Work => run_worker(batches).await,
        JobsAction::Run { id } => run_batch(batches, id).await,
        JobsAction::List => list_batches(batches).await,
        JobsAction::Clear => clear_failed(batches).await,
    }
}

/// Batch service over the database. Redis is optional here: without it
/// batch runs are not locked across processes.
async fn batch_service(config: Config) -> AppResult<Arc<dyn BatchService>> {
    tracing::info!("Connecting to database...");
    let db = Database::connect(&config)
        .await
        .map_err(|e| AppError::internal(format!("Database connection failed: {}", e)))?;

    let cache = match Cache::connect(&config).await {
        Ok(cache) => Some(Arc::new(cache)),
        Err(e) => {
            tracing::warn!(error = %e, "Redis unavailable, running batches without locks");
            None
        }
    };

    let services = Services::from_connection(db.get_connection(), cache, config);
    Ok(services.batches())
}

async fn run_worker(batches: Arc<dyn BatchService>) -> AppResult<()> {
    tracing::info!("Batch scheduler started. Press Ctrl+C to stop.");
    Scheduler::new(batches).run(shutdown_signal()).await;
    tracing::info!("Batch scheduler stopped.");
    Ok(())
}

async fn run_batch(batches: Arc<dyn BatchService>, id: Uuid) -> AppResult<()> {
    let batch = batches.run_now(id).await?;
    print_summary(&batch);
    Ok(())
}

fn print_summary(batch: &Batch) {
    println!("\n=== Batch {} ===", batch.id);
    println!("Type:      {}", batch.batch_type);
    println!("Status:    {}", batch.status);
    println!("Processed: {}", batch.processed_items);
    println!("Succeeded: {}", batch.success_count);
    println!("Failed:    {}", batch.error_count);
    if let Some(seconds) = batch.duration_seconds() {
        println!("Duration:  {}s", seconds);
    }
    for line in &batch.logs {
        println!("  {}", line);
    }
    for error in &batch.errors {
        match &error.details {
            Some(details) => println!("  ! {} ({})", error.message, details),
            None => println!("  ! {}", error.message),
        }
    }
    println!();
}

async fn list_batches(batches: Arc<dyn BatchService>) -> AppResult<()> {
    let counts = batches.status_counts().await?;

    println!("\n=== Batch Status ===");
    if counts.is_empty() {
        println!("No batches.");
    }
    for entry in counts {
        println!("{:<10} {}", format!("{}:", entry.status), entry.count);
    }
    println!("====================\n");

    Ok(())
}

async fn clear_failed(batches: Arc<dyn BatchService>) -> AppResult<()> {
    let removed = batches.clear_failed().await?;
    println!("Cleared {} failed batch(es).", removed);
    Ok(())
}
