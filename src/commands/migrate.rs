//! Migrate command - schema migrations for the logistics tables.

use sea_orm::DbErr;

use crate::cli::args::{MigrateAction, MigrateArgs};
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::infra::Database;

/// Execute the migrate command
pub async fn execute(args: MigrateArgs, config: Config) -> AppResult<()> {
    // Migrations are applied explicitly below, not on connect
    let db = Database::connect_without_migrations(&config)
        .await
        .map_err(|e| migration_error("connect", e))?;

    match args.action {
        MigrateAction::Up => {
            tracing::info!("Applying pending migrations...");
            db.run_migrations()
                .await
                .map_err(|e| migration_error("up", e))?;
            tracing::info!("Schema is up to date");
        }
        MigrateAction::Down => {
            tracing::info!("Rolling back last migration...");
            db.rollback_migration()
                .await
                .map_err(|e| migration_error("down", e))?;
            tracing::info!("Rollback completed");
        }
        MigrateAction::Status => {
            let status = db
                .migration_status()
                .await
                .map_err(|e| migration_error("status", e))?;
            let pending = status.iter().filter(|(_, applied)| !applied).count();

            for (name, applied) in &status {
                println!("[{}] {}", if *applied { "x" } else { " " }, name);
            }
            println!("{} migration(s), {} pending", status.len(), pending);
        }
        MigrateAction::Fresh => {
            tracing::warn!("Dropping all tables and re-running every migration");
            db.fresh_migrations()
                .await
                .map_err(|e| migration_error("fresh", e))?;
            tracing::info!("Fresh schema created");
        }
    }

    Ok(())
}

fn migration_error(step: &str, e: DbErr) -> AppError {
    AppError::internal(format!("Migration {} failed: {}", step, e))
}
