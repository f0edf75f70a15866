//! CLI argument definitions.

use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::config::{DEFAULT_SERVER_HOST, DEFAULT_SERVER_PORT};

/// Tea Logistics - back office API and batch worker
#[derive(Parser, Debug)]
#[command(name = "tea-logistics")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server
    Serve(ServeArgs),

    /// Run database migrations
    Migrate(MigrateArgs),

    /// Run and inspect batch jobs
    Jobs(JobsArgs),
}

#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Host to bind to
    #[arg(short = 'H', long, default_value = DEFAULT_SERVER_HOST, env = "SERVER_HOST")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_SERVER_PORT, env = "SERVER_PORT")]
    pub port: u16,
}

#[derive(Parser, Debug)]
pub struct MigrateArgs {
    #[command(subcommand)]
    pub action: MigrateAction,
}

#[derive(Subcommand, Debug)]
pub enum MigrateAction {
    /// Run pending migrations
    Up,
    /// Rollback last migration
    Down,
    /// Show migration status
    Status,
    /// Reset and re-run all migrations
    Fresh,
}

#[derive(Parser, Debug)]
pub struct JobsArgs {
    #[command(subcommand)]
    pub action: JobsAction,
}

#[derive(Subcommand, Debug)]
pub enum JobsAction {
    /// Run the scheduler, executing batches whose cron matches each minute
    Work,
    /// Execute one batch now and wait for it to finish
    Run {
        /// Batch ID
        id: Uuid,
    },
    /// Show batch counts by status
    List,
    /// Delete failed batches
    Clear,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_defaults_to_port_8080() {
        let cli = Cli::try_parse_from(["tea-logistics", "serve"]).unwrap();
        match cli.command {
            Commands::Serve(args) => assert_eq!(args.port, DEFAULT_SERVER_PORT),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn jobs_run_takes_a_batch_id() {
        let id = Uuid::new_v4();
        let cli = Cli::try_parse_from(["tea-logistics", "-v", "jobs", "run", &id.to_string()])
            .unwrap();
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::Jobs(JobsArgs { action: JobsAction::Run { id: parsed } }) if parsed == id
        ));
    }

    #[test]
    fn jobs_run_rejects_a_malformed_id() {
        assert!(Cli::try_parse_from(["tea-logistics", "jobs", "run", "batch-7"]).is_err());
    }
}
