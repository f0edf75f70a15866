//! Cron scheduler for batches with a schedule.

use chrono::{DateTime, Timelike, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::SCHEDULER_TICK_SECONDS;
use crate::services::BatchService;

pub struct Scheduler {
    batches: Arc<dyn BatchService>,
    tick: Duration,
}

impl Scheduler {
    pub fn new(batches: Arc<dyn BatchService>) -> Self {
        Self {
            batches,
            tick: Duration::from_secs(SCHEDULER_TICK_SECONDS),
        }
    }

    /// Start every batch due in the minute of `now`. Returns how many
    /// were started.
    pub async fn tick(&self, now: DateTime<Utc>) -> usize {
        let minute = now.with_second(0).and_then(|t| t.with_nanosecond(0)).unwrap_or(now);
        match self.batches.run_due(minute).await {
            Ok(started) => {
                if started > 0 {
                    tracing::info!(started, at = %minute, "Scheduled batches started");
                }
                started
            }
            Err(e) => {
                tracing::error!(error = %e, "Scheduler tick failed");
                0
            }
        }
    }

    /// Tick until `shutdown` resolves
    pub async fn run(self, shutdown: impl Future<Output = ()>) {
        let mut interval = tokio::time::interval(self.tick);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        tracing::info!(tick_seconds = self.tick.as_secs(), "Scheduler started");
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick(Utc::now()).await;
                }
                _ = &mut shutdown => {
                    tracing::info!("Scheduler stopping");
                    break;
                }
            }
        }
    }
}
