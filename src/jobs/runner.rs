//! Runs one batch to completion.
//!
//! Each attempt is bounded by the batch timeout. A batch gets
//! `retry_count + 1` attempts; the first that succeeds wins, otherwise the
//! batch fails with one error per attempt.

use std::future::Future;
use std::time::{Duration, Instant};

use crate::config::{BATCH_RETRY_DELAY_SECONDS, SECONDS_PER_BATCH_RETRY};
use crate::domain::{Batch, BatchOutcome, JobError, NewNotification};
use crate::errors::AppResult;
use crate::infra::{LockGuard, UnitOfWork};

use super::tasks::JobEnv;

pub struct BatchRunner<U: UnitOfWork> {
    env: JobEnv<U>,
    retry_delay: Duration,
}

impl<U: UnitOfWork> BatchRunner<U> {
    pub fn new(env: JobEnv<U>) -> Self {
        Self {
            env,
            retry_delay: Duration::from_secs(BATCH_RETRY_DELAY_SECONDS),
        }
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Run a batch already marked running and store its outcome.
    ///
    /// Returns the finished batch, or `None` when it was cancelled while
    /// the job ran.
    pub async fn run(&self, batch: Batch, lock: Option<LockGuard>) -> AppResult<Option<Batch>> {
        let started = Instant::now();
        let attempts = batch.retry_count.max(0) as u32 + 1;
        let timeout = Duration::from_secs(batch.timeout_seconds.max(1) as u64);

        tracing::info!(
            batch_id = %batch.id,
            batch_type = %batch.batch_type,
            attempts,
            "Batch started"
        );

        let held = lock.as_ref();
        let current = &batch;
        let outcome = run_attempts(attempts, timeout, self.retry_delay, move |attempt| {
            async move {
                if attempt > 1 {
                    extend_lock(held, timeout).await;
                    tracing::warn!(batch_id = %current.id, attempt, "Retrying batch");
                }
                self.env.run(current).await
            }
        })
        .await;

        let status = outcome.final_status();
        tracing::info!(
            batch_id = %batch.id,
            status = %status,
            processed = outcome.processed_items,
            succeeded = outcome.success_count,
            failed = outcome.error_count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Batch finished"
        );

        let finished = self.env.uow.batches().finish(batch.id, status, outcome).await;
        if let Some(lock) = lock {
            if let Err(e) = lock.release().await {
                tracing::warn!(batch_id = %batch.id, error = %e, "Failed to release batch lock");
            }
        }

        let Some(finished) = finished? else {
            tracing::warn!(batch_id = %batch.id, "Batch left running state before it finished");
            return Ok(None);
        };

        if let Some(creator) = finished.created_by {
            let notification = NewNotification::batch_result(creator, &finished);
            if let Err(e) = self.env.uow.notifications().create(notification).await {
                tracing::warn!(batch_id = %finished.id, error = %e, "Failed to send batch result");
            }
        }
        Ok(Some(finished))
    }
}

async fn extend_lock(lock: Option<&LockGuard>, timeout: Duration) {
    let Some(lock) = lock else {
        return;
    };
    let ttl = timeout.as_secs() + u64::from(SECONDS_PER_BATCH_RETRY);
    match lock.extend(ttl).await {
        Ok(true) => {}
        Ok(false) => tracing::warn!("Batch lock expired before the retry"),
        Err(e) => tracing::warn!(error = %e, "Failed to extend batch lock"),
    }
}

/// Try `attempt` up to `attempts` times, each bounded by `timeout`
pub(crate) async fn run_attempts<F, Fut>(
    attempts: u32,
    timeout: Duration,
    delay: Duration,
    mut attempt: F,
) -> BatchOutcome
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = AppResult<BatchOutcome>>,
{
    let mut failures = BatchOutcome::default();

    for n in 1..=attempts.max(1) {
        if n > 1 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let reason = match tokio::time::timeout(timeout, attempt(n)).await {
            Ok(Ok(outcome)) => return outcome,
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("timed out after {}s", timeout.as_secs()),
        };
        failures.log(format!("Attempt {} failed: {}", n, reason));
        failures.error_count += 1;
        failures
            .errors
            .push(JobError::with_details(format!("Attempt {} failed", n), reason));
    }
    failures
}
