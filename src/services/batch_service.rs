//! Batch job records and their execution.
//!
//! A run holds the redis lock `lock:batch:{id}` for its whole duration,
//! and the database only lets one caller move a batch into `running`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::{BATCH_RETRY_DELAY_SECONDS, DEFAULT_LOCK_TTL_SECONDS, LOCK_RESOURCE_BATCH};
use crate::domain::{Batch, BatchConfig, BatchFilter, BatchLogs, BatchStatus, StatusCount};
use crate::errors::{AppError, AppResult};
use crate::infra::{Cache, LockGuard, UnitOfWork};
use crate::jobs::BatchRunner;
use crate::types::{Paginated, PaginationParams};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait BatchService: Send + Sync {
    async fn create(&self, config: BatchConfig, created_by: Uuid) -> AppResult<Batch>;

    async fn list(&self, filter: BatchFilter, params: PaginationParams)
        -> AppResult<Paginated<Batch>>;

    async fn get(&self, id: Uuid) -> AppResult<Batch>;

    async fn logs(&self, id: Uuid) -> AppResult<BatchLogs>;

    async fn delete(&self, id: Uuid) -> AppResult<()>;

    async fn cancel(&self, id: Uuid) -> AppResult<Batch>;

    /// Start a run in the background and return the batch as running
    async fn execute(&self, id: Uuid) -> AppResult<Batch>;

    /// Run to completion in the caller's task
    async fn run_now(&self, id: Uuid) -> AppResult<Batch>;

    /// Start every scheduled batch whose cron matches the minute `now`
    async fn run_due(&self, now: DateTime<Utc>) -> AppResult<usize>;

    async fn status_counts(&self) -> AppResult<Vec<StatusCount>>;

    /// Delete failed batches
    async fn clear_failed(&self) -> AppResult<u64>;
}

pub struct BatchManager<U: UnitOfWork + 'static> {
    uow: Arc<U>,
    cache: Option<Arc<Cache>>,
    runner: Arc<BatchRunner<U>>,
}

impl<U: UnitOfWork + 'static> BatchManager<U> {
    pub fn new(uow: Arc<U>, cache: Option<Arc<Cache>>, runner: BatchRunner<U>) -> Self {
        Self {
            uow,
            cache,
            runner: Arc::new(runner),
        }
    }

    /// Lock the batch and move it into `running`
    async fn claim(&self, id: Uuid) -> AppResult<(Batch, Option<LockGuard>)> {
        let batch = self.get(id).await?;
        if !batch.status.can_execute() {
            return Err(already_running());
        }

        let lock = match &self.cache {
            Some(cache) => {
                let resource = format!("{}{}", LOCK_RESOURCE_BATCH, id);
                let guard = cache
                    .try_acquire_lock(&resource, lock_ttl(&batch))
                    .await?
                    .ok_or_else(already_running)?;
                Some(guard)
            }
            None => None,
        };

        let running = self
            .uow
            .batches()
            .mark_running(id)
            .await?
            .ok_or_else(already_running)?;
        Ok((running, lock))
    }
}

fn already_running() -> AppError {
    AppError::bad_request("Batch is already running")
}

/// Long enough to cover every attempt and the pauses between them
fn lock_ttl(batch: &Batch) -> u64 {
    let attempts = batch.retry_count.max(0) as u64 + 1;
    let timeout = batch.timeout_seconds.max(0) as u64;
    timeout * attempts + BATCH_RETRY_DELAY_SECONDS * (attempts - 1) + DEFAULT_LOCK_TTL_SECONDS
}

#[async_trait]
impl<U: UnitOfWork + 'static> BatchService for BatchManager<U> {
    async fn create(&self, config: BatchConfig, created_by: Uuid) -> AppResult<Batch> {
        config.validate()?;
        let batch = self.uow.batches().create(config, Some(created_by)).await?;
        tracing::info!(batch_id = %batch.id, batch_type = %batch.batch_type, "Batch created");
        Ok(batch)
    }

    async fn list(
        &self,
        filter: BatchFilter,
        params: PaginationParams,
    ) -> AppResult<Paginated<Batch>> {
        filter.created.validate()?;
        let (rows, total) = self.uow.batches().list(filter, params).await?;
        Ok(Paginated::new(rows, &params, total))
    }

    async fn get(&self, id: Uuid) -> AppResult<Batch> {
        self.uow
            .batches()
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound)
    }

    async fn logs(&self, id: Uuid) -> AppResult<BatchLogs> {
        self.get(id).await.map(BatchLogs::from)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let batch = self.get(id).await?;
        if !batch.status.can_delete() {
            return Err(AppError::bad_request("A running batch cannot be deleted"));
        }
        self.uow.batches().delete(id).await?;
        tracing::info!(batch_id = %id, "Batch deleted");
        Ok(())
    }

    async fn cancel(&self, id: Uuid) -> AppResult<Batch> {
        let batch = self.get(id).await?;
        if !batch.status.can_cancel() {
            return Err(AppError::invalid_transition(
                batch.status,
                BatchStatus::Cancelled,
            ));
        }
        let cancelled = self
            .uow
            .batches()
            .set_status(id, BatchStatus::Cancelled)
            .await?;
        tracing::info!(batch_id = %id, "Batch cancelled");
        Ok(cancelled)
    }

    async fn execute(&self, id: Uuid) -> AppResult<Batch> {
        let (running, lock) = self.claim(id).await?;

        let runner = self.runner.clone();
        let job = running.clone();
        tokio::spawn(async move {
            let batch_id = job.id;
            if let Err(e) = runner.run(job, lock).await {
                tracing::error!(batch_id = %batch_id, error = %e, "Batch run failed");
            }
        });

        Ok(running)
    }

    async fn run_now(&self, id: Uuid) -> AppResult<Batch> {
        let (running, lock) = self.claim(id).await?;
        match self.runner.run(running, lock).await? {
            Some(finished) => Ok(finished),
            None => self.get(id).await,
        }
    }

    async fn run_due(&self, now: DateTime<Utc>) -> AppResult<usize> {
        let scheduled = self.uow.batches().list_scheduled().await?;
        let mut started = 0;

        for batch in scheduled
            .iter()
            .filter(|b| b.is_due(&now) && b.started_at.map_or(true, |s| s < now))
        {
            match self.execute(batch.id).await {
                Ok(_) => started += 1,
                Err(e) => {
                    tracing::warn!(batch_id = %batch.id, error = %e, "Scheduled batch not started")
                }
            }
        }
        Ok(started)
    }

    async fn status_counts(&self) -> AppResult<Vec<StatusCount>> {
        self.uow.batches().count_by_status().await
    }

    async fn clear_failed(&self) -> AppResult<u64> {
        let removed = self
            .uow
            .batches()
            .delete_by_status(BatchStatus::Failed)
            .await?;
        tracing::info!(removed, "Failed batches cleared");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BatchOutcome, BatchType, NotificationType};
    use crate::infra::repositories::{MockBatchRepository, MockNotificationRepository};
    use crate::jobs::JobEnv;
    use crate::services::test_support::TestUnitOfWork;
    use crate::services::{MockDeliveryService, MockReportService};
    use chrono::TimeZone;
    use serde_json::json;
    use std::time::Duration;

    fn batch(batch_type: BatchType, status: BatchStatus) -> Batch {
        let now = Utc::now();
        Batch {
            id: Uuid::new_v4(),
            batch_type,
            status,
            schedule: None,
            retry_count: 0,
            timeout_seconds: 60,
            params: json!({}),
            started_at: None,
            finished_at: None,
            processed_items: 0,
            success_count: 0,
            error_count: 0,
            errors: vec![],
            logs: vec![],
            created_by: Some(Uuid::new_v4()),
            created_at: now,
            updated_at: now,
        }
    }

    fn manager(uow: TestUnitOfWork) -> BatchManager<TestUnitOfWork> {
        let uow = uow.into_arc();
        let runner = BatchRunner::new(JobEnv {
            uow: uow.clone(),
            deliveries: Arc::new(MockDeliveryService::new()),
            reports: Arc::new(MockReportService::new()),
            low_stock_threshold: 10,
        })
        .with_retry_delay(Duration::ZERO);
        BatchManager::new(uow, None, runner)
    }

    fn repo_returning(batch: Batch) -> MockBatchRepository {
        let mut repo = MockBatchRepository::new();
        repo.expect_find_by_id()
            .returning(move |_| Ok(Some(batch.clone())));
        repo
    }

    #[tokio::test]
    async fn invalid_config_is_rejected_before_storage() {
        let mut repo = MockBatchRepository::new();
        repo.expect_create().never();

        let mut config = BatchConfig::new(BatchType::StockCheck);
        config.schedule = Some("invalid cron".into());
        let err = manager(TestUnitOfWork::new().with_batches(repo))
            .create(config, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn running_batch_cannot_be_deleted_or_started() {
        let current = batch(BatchType::DataCleanup, BatchStatus::Running);
        let id = current.id;
        let mut repo = repo_returning(current);
        repo.expect_delete().never();
        repo.expect_mark_running().never();

        let service = manager(TestUnitOfWork::new().with_batches(repo));
        assert!(matches!(
            service.delete(id).await.unwrap_err(),
            AppError::BadRequest(_)
        ));
        assert!(matches!(
            service.execute(id).await.unwrap_err(),
            AppError::BadRequest(_)
        ));
    }

    #[tokio::test]
    async fn finished_batch_cannot_be_cancelled() {
        let current = batch(BatchType::StockCheck, BatchStatus::Completed);
        let id = current.id;
        let mut repo = repo_returning(current);
        repo.expect_set_status().never();

        let err = manager(TestUnitOfWork::new().with_batches(repo))
            .cancel(id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn run_now_stores_outcome_and_notifies_creator() {
        let pending = batch(BatchType::DataCleanup, BatchStatus::Pending);
        let id = pending.id;
        let creator = pending.created_by;

        let mut repo = repo_returning(pending.clone());
        let running = Batch {
            status: BatchStatus::Running,
            started_at: Some(Utc::now()),
            ..pending
        };
        let stored = running.clone();
        repo.expect_mark_running()
            .times(1)
            .returning(move |_| Ok(Some(running.clone())));
        repo.expect_delete_finished_before().returning(|_| Ok(1));
        repo.expect_finish()
            .withf(|_, status, outcome: &BatchOutcome| {
                *status == BatchStatus::Completed && outcome.processed_items == 3
            })
            .times(1)
            .returning(move |_, status, outcome| {
                Ok(Some(Batch {
                    status,
                    finished_at: Some(Utc::now()),
                    processed_items: outcome.processed_items,
                    success_count: outcome.success_count,
                    logs: outcome.logs,
                    ..stored.clone()
                }))
            });

        let mut notifications = MockNotificationRepository::new();
        notifications.expect_delete_read_before().returning(|_| Ok(2));
        notifications
            .expect_create()
            .withf(move |n| {
                Some(n.user_id) == creator && n.notification_type == NotificationType::BatchResult
            })
            .times(1)
            .returning(|_| Err(AppError::internal("notification store offline")));

        let service = manager(
            TestUnitOfWork::new()
                .with_batches(repo)
                .with_notifications(notifications),
        );
        let finished = service.run_now(id).await.unwrap();
        assert_eq!(finished.status, BatchStatus::Completed);
        assert_eq!(finished.success_count, 3);
    }

    #[tokio::test]
    async fn run_due_only_starts_matching_idle_batches() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        let mut due = batch(BatchType::StockCheck, BatchStatus::Completed);
        due.schedule = Some("*/15 * * * *".into());
        let due_id = due.id;
        let mut not_due = batch(BatchType::StockCheck, BatchStatus::Pending);
        not_due.schedule = Some("0 0 1 1 *".into());
        let mut already_ran = batch(BatchType::StockCheck, BatchStatus::Completed);
        already_ran.schedule = Some("* * * * *".into());
        already_ran.started_at = Some(now + chrono::Duration::seconds(5));

        let mut repo = MockBatchRepository::new();
        let listed = vec![due.clone(), not_due, already_ran];
        repo.expect_list_scheduled()
            .returning(move || Ok(listed.clone()));
        repo.expect_find_by_id()
            .withf(move |id| *id == due_id)
            .returning(move |_| Ok(Some(due.clone())));
        repo.expect_mark_running()
            .withf(move |id| *id == due_id)
            .times(1)
            .returning(|_| Ok(None));

        let started = manager(TestUnitOfWork::new().with_batches(repo))
            .run_due(now)
            .await
            .unwrap();
        assert_eq!(started, 0);
    }

    #[test]
    fn lock_covers_all_attempts() {
        let mut b = batch(BatchType::StockCheck, BatchStatus::Pending);
        b.retry_count = 2;
        b.timeout_seconds = 120;
        assert_eq!(lock_ttl(&b), 360 + 10 + DEFAULT_LOCK_TTL_SECONDS);
    }
}
