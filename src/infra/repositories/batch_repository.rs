//! Batch job records.
//!
//! The running state is claimed with a conditional update so two workers
//! cannot both move the same batch into `running`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde_json::{json, Value};
use uuid::Uuid;

use super::base::{fetch_page, into_domain, opt_into_domain, page_into_domain};
use super::entities::batch::{self, ActiveModel, Entity as BatchEntity};
use crate::domain::report::StatusCount;
use crate::domain::{Batch, BatchConfig, BatchFilter, BatchOutcome, BatchStatus};
use crate::errors::{AppError, AppResult};
use crate::types::PaginationParams;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

const FINISHED: [BatchStatus; 3] = [
    BatchStatus::Completed,
    BatchStatus::Failed,
    BatchStatus::Cancelled,
];

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait BatchRepository: Send + Sync {
    async fn create(&self, config: BatchConfig, created_by: Option<Uuid>) -> AppResult<Batch>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Batch>>;

    /// Newest first
    async fn list(
        &self,
        filter: BatchFilter,
        params: PaginationParams,
    ) -> AppResult<(Vec<Batch>, u64)>;

    async fn delete(&self, id: Uuid) -> AppResult<()>;

    async fn set_status(&self, id: Uuid, status: BatchStatus) -> AppResult<Batch>;

    /// Move the batch into `running` and reset its counters. `None` when it
    /// is already running.
    async fn mark_running(&self, id: Uuid) -> AppResult<Option<Batch>>;

    /// Store the outcome of a run. `None` when the batch left `running`
    /// in the meantime (it was cancelled).
    async fn finish(
        &self,
        id: Uuid,
        status: BatchStatus,
        outcome: BatchOutcome,
    ) -> AppResult<Option<Batch>>;

    /// Batches with a schedule that are not running
    async fn list_scheduled(&self) -> AppResult<Vec<Batch>>;

    async fn count_by_status(&self) -> AppResult<Vec<StatusCount>>;

    async fn delete_by_status(&self, status: BatchStatus) -> AppResult<u64>;

    /// Unscheduled finished batches whose last run ended before `cutoff`
    async fn delete_finished_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64>;
}

pub struct BatchStore {
    db: DatabaseConnection,
}

impl BatchStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BatchRepository for BatchStore {
    async fn create(&self, config: BatchConfig, created_by: Option<Uuid>) -> AppResult<Batch> {
        let now = Utc::now();
        let schedule = config.normalized_schedule();
        let params = if config.params.is_null() {
            json!({})
        } else {
            config.params
        };

        let active_model = ActiveModel {
            id: Set(Uuid::new_v4()),
            batch_type: Set(config.batch_type.to_string()),
            status: Set(BatchStatus::Pending.to_string()),
            schedule: Set(schedule),
            retry_count: Set(config.retry_count as i32),
            timeout_seconds: Set(config.timeout_seconds as i32),
            params: Set(params),
            started_at: Set(None),
            finished_at: Set(None),
            processed_items: Set(0),
            success_count: Set(0),
            error_count: Set(0),
            errors: Set(json!([])),
            logs: Set(json!([])),
            created_by: Set(created_by),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Batch::try_from(active_model.insert(&self.db).await?)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Batch>> {
        opt_into_domain(BatchEntity::find_by_id(id).one(&self.db).await?)
    }

    async fn list(
        &self,
        filter: BatchFilter,
        params: PaginationParams,
    ) -> AppResult<(Vec<Batch>, u64)> {
        let mut query = BatchEntity::find()
            .order_by_desc(batch::Column::CreatedAt)
            .order_by_desc(batch::Column::Id);
        if let Some(batch_type) = filter.batch_type {
            query = query.filter(batch::Column::BatchType.eq(batch_type.as_str()));
        }
        if let Some(status) = filter.status {
            query = query.filter(batch::Column::Status.eq(status.as_str()));
        }
        if let Some(start) = filter.created.start() {
            query = query.filter(batch::Column::CreatedAt.gte(start));
        }
        if let Some(end) = filter.created.end_exclusive() {
            query = query.filter(batch::Column::CreatedAt.lt(end));
        }
        page_into_domain(fetch_page(&self.db, query, &params).await?)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = BatchEntity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn set_status(&self, id: Uuid, status: BatchStatus) -> AppResult<Batch> {
        let model = BatchEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        let now = Utc::now();
        let mut active: ActiveModel = model.into();
        active.status = Set(status.to_string());
        if status.is_finished() {
            active.finished_at = Set(Some(now));
        }
        active.updated_at = Set(now);
        Batch::try_from(active.update(&self.db).await?)
    }

    async fn mark_running(&self, id: Uuid) -> AppResult<Option<Batch>> {
        let now = Utc::now();
        let result = BatchEntity::update_many()
            .col_expr(batch::Column::Status, Expr::value(BatchStatus::Running.as_str()))
            .col_expr(batch::Column::StartedAt, Expr::value(now))
            .col_expr(batch::Column::FinishedAt, Expr::value(Option::<DateTime<Utc>>::None))
            .col_expr(batch::Column::ProcessedItems, Expr::value(0))
            .col_expr(batch::Column::SuccessCount, Expr::value(0))
            .col_expr(batch::Column::ErrorCount, Expr::value(0))
            .col_expr(batch::Column::Errors, Expr::value(json!([])))
            .col_expr(batch::Column::Logs, Expr::value(json!([])))
            .col_expr(batch::Column::UpdatedAt, Expr::value(now))
            .filter(batch::Column::Id.eq(id))
            .filter(batch::Column::Status.ne(BatchStatus::Running.as_str()))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Ok(None);
        }
        self.find_by_id(id).await
    }

    async fn finish(
        &self,
        id: Uuid,
        status: BatchStatus,
        outcome: BatchOutcome,
    ) -> AppResult<Option<Batch>> {
        let now = Utc::now();
        let errors = to_json(&outcome.errors)?;
        let logs = to_json(&outcome.logs)?;

        let result = BatchEntity::update_many()
            .col_expr(batch::Column::Status, Expr::value(status.as_str()))
            .col_expr(batch::Column::FinishedAt, Expr::value(now))
            .col_expr(batch::Column::ProcessedItems, Expr::value(outcome.processed_items))
            .col_expr(batch::Column::SuccessCount, Expr::value(outcome.success_count))
            .col_expr(batch::Column::ErrorCount, Expr::value(outcome.error_count))
            .col_expr(batch::Column::Errors, Expr::value(errors))
            .col_expr(batch::Column::Logs, Expr::value(logs))
            .col_expr(batch::Column::UpdatedAt, Expr::value(now))
            .filter(batch::Column::Id.eq(id))
            .filter(batch::Column::Status.eq(BatchStatus::Running.as_str()))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Ok(None);
        }
        self.find_by_id(id).await
    }

    async fn list_scheduled(&self) -> AppResult<Vec<Batch>> {
        let models = BatchEntity::find()
            .filter(batch::Column::Schedule.is_not_null())
            .filter(batch::Column::Status.ne(BatchStatus::Running.as_str()))
            .order_by_asc(batch::Column::CreatedAt)
            .all(&self.db)
            .await?;
        into_domain(models)
    }

    async fn count_by_status(&self) -> AppResult<Vec<StatusCount>> {
        let rows: Vec<(String, i64)> = BatchEntity::find()
            .select_only()
            .column(batch::Column::Status)
            .column_as(batch::Column::Id.count(), "count")
            .group_by(batch::Column::Status)
            .order_by_asc(batch::Column::Status)
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(status, count)| StatusCount {
                status,
                count: count.max(0) as u64,
            })
            .collect())
    }

    async fn delete_by_status(&self, status: BatchStatus) -> AppResult<u64> {
        let result = BatchEntity::delete_many()
            .filter(batch::Column::Status.eq(status.as_str()))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    async fn delete_finished_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let result = BatchEntity::delete_many()
            .filter(batch::Column::Status.is_in(FINISHED.iter().map(BatchStatus::as_str)))
            .filter(batch::Column::FinishedAt.lt(cutoff))
            .filter(batch::Column::Schedule.is_null())
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> AppResult<Value> {
    serde_json::to_value(value)
        .map_err(|e| AppError::internal(format!("Batch result encoding failed: {}", e)))
}
