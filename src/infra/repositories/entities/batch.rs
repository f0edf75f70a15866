//! Batch job database entity.

use sea_orm::entity::prelude::*;

use crate::domain::Batch;
use crate::errors::AppError;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "batches")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub batch_type: String,
    pub status: String,
    pub schedule: Option<String>,
    pub retry_count: i32,
    pub timeout_seconds: i32,
    #[sea_orm(column_type = "JsonBinary")]
    pub params: Json,
    pub started_at: Option<DateTimeUtc>,
    pub finished_at: Option<DateTimeUtc>,
    pub processed_items: i32,
    pub success_count: i32,
    pub error_count: i32,
    /// Array of `{message, details}`
    #[sea_orm(column_type = "JsonBinary")]
    pub errors: Json,
    /// Array of log lines
    #[sea_orm(column_type = "JsonBinary")]
    pub logs: Json,
    pub created_by: Option<Uuid>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Batch {
    type Error = AppError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let errors = serde_json::from_value(model.errors)
            .map_err(|e| AppError::internal(format!("Corrupt batch errors column: {}", e)))?;
        let logs = serde_json::from_value(model.logs)
            .map_err(|e| AppError::internal(format!("Corrupt batch logs column: {}", e)))?;

        Ok(Batch {
            id: model.id,
            batch_type: model.batch_type.parse()?,
            status: model.status.parse()?,
            schedule: model.schedule,
            retry_count: model.retry_count,
            timeout_seconds: model.timeout_seconds,
            params: model.params,
            started_at: model.started_at,
            finished_at: model.finished_at,
            processed_items: model.processed_items,
            success_count: model.success_count,
            error_count: model.error_count,
            errors,
            logs,
            created_by: model.created_by,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
