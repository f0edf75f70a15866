//! Batch job records, their configuration rules and run outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use super::schedule::CronSchedule;
use crate::config::{
    DEFAULT_BATCH_RETRY_COUNT, DEFAULT_BATCH_TIMEOUT_SECONDS, MAX_BATCH_RETRY_COUNT,
    MAX_BATCH_TIMEOUT_SECONDS, MIN_BATCH_TIMEOUT_SECONDS, SECONDS_PER_BATCH_RETRY,
};
use crate::errors::{AppError, AppResult};
use crate::types::DateRange;

string_enum! {
    pub enum BatchType {
        StockCheck => "stock_check",
        DeliveryStatusUpdate => "delivery_status_update",
        DataCleanup => "data_cleanup",
        ReportGeneration => "report_generation",
    }
}

string_enum! {
    pub enum BatchStatus {
        Pending => "pending",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

impl BatchStatus {
    /// Anything but a run in progress may be (re)started
    pub fn can_execute(self) -> bool {
        self != BatchStatus::Running
    }

    pub fn can_cancel(self) -> bool {
        matches!(self, BatchStatus::Pending | BatchStatus::Running)
    }

    pub fn can_delete(self) -> bool {
        self != BatchStatus::Running
    }

    pub fn is_finished(self) -> bool {
        matches!(
            self,
            BatchStatus::Completed | BatchStatus::Failed | BatchStatus::Cancelled
        )
    }
}

/// One problem a job hit while processing an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct JobError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub details: Option<String>,
}

impl JobError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: Some(details.into()),
        }
    }
}

/// What a job run produced
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub processed_items: i32,
    pub success_count: i32,
    pub error_count: i32,
    pub errors: Vec<JobError>,
    pub logs: Vec<String>,
}

impl BatchOutcome {
    pub fn log(&mut self, line: impl Into<String>) {
        self.logs.push(line.into());
    }

    pub fn succeeded(&mut self) {
        self.processed_items += 1;
        self.success_count += 1;
    }

    /// Count `n` items that went through in one bulk step
    pub fn succeeded_many(&mut self, n: u64) {
        let n = i32::try_from(n).unwrap_or(i32::MAX);
        self.processed_items = self.processed_items.saturating_add(n);
        self.success_count = self.success_count.saturating_add(n);
    }

    pub fn failed(&mut self, error: JobError) {
        self.processed_items += 1;
        self.error_count += 1;
        self.errors.push(error);
    }

    /// Completed unless every processed item failed
    pub fn final_status(&self) -> BatchStatus {
        if self.error_count > 0 && self.success_count == 0 {
            BatchStatus::Failed
        } else {
            BatchStatus::Completed
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Batch {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub batch_type: BatchType,
    pub status: BatchStatus,
    #[schema(example = "*/30 * * * *")]
    pub schedule: Option<String>,
    pub retry_count: i32,
    pub timeout_seconds: i32,
    #[schema(value_type = Object)]
    pub params: Value,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub processed_items: i32,
    pub success_count: i32,
    pub error_count: i32,
    pub errors: Vec<JobError>,
    pub logs: Vec<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Batch {
    /// Wall-clock duration of the last finished run
    pub fn duration_seconds(&self) -> Option<i64> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => Some((end - start).num_seconds()),
            _ => None,
        }
    }

    pub fn cron(&self) -> Option<CronSchedule> {
        self.schedule
            .as_deref()
            .and_then(|s| CronSchedule::parse(s).ok())
    }

    /// Scheduled, idle and its cron matches the minute of `now`
    pub fn is_due(&self, now: &DateTime<Utc>) -> bool {
        self.status.can_execute()
            && self.status != BatchStatus::Cancelled
            && self.cron().is_some_and(|c| c.matches(now))
    }

    pub fn param_i64(&self, key: &str) -> Option<i64> {
        self.params.get(key).and_then(Value::as_i64)
    }
}

/// Log view of a batch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct BatchLogs {
    pub id: Uuid,
    pub status: BatchStatus,
    pub logs: Vec<String>,
    pub errors: Vec<JobError>,
    pub duration_seconds: Option<i64>,
}

impl From<Batch> for BatchLogs {
    fn from(batch: Batch) -> Self {
        Self {
            id: batch.id,
            status: batch.status,
            duration_seconds: batch.duration_seconds(),
            logs: batch.logs,
            errors: batch.errors,
        }
    }
}

/// Request to create a batch
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, ToSchema)]
pub struct BatchConfig {
    #[serde(rename = "type")]
    pub batch_type: BatchType,
    #[serde(default)]
    pub schedule: Option<String>,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u32,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub params: Value,
}

fn default_retry_count() -> u32 {
    DEFAULT_BATCH_RETRY_COUNT
}

fn default_timeout() -> u32 {
    DEFAULT_BATCH_TIMEOUT_SECONDS
}

/// A config rule that failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigViolation {
    pub field: &'static str,
    pub message: String,
}

impl BatchConfig {
    pub fn new(batch_type: BatchType) -> Self {
        Self {
            batch_type,
            schedule: None,
            retry_count: DEFAULT_BATCH_RETRY_COUNT,
            timeout_seconds: DEFAULT_BATCH_TIMEOUT_SECONDS,
            params: Value::Null,
        }
    }

    /// Every rule this config breaks
    pub fn violations(&self) -> Vec<ConfigViolation> {
        let mut out = Vec::new();

        if let Some(schedule) = self.schedule.as_deref().filter(|s| !s.trim().is_empty()) {
            if let Err(e) = CronSchedule::parse(schedule) {
                out.push(ConfigViolation {
                    field: "schedule",
                    message: format!("Invalid cron expression: {}", e),
                });
            }
        }

        if self.retry_count > MAX_BATCH_RETRY_COUNT {
            out.push(ConfigViolation {
                field: "retry_count",
                message: format!("Retry count must be between 0 and {}", MAX_BATCH_RETRY_COUNT),
            });
        }

        if !(MIN_BATCH_TIMEOUT_SECONDS..=MAX_BATCH_TIMEOUT_SECONDS).contains(&self.timeout_seconds)
        {
            out.push(ConfigViolation {
                field: "timeout_seconds",
                message: format!(
                    "Timeout must be between {} and {} seconds",
                    MIN_BATCH_TIMEOUT_SECONDS, MAX_BATCH_TIMEOUT_SECONDS
                ),
            });
        }

        let needed = self.retry_count.saturating_mul(SECONDS_PER_BATCH_RETRY);
        if self.timeout_seconds < needed {
            out.push(ConfigViolation {
                field: "timeout_seconds",
                message: format!(
                    "Timeout must be at least {} seconds for {} retries",
                    needed, self.retry_count
                ),
            });
        }

        if !(self.params.is_null() || self.params.is_object()) {
            out.push(ConfigViolation {
                field: "params",
                message: "Params must be a JSON object".into(),
            });
        }

        out
    }

    pub fn validate(&self) -> AppResult<()> {
        let violations = self.violations();
        if violations.is_empty() {
            return Ok(());
        }
        let message = violations
            .iter()
            .map(|v| format!("{}: {}", v.field, v.message))
            .collect::<Vec<_>>()
            .join("; ");
        Err(AppError::validation(message))
    }

    /// Blank schedules are stored as unscheduled
    pub fn normalized_schedule(&self) -> Option<String> {
        self.schedule
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchFilter {
    pub batch_type: Option<BatchType>,
    pub status: Option<BatchStatus>,
    /// Range over the creation date
    pub created: DateRange,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = BatchConfig::new(BatchType::StockCheck);
        assert_eq!(config.retry_count, 3);
        assert_eq!(config.timeout_seconds, 300);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn schedule_must_be_valid_cron() {
        let mut config = BatchConfig::new(BatchType::DataCleanup);
        config.schedule = Some("*/30 * * * *".into());
        assert!(config.validate().is_ok());

        config.schedule = Some("invalid cron".into());
        let violations = config.violations();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "schedule");
    }

    #[test]
    fn retry_and_timeout_bounds() {
        let mut config = BatchConfig::new(BatchType::StockCheck);
        config.retry_count = 11;
        config.timeout_seconds = 3600;
        assert!(config.violations().iter().any(|v| v.field == "retry_count"));

        let mut config = BatchConfig::new(BatchType::StockCheck);
        config.retry_count = 0;
        config.timeout_seconds = 59;
        assert!(config.validate().is_err());

        config.timeout_seconds = 3601;
        assert!(config.validate().is_err());
    }

    #[test]
    fn timeout_must_cover_retries() {
        let mut config = BatchConfig::new(BatchType::ReportGeneration);
        config.retry_count = 5;
        config.timeout_seconds = 240;
        let violations = config.violations();
        assert!(violations
            .iter()
            .any(|v| v.field == "timeout_seconds" && v.message.contains("300")));

        config.timeout_seconds = 300;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: BatchConfig = serde_json::from_str(r#"{"type":"data_cleanup"}"#).unwrap();
        assert_eq!(config.batch_type, BatchType::DataCleanup);
        assert_eq!(config.retry_count, 3);
        assert_eq!(config.timeout_seconds, 300);
        assert!(config.params.is_null());
    }

    #[test]
    fn outcome_status() {
        let mut outcome = BatchOutcome::default();
        assert_eq!(outcome.final_status(), BatchStatus::Completed);

        outcome.failed(JobError::new("boom"));
        assert_eq!(outcome.final_status(), BatchStatus::Failed);

        outcome.succeeded();
        assert_eq!(outcome.final_status(), BatchStatus::Completed);
        assert_eq!(outcome.processed_items, 2);

        outcome.succeeded_many(3);
        assert_eq!(outcome.processed_items, 5);
        assert_eq!(outcome.success_count, 4);
    }

    #[test]
    fn status_guards() {
        assert!(!BatchStatus::Running.can_execute());
        assert!(BatchStatus::Failed.can_execute());
        assert!(BatchStatus::Running.can_cancel());
        assert!(!BatchStatus::Completed.can_cancel());
        assert!(!BatchStatus::Running.can_delete());
    }
}
