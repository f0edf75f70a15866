//! The work behind each batch type.
//!
//! A task returns `Err` only when it could not run at all; problems with
//! individual items are collected into the outcome instead.

use chrono::{Duration, Utc};
use futures::stream::{self, StreamExt};
use std::sync::Arc;

use crate::config::{DEFAULT_OVERDUE_DAYS, DEFAULT_RETENTION_DAYS};
use crate::domain::{
    Batch, BatchOutcome, BatchType, DeliveryStatus, JobError, NewNotification, ReportPeriod,
    UserRole,
};
use crate::errors::AppResult;
use crate::infra::UnitOfWork;
use crate::services::{parallel, DeliveryService, ReportService};
use crate::types::DateRange;

/// Low-stock alerts in flight at once
const ALERT_CONCURRENCY: usize = 4;

/// Everything a job needs to run
pub struct JobEnv<U: UnitOfWork> {
    pub uow: Arc<U>,
    pub deliveries: Arc<dyn DeliveryService>,
    pub reports: Arc<dyn ReportService>,
    pub low_stock_threshold: i32,
}

impl<U: UnitOfWork> Clone for JobEnv<U> {
    fn clone(&self) -> Self {
        Self {
            uow: self.uow.clone(),
            deliveries: self.deliveries.clone(),
            reports: self.reports.clone(),
            low_stock_threshold: self.low_stock_threshold,
        }
    }
}

impl<U: UnitOfWork> JobEnv<U> {
    pub async fn run(&self, batch: &Batch) -> AppResult<BatchOutcome> {
        match batch.batch_type {
            BatchType::StockCheck => self.stock_check(batch).await,
            BatchType::DeliveryStatusUpdate => self.delivery_status_update(batch).await,
            BatchType::DataCleanup => self.data_cleanup(batch).await,
            BatchType::ReportGeneration => self.report_generation().await,
        }
    }

    async fn stock_check(&self, batch: &Batch) -> AppResult<BatchOutcome> {
        let threshold = batch
            .param_i64("threshold")
            .and_then(|t| i32::try_from(t).ok())
            .filter(|t| *t >= 0)
            .unwrap_or(self.low_stock_threshold);

        let mut outcome = BatchOutcome::default();
        let low = self.uow.inventory().below_threshold(threshold).await?;
        outcome.succeeded_many(low.len() as u64);
        outcome.log(format!("{} item(s) below {} units", low.len(), threshold));
        if low.is_empty() {
            return Ok(outcome);
        }

        let recipients = self
            .uow
            .users()
            .find_by_roles(vec![UserRole::Admin, UserRole::Manager])
            .await?;
        let notifications = self.uow.notifications();
        let sent: Vec<_> = stream::iter(&recipients)
            .map(|user| {
                let notifications = notifications.clone();
                let alert = NewNotification::low_stock(user.id, &low, threshold);
                async move { (user, notifications.create(alert).await) }
            })
            .buffer_unordered(ALERT_CONCURRENCY)
            .boxed()
            .collect()
            .await;
        for (user, result) in sent {
            if let Err(e) = result {
                outcome.failed(JobError::with_details(
                    format!("Could not notify {}", user.email),
                    e.to_string(),
                ));
            }
        }
        outcome.log(format!("Alerted {} user(s)", recipients.len()));
        Ok(outcome)
    }

    async fn delivery_status_update(&self, batch: &Batch) -> AppResult<BatchOutcome> {
        let grace_days = batch
            .param_i64("overdue_days")
            .filter(|d| *d >= 0)
            .unwrap_or(DEFAULT_OVERDUE_DAYS);
        let today = Utc::now().date_naive();
        let mut outcome = BatchOutcome::default();

        let (scheduled, in_transit) = parallel::join2(
            self.uow.deliveries().list_by_status(DeliveryStatus::Scheduled),
            self.uow.deliveries().list_by_status(DeliveryStatus::InTransit),
        )
        .await?;

        for delivery in scheduled.iter().filter(|d| d.is_due_for_dispatch(today)) {
            match self
                .deliveries
                .update_status(delivery.id, DeliveryStatus::InTransit, None)
                .await
            {
                Ok(_) => {
                    outcome.succeeded();
                    outcome.log(format!("Dispatched {}", delivery.order_number));
                }
                Err(e) => outcome.failed(JobError::with_details(
                    format!("Could not dispatch {}", delivery.order_number),
                    e.to_string(),
                )),
            }
        }

        for delivery in in_transit.iter().filter(|d| d.is_overdue(today, grace_days)) {
            let estimated = delivery
                .estimated_delivery_date
                .map(|d| d.to_string())
                .unwrap_or_default();
            outcome.failed(JobError::with_details(
                format!("Delivery {} is overdue", delivery.order_number),
                format!("estimated {}", estimated),
            ));
        }

        outcome.log(format!(
            "{} dispatched, {} overdue",
            outcome.success_count,
            outcome.errors.len()
        ));
        Ok(outcome)
    }

    async fn data_cleanup(&self, batch: &Batch) -> AppResult<BatchOutcome> {
        let days = batch
            .param_i64("retention_days")
            .filter(|d| *d >= 0)
            .unwrap_or(DEFAULT_RETENTION_DAYS);
        let cutoff = Utc::now() - Duration::days(days);

        let (notifications, batches) = parallel::join2(
            self.uow.notifications().delete_read_before(cutoff),
            self.uow.batches().delete_finished_before(cutoff),
        )
        .await?;

        let mut outcome = BatchOutcome::default();
        outcome.succeeded_many(notifications + batches);
        outcome.log(format!(
            "Removed {} read notification(s) and {} finished batch(es) older than {} day(s)",
            notifications, batches, days
        ));
        Ok(outcome)
    }

    async fn report_generation(&self) -> AppResult<BatchOutcome> {
        let report = self
            .reports
            .generate(ReportPeriod::Monthly, DateRange::default())
            .await?;

        let total_sales: f64 = report.sales_report.iter().map(|s| s.total_sales).sum();
        let orders: i64 = report.sales_report.iter().map(|s| s.order_count).sum();
        let delivered: i64 = report.delivery_report.iter().map(|d| d.delivered).sum();
        let on_time: i64 = report.delivery_report.iter().map(|d| d.on_time).sum();

        let mut outcome = BatchOutcome::default();
        outcome.succeeded();
        outcome.log(format!(
            "Monthly report {} to {}",
            report.start_date, report.end_date
        ));
        outcome.log(format!("Sales: {:.2} over {} order(s)", total_sales, orders));
        outcome.log(format!(
            "Stock: {} on hand, {} item(s) low",
            report.inventory_report.total_stock, report.inventory_report.low_stock_count
        ));
        outcome.log(format!("Deliveries: {} delivered, {} on time", delivered, on_time));
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BatchStatus, InventoryReport, ReportResponse, SalesReportItem};
    use crate::errors::AppError;
    use crate::infra::repositories::{
        MockBatchRepository, MockDeliveryRepository, MockInventoryRepository,
        MockNotificationRepository, MockUserRepository,
    };
    use crate::services::test_support::{delivery, inventory, user, TestUnitOfWork};
    use crate::services::{MockDeliveryService, MockReportService};
    use chrono::NaiveDate;
    use serde_json::json;
    use uuid::Uuid;

    fn batch(batch_type: BatchType, params: serde_json::Value) -> Batch {
        let now = Utc::now();
        Batch {
            id: Uuid::new_v4(),
            batch_type,
            status: BatchStatus::Running,
            schedule: None,
            retry_count: 0,
            timeout_seconds: 60,
            params,
            started_at: Some(now),
            finished_at: None,
            processed_items: 0,
            success_count: 0,
            error_count: 0,
            errors: vec![],
            logs: vec![],
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn env(uow: TestUnitOfWork) -> JobEnv<TestUnitOfWork> {
        JobEnv {
            uow: uow.into_arc(),
            deliveries: Arc::new(MockDeliveryService::new()),
            reports: Arc::new(MockReportService::new()),
            low_stock_threshold: 10,
        }
    }

    #[tokio::test]
    async fn stock_check_uses_param_threshold_and_alerts_managers() {
        let mut inventory_repo = MockInventoryRepository::new();
        inventory_repo
            .expect_below_threshold()
            .withf(|t| *t == 25)
            .returning(|_| Ok(vec![inventory(Uuid::new_v4(), "WH-A", 3)]));
        let mut users = MockUserRepository::new();
        users.expect_find_by_roles().returning(|_| {
            Ok(vec![user(UserRole::Admin), user(UserRole::Manager)])
        });
        let mut notifications = MockNotificationRepository::new();
        notifications.expect_create().times(2).returning(|_| {
            Err(AppError::internal("unused"))
        });

        let env = env(TestUnitOfWork::new()
            .with_inventory(inventory_repo)
            .with_users(users)
            .with_notifications(notifications));
        let outcome = env
            .run(&batch(BatchType::StockCheck, json!({"threshold": 25})))
            .await
            .unwrap();
        assert_eq!(outcome.success_count, 1);
        assert_eq!(outcome.error_count, 2);
    }

    #[tokio::test]
    async fn stock_check_without_low_items_sends_nothing() {
        let mut inventory_repo = MockInventoryRepository::new();
        inventory_repo
            .expect_below_threshold()
            .withf(|t| *t == 10)
            .returning(|_| Ok(vec![]));

        let env = env(TestUnitOfWork::new().with_inventory(inventory_repo));
        let outcome = env
            .run(&batch(BatchType::StockCheck, json!({})))
            .await
            .unwrap();
        assert_eq!(outcome.processed_items, 0);
        assert_eq!(outcome.final_status(), BatchStatus::Completed);
    }

    #[tokio::test]
    async fn overdue_deliveries_are_reported_as_errors() {
        let today = Utc::now().date_naive();
        let mut repo = MockDeliveryRepository::new();
        repo.expect_list_by_status().returning(move |status| {
            let mut late = delivery(status);
            late.estimated_delivery_date = Some(today - Duration::days(5));
            let mut fresh = delivery(status);
            fresh.estimated_delivery_date = Some(today);
            match status {
                DeliveryStatus::InTransit => Ok(vec![late, fresh]),
                _ => Ok(vec![]),
            }
        });

        let env = env(TestUnitOfWork::new().with_deliveries(repo));
        let outcome = env
            .run(&batch(BatchType::DeliveryStatusUpdate, json!({"overdue_days": 2})))
            .await
            .unwrap();
        assert_eq!(outcome.error_count, 1);
        assert!(outcome.errors[0].message.contains("overdue"));
    }

    #[tokio::test]
    async fn due_scheduled_deliveries_are_dispatched() {
        let today = Utc::now().date_naive();
        let mut repo = MockDeliveryRepository::new();
        repo.expect_list_by_status().returning(move |status| {
            let mut due = delivery(status);
            due.estimated_delivery_date = Some(today);
            let mut later = delivery(status);
            later.estimated_delivery_date = Some(today + Duration::days(3));
            match status {
                DeliveryStatus::Scheduled => Ok(vec![due, later]),
                _ => Ok(vec![]),
            }
        });
        let mut service = MockDeliveryService::new();
        service
            .expect_update_status()
            .withf(|_, s, actor| *s == DeliveryStatus::InTransit && actor.is_none())
            .times(1)
            .returning(|_, s, _| Ok(delivery(s)));

        let env = JobEnv {
            deliveries: Arc::new(service),
            ..env(TestUnitOfWork::new().with_deliveries(repo))
        };
        let outcome = env
            .run(&batch(BatchType::DeliveryStatusUpdate, json!({})))
            .await
            .unwrap();
        assert_eq!(outcome.success_count, 1);
        assert_eq!(outcome.error_count, 0);
    }

    #[tokio::test]
    async fn cleanup_counts_removed_rows() {
        let mut notifications = MockNotificationRepository::new();
        notifications
            .expect_delete_read_before()
            .withf(|cutoff| (Utc::now() - *cutoff).num_days() == 7)
            .returning(|_| Ok(4));
        let mut batches = MockBatchRepository::new();
        batches.expect_delete_finished_before().returning(|_| Ok(2));

        let env = env(TestUnitOfWork::new()
            .with_notifications(notifications)
            .with_batches(batches));
        let outcome = env
            .run(&batch(BatchType::DataCleanup, json!({"retention_days": 7})))
            .await
            .unwrap();
        assert_eq!(outcome.processed_items, 6);
        assert!(outcome.logs[0].contains("4 read notification(s)"));
    }

    #[tokio::test]
    async fn report_summary_lands_in_logs() {
        let mut reports = MockReportService::new();
        reports
            .expect_generate()
            .withf(|p, _| *p == ReportPeriod::Monthly)
            .returning(|period, _| {
                Ok(ReportResponse {
                    period_type: period,
                    start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                    end_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
                    sales_report: vec![SalesReportItem {
                        period: "2024-03".into(),
                        total_sales: 120.5,
                        order_count: 3,
                        quantity: 9,
                    }],
                    inventory_report: InventoryReport {
                        total_stock: 400,
                        low_stock_count: 2,
                        movements: vec![],
                    },
                    delivery_report: vec![],
                })
            });

        let env = JobEnv {
            reports: Arc::new(reports),
            ..env(TestUnitOfWork::new())
        };
        let outcome = env
            .run(&batch(BatchType::ReportGeneration, json!({})))
            .await
            .unwrap();
        assert_eq!(outcome.success_count, 1);
        assert!(outcome.logs.iter().any(|l| l == "Sales: 120.50 over 3 order(s)"));
    }
}
