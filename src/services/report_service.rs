//! Reports and the dashboard summary.
//!
//! Reads fan out in parallel; the bucketing itself is in
//! `domain::report`.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::container::parallel;
use crate::domain::report::{
    delivery_report, movement_report, sales_report, InventoryReport, SaleRecord,
};
use crate::domain::{
    DashboardSummary, Delivery, Product, ReceivingStatus, ReportPeriod, ReportResponse,
};
use crate::errors::{AppError, AppResult};
use crate::infra::UnitOfWork;
use crate::types::DateRange;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ReportService: Send + Sync {
    /// Sales, inventory and delivery report over `range`, defaulting to the
    /// period's standard window ending today
    async fn generate(&self, period: ReportPeriod, range: DateRange) -> AppResult<ReportResponse>;

    async fn dashboard(&self, user_id: Uuid) -> AppResult<DashboardSummary>;
}

pub struct ReportManager<U: UnitOfWork> {
    uow: Arc<U>,
    low_stock_threshold: i32,
}

impl<U: UnitOfWork> ReportManager<U> {
    pub fn new(uow: Arc<U>, low_stock_threshold: i32) -> Self {
        Self {
            uow,
            low_stock_threshold,
        }
    }
}

/// Revenue per delivered order, priced at the product's current price
fn sale_records(deliveries: &[Delivery], products: &[Product]) -> Vec<SaleRecord> {
    let prices: HashMap<Uuid, f64> = products.iter().map(|p| (p.id, p.price)).collect();
    deliveries
        .iter()
        .filter_map(|d| {
            let date = d.actual_delivery_date?.date_naive();
            let price = prices.get(&d.product_id)?;
            Some(SaleRecord {
                date,
                amount: price * f64::from(d.quantity),
                quantity: d.quantity,
            })
        })
        .collect()
}

#[async_trait]
impl<U: UnitOfWork> ReportService for ReportManager<U> {
    async fn generate(&self, period: ReportPeriod, range: DateRange) -> AppResult<ReportResponse> {
        let today = Utc::now().date_naive();
        let end_date = range.end_date.unwrap_or(today);
        let start_date = range
            .start_date
            .unwrap_or_else(|| period.default_start(end_date));
        let window = DateRange::new(Some(start_date), Some(end_date));
        window.validate()?;

        let (Some(from), Some(until)) = (window.start(), window.end_exclusive()) else {
            return Err(AppError::validation("Report range is out of bounds"));
        };

        let (delivered, movements, total_stock, low_stock) = parallel::join4(
            self.uow.deliveries().delivered_between(from, until),
            self.uow.inventory().movements_between(from, until),
            self.uow.inventory().total_stock(),
            self.uow.inventory().below_threshold(self.low_stock_threshold),
        )
        .await?;

        let mut product_ids: Vec<Uuid> = delivered.iter().map(|d| d.product_id).collect();
        product_ids.sort_unstable();
        product_ids.dedup();
        let products = if product_ids.is_empty() {
            Vec::new()
        } else {
            self.uow.products().find_by_ids(product_ids).await?
        };

        Ok(ReportResponse {
            period_type: period,
            start_date,
            end_date,
            sales_report: sales_report(period, &sale_records(&delivered, &products)),
            inventory_report: InventoryReport {
                total_stock,
                low_stock_count: low_stock.len() as u64,
                movements: movement_report(period, &movements),
            },
            delivery_report: delivery_report(period, &delivered),
        })
    }

    async fn dashboard(&self, user_id: Uuid) -> AppResult<DashboardSummary> {
        let ((product_count, total_stock, low_stock), (by_status, pending, unread)) =
            parallel::join2(
                parallel::join3(
                    self.uow.products().count(),
                    self.uow.inventory().total_stock(),
                    self.uow.inventory().below_threshold(self.low_stock_threshold),
                ),
                parallel::join3(
                    self.uow.deliveries().count_by_status(),
                    self.uow.receivings().count_by_status(ReceivingStatus::Pending),
                    self.uow.notifications().count_unread(user_id),
                ),
            )
            .await?;

        Ok(DashboardSummary {
            product_count,
            total_stock,
            low_stock_count: low_stock.len() as u64,
            deliveries_by_status: by_status,
            pending_receivings: pending,
            unread_notifications: unread,
        })
    }
}
