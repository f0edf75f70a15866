//! Report periods and the aggregations behind the reports endpoint.

use std::collections::BTreeMap;

use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;
use utoipa::ToSchema;

use super::delivery::{Delivery, DeliveryStatus};
use super::inventory::{InventoryMovement, MovementType};

string_enum! {
    pub enum ReportPeriod {
        Daily => "daily",
        Weekly => "weekly",
        Monthly => "monthly",
        Yearly => "yearly",
    }
}

impl Default for ReportPeriod {
    fn default() -> Self {
        ReportPeriod::Monthly
    }
}

impl ReportPeriod {
    /// Label of the bucket `date` falls into. Labels sort chronologically.
    pub fn bucket(self, date: NaiveDate) -> String {
        match self {
            ReportPeriod::Daily => date.format("%Y-%m-%d").to_string(),
            ReportPeriod::Weekly => {
                let week = date.iso_week();
                format!("{}-W{:02}", week.year(), week.week())
            }
            ReportPeriod::Monthly => date.format("%Y-%m").to_string(),
            ReportPeriod::Yearly => date.format("%Y").to_string(),
        }
    }

    /// Default window ending at `today`
    pub fn default_start(self, today: NaiveDate) -> NaiveDate {
        let back = match self {
            ReportPeriod::Daily => return today - chrono::Duration::days(29),
            ReportPeriod::Weekly => return today - chrono::Duration::weeks(11),
            ReportPeriod::Monthly => Months::new(11),
            ReportPeriod::Yearly => Months::new(48),
        };
        today
            .checked_sub_months(back)
            .and_then(|d| d.with_day(1))
            .unwrap_or(today)
    }
}

/// A delivered order's revenue on its delivery date
#[derive(Debug, Clone, PartialEq)]
pub struct SaleRecord {
    pub date: NaiveDate,
    pub amount: f64,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SalesReportItem {
    pub period: String,
    pub total_sales: f64,
    pub order_count: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct MovementReportItem {
    pub period: String,
    pub inbound: i64,
    pub outbound: i64,
    pub transfer: i64,
    pub adjustment: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct InventoryReport {
    pub total_stock: i64,
    pub low_stock_count: u64,
    pub movements: Vec<MovementReportItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DeliveryReportItem {
    pub period: String,
    pub delivered: i64,
    pub on_time: i64,
    /// Percentage of deliveries made on or before the estimated date
    pub on_time_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ReportResponse {
    pub period_type: ReportPeriod,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub sales_report: Vec<SalesReportItem>,
    pub inventory_report: InventoryReport,
    pub delivery_report: Vec<DeliveryReportItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct StatusCount {
    pub status: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DashboardSummary {
    pub product_count: u64,
    pub total_stock: i64,
    pub low_stock_count: u64,
    pub deliveries_by_status: Vec<StatusCount>,
    pub pending_receivings: u64,
    pub unread_notifications: u64,
}

pub fn sales_report(period: ReportPeriod, sales: &[SaleRecord]) -> Vec<SalesReportItem> {
    let mut buckets: BTreeMap<String, SalesReportItem> = BTreeMap::new();

    for sale in sales {
        let label = period.bucket(sale.date);
        let item = buckets
            .entry(label.clone())
            .or_insert_with(|| SalesReportItem {
                period: label,
                total_sales: 0.0,
                order_count: 0,
                quantity: 0,
            });
        item.total_sales += sale.amount;
        item.order_count += 1;
        item.quantity += i64::from(sale.quantity);
    }

    buckets
        .into_values()
        .map(|mut item| {
            item.total_sales = round2(item.total_sales);
            item
        })
        .collect()
}

pub fn movement_report(
    period: ReportPeriod,
    movements: &[InventoryMovement],
) -> Vec<MovementReportItem> {
    let mut buckets: BTreeMap<String, MovementReportItem> = BTreeMap::new();

    for movement in movements {
        let label = period.bucket(movement.moved_at.date_naive());
        let item = buckets
            .entry(label.clone())
            .or_insert_with(|| MovementReportItem {
                period: label,
                inbound: 0,
                outbound: 0,
                transfer: 0,
                adjustment: 0,
            });
        let qty = i64::from(movement.quantity);
        match movement.movement_type {
            MovementType::Inbound => item.inbound += qty,
            MovementType::Outbound => item.outbound += qty,
            MovementType::Transfer => item.transfer += qty,
            MovementType::Adjustment => item.adjustment += qty,
        }
    }

    buckets.into_values().collect()
}

/// On-time rate per bucket of actual delivery date. Deliveries without an
/// estimate count as delivered but never as on time.
pub fn delivery_report(period: ReportPeriod, deliveries: &[Delivery]) -> Vec<DeliveryReportItem> {
    let mut buckets: BTreeMap<String, (i64, i64)> = BTreeMap::new();

    for delivery in deliveries
        .iter()
        .filter(|d| d.status == DeliveryStatus::Delivered)
    {
        let Some(actual) = delivery.actual_delivery_date else {
            continue;
        };
        let entry = buckets.entry(period.bucket(actual.date_naive())).or_default();
        entry.0 += 1;
        if delivery.is_on_time() == Some(true) {
            entry.1 += 1;
        }
    }

    buckets
        .into_iter()
        .map(|(period, (delivered, on_time))| DeliveryReportItem {
            period,
            delivered,
            on_time,
            on_time_rate: on_time_rate(delivered, on_time),
        })
        .collect()
}

pub fn on_time_rate(delivered: i64, on_time: i64) -> f64 {
    if delivered == 0 {
        return 0.0;
    }
    round2(on_time as f64 * 100.0 / delivered as f64)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
