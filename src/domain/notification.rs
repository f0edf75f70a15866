//! In-app notifications and the messages the system generates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use super::batch::{Batch, BatchStatus};
use super::delivery::{Delivery, DeliveryTracking};
use super::inventory::Inventory;
use crate::errors::{AppError, AppResult};

string_enum! {
    pub enum NotificationType {
        DeliveryStatus => "delivery_status",
        DeliveryComplete => "delivery_complete",
        DeliveryTracking => "delivery_tracking",
        LowStock => "low_stock",
        BatchResult => "batch_result",
    }
}

string_enum! {
    pub enum NotificationStatus {
        Unread => "unread",
        Read => "read",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub status: NotificationStatus,
    pub title: String,
    pub message: String,
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Notification {
    pub fn is_read(&self) -> bool {
        self.status == NotificationStatus::Read
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub data: serde_json::Value,
}

impl NewNotification {
    pub fn validate(&self) -> AppResult<()> {
        if self.title.trim().is_empty() {
            return Err(AppError::validation("Title is required"));
        }
        if self.message.trim().is_empty() {
            return Err(AppError::validation("Message is required"));
        }
        Ok(())
    }

    pub fn delivery_status(user_id: Uuid, delivery: &Delivery) -> Self {
        Self {
            user_id,
            notification_type: NotificationType::DeliveryStatus,
            title: "Delivery status updated".into(),
            message: format!(
                "Delivery {} is now {}",
                delivery.order_number, delivery.status
            ),
            data: json!({
                "delivery_id": delivery.id,
                "order_number": delivery.order_number,
                "status": delivery.status,
            }),
        }
    }

    pub fn delivery_complete(user_id: Uuid, delivery: &Delivery) -> Self {
        Self {
            user_id,
            notification_type: NotificationType::DeliveryComplete,
            title: "Delivery completed".into(),
            message: format!("Delivery {} has been delivered", delivery.order_number),
            data: json!({
                "delivery_id": delivery.id,
                "order_number": delivery.order_number,
                "actual_delivery_date": delivery.actual_delivery_date,
            }),
        }
    }

    pub fn delivery_tracking(user_id: Uuid, delivery: &Delivery, tracking: &DeliveryTracking) -> Self {
        Self {
            user_id,
            notification_type: NotificationType::DeliveryTracking,
            title: "Delivery tracking updated".into(),
            message: format!(
                "Delivery {} is at {} ({})",
                delivery.order_number, tracking.location, tracking.status
            ),
            data: json!({
                "delivery_id": delivery.id,
                "tracking_id": tracking.id,
                "location": tracking.location,
                "status": tracking.status,
            }),
        }
    }

    pub fn low_stock(user_id: Uuid, items: &[Inventory], threshold: i32) -> Self {
        let preview: Vec<_> = items
            .iter()
            .take(20)
            .map(|i| json!({"product_id": i.product_id, "location": i.location, "quantity": i.quantity}))
            .collect();

        Self {
            user_id,
            notification_type: NotificationType::LowStock,
            title: "Low stock alert".into(),
            message: format!(
                "{} inventory item(s) are below {} units",
                items.len(),
                threshold
            ),
            data: json!({
                "threshold": threshold,
                "count": items.len(),
                "items": preview,
            }),
        }
    }

    pub fn batch_result(user_id: Uuid, batch: &Batch) -> Self {
        let title = match batch.status {
            BatchStatus::Completed => "Batch job completed",
            BatchStatus::Cancelled => "Batch job cancelled",
            _ => "Batch job failed",
        };

        Self {
            user_id,
            notification_type: NotificationType::BatchResult,
            title: title.into(),
            message: format!(
                "{} batch finished as {}: {} processed, {} succeeded, {} failed",
                batch.batch_type,
                batch.status,
                batch.processed_items,
                batch.success_count,
                batch.error_count
            ),
            data: json!({
                "batch_id": batch.id,
                "type": batch.batch_type,
                "status": batch.status,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DeliveryStatus;

    #[test]
    fn delivery_status_message_mentions_order_and_status() {
        let now = Utc::now();
        let delivery = Delivery {
            id: Uuid::new_v4(),
            order_number: "ORD-7".into(),
            product_id: Uuid::new_v4(),
            quantity: 2,
            from_location: "WH-A".into(),
            customer_name: "Tea House".into(),
            customer_address: "2 Side St".into(),
            customer_phone: "0312345678".into(),
            status: DeliveryStatus::InTransit,
            estimated_delivery_date: None,
            actual_delivery_date: None,
            note: None,
            stock_reserved: true,
            created_by: None,
            created_at: now,
            updated_at: now,
        };

        let n = NewNotification::delivery_status(Uuid::new_v4(), &delivery);
        assert_eq!(n.notification_type, NotificationType::DeliveryStatus);
        assert!(n.message.contains("ORD-7"));
        assert!(n.message.contains("in_transit"));
        assert_eq!(n.data["status"], "in_transit");
    }

    #[test]
    fn blank_title_is_rejected() {
        let n = NewNotification {
            user_id: Uuid::new_v4(),
            notification_type: NotificationType::LowStock,
            title: " ".into(),
            message: "m".into(),
            data: serde_json::Value::Null,
        };
        assert!(n.validate().is_err());
    }
}
