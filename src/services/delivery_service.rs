//! Outbound deliveries.
//!
//! Creating a delivery reserves its stock at the source location in the
//! same transaction that inserts it; cancelling puts the stock back. Every
//! status change leaves a notification for whoever created the delivery.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::stock::{apply_change, StockChange};
use crate::domain::{
    Delivery, DeliveryChanges, DeliveryFilter, DeliveryStatus, DeliveryTracking, NewDelivery,
    NewNotification, NewTracking, StockChangeType,
};
use crate::errors::{AppError, AppResult};
use crate::infra::UnitOfWork;
use crate::types::{Paginated, PaginationParams};
use crate::with_transaction;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait DeliveryService: Send + Sync {
    /// Create a pending delivery and reserve its stock
    async fn create(&self, delivery: NewDelivery) -> AppResult<Delivery>;

    async fn list(
        &self,
        filter: DeliveryFilter,
        params: PaginationParams,
    ) -> AppResult<Paginated<Delivery>>;

    async fn get(&self, id: Uuid) -> AppResult<Delivery>;

    /// Edit details while the delivery is pending or scheduled
    async fn update(&self, id: Uuid, changes: DeliveryChanges) -> AppResult<Delivery>;

    async fn update_status(
        &self,
        id: Uuid,
        status: DeliveryStatus,
        actor: Option<Uuid>,
    ) -> AppResult<Delivery>;

    /// Mark an in-transit delivery as delivered
    async fn complete(&self, id: Uuid, actor: Option<Uuid>) -> AppResult<Delivery>;

    async fn add_tracking(&self, tracking: NewTracking, actor: Uuid) -> AppResult<DeliveryTracking>;

    async fn list_tracking(&self, delivery_id: Uuid) -> AppResult<Vec<DeliveryTracking>>;
}

pub struct DeliveryManager<U: UnitOfWork> {
    uow: Arc<U>,
}

impl<U: UnitOfWork> DeliveryManager<U> {
    pub fn new(uow: Arc<U>) -> Self {
        Self { uow }
    }

    async fn transition(
        &self,
        id: Uuid,
        status: DeliveryStatus,
        actor: Option<Uuid>,
        completing: bool,
    ) -> AppResult<Delivery> {
        let delivery = with_transaction!(self.uow, |ctx| {
            let current = ctx
                .deliveries()
                .find_for_update(id)
                .await?
                .ok_or(AppError::NotFound)?;
            if completing && current.status != DeliveryStatus::InTransit {
                return Err(AppError::invalid_transition(current.status, status));
            }
            current.status.transition(status)?;

            if status == DeliveryStatus::Cancelled {
                if let Some(restock) = cancellation_restock(&current, actor) {
                    apply_change(&ctx, restock).await?;
                }
            }

            let delivered_at = (status == DeliveryStatus::Delivered).then(Utc::now);
            let updated = ctx
                .deliveries()
                .set_status(id, status, delivered_at)
                .await?;

            if let Some(recipient) = updated.created_by.or(actor) {
                let notification = if completing {
                    NewNotification::delivery_complete(recipient, &updated)
                } else {
                    NewNotification::delivery_status(recipient, &updated)
                };
                ctx.notifications().create(notification).await?;
            }
            Ok(updated)
        })?;

        tracing::info!(
            delivery_id = %delivery.id,
            order_number = %delivery.order_number,
            status = %delivery.status,
            "Delivery status changed"
        );
        Ok(delivery)
    }
}

/// Stock to put back when `delivery` is cancelled. Unreserved deliveries
/// never took any out.
fn cancellation_restock(delivery: &Delivery, actor: Option<Uuid>) -> Option<StockChange> {
    if !delivery.stock_reserved {
        return None;
    }
    Some(
        StockChange::new(
            delivery.product_id,
            delivery.from_location.clone(),
            StockChangeType::In,
            delivery.quantity,
        )
        .reason(format!("Delivery {} cancelled", delivery.order_number))
        .reference(delivery.order_number.clone())
        .actor(actor),
    )
}

#[async_trait]
impl<U: UnitOfWork> DeliveryService for DeliveryManager<U> {
    async fn create(&self, delivery: NewDelivery) -> AppResult<Delivery> {
        delivery.validate()?;
        if self
            .uow
            .products()
            .find_by_id(delivery.product_id)
            .await?
            .is_none()
        {
            return Err(AppError::validation("Product does not exist"));
        }
        if self
            .uow
            .deliveries()
            .find_by_order_number(&delivery.order_number)
            .await?
            .is_some()
        {
            return Err(AppError::conflict("Order number"));
        }

        let delivery = NewDelivery {
            status: DeliveryStatus::Pending,
            stock_reserved: true,
            ..delivery
        };
        let created = with_transaction!(self.uow, |ctx| {
            let reserve = StockChange::new(
                delivery.product_id,
                delivery.from_location.clone(),
                StockChangeType::Out,
                delivery.quantity,
            )
            .reason(format!("Reserved for delivery {}", delivery.order_number))
            .reference(delivery.order_number.clone())
            .actor(delivery.created_by);
            apply_change(&ctx, reserve).await?;

            let created = ctx.deliveries().create(delivery).await?;
            if let Some(creator) = created.created_by {
                ctx.notifications()
                    .create(NewNotification::delivery_status(creator, &created))
                    .await?;
            }
            Ok(created)
        })?;

        tracing::info!(
            delivery_id = %created.id,
            order_number = %created.order_number,
            "Delivery created"
        );
        Ok(created)
    }

    async fn list(
        &self,
        filter: DeliveryFilter,
        params: PaginationParams,
    ) -> AppResult<Paginated<Delivery>> {
        filter.estimated.validate()?;
        let (rows, total) = self.uow.deliveries().list(filter, params).await?;
        Ok(Paginated::new(rows, &params, total))
    }

    async fn get(&self, id: Uuid) -> AppResult<Delivery> {
        self.uow
            .deliveries()
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound)
    }

    async fn update(&self, id: Uuid, changes: DeliveryChanges) -> AppResult<Delivery> {
        changes.validate()?;
        let current = self.get(id).await?;
        if !current.status.is_editable() {
            return Err(AppError::bad_request(format!(
                "Delivery cannot be edited once it is {}",
                current.status
            )));
        }
        self.uow.deliveries().update(id, changes).await
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: DeliveryStatus,
        actor: Option<Uuid>,
    ) -> AppResult<Delivery> {
        self.transition(id, status, actor, false).await
    }

    async fn complete(&self, id: Uuid, actor: Option<Uuid>) -> AppResult<Delivery> {
        self.transition(id, DeliveryStatus::Delivered, actor, true)
            .await
    }

    async fn add_tracking(&self, tracking: NewTracking, actor: Uuid) -> AppResult<DeliveryTracking> {
        tracking.validate()?;
        let delivery = self.get(tracking.delivery_id).await?;
        if delivery.status.is_terminal() {
            return Err(AppError::bad_request(format!(
                "Cannot track a delivery that is {}",
                delivery.status
            )));
        }

        let entry = self.uow.deliveries().add_tracking(tracking).await?;
        let recipient = delivery.created_by.unwrap_or(actor);
        self.uow
            .notifications()
            .create(NewNotification::delivery_tracking(recipient, &delivery, &entry))
            .await?;
        Ok(entry)
    }

    async fn list_tracking(&self, delivery_id: Uuid) -> AppResult<Vec<DeliveryTracking>> {
        self.get(delivery_id).await?;
        self.uow.deliveries().list_tracking(delivery_id).await
    }
}
