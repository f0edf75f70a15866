//! Inbound receivings. Stock only moves when a receiving is marked
//! received.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::stock::{apply_change, StockChange};
use crate::domain::{
    NewReceiving, Receiving, ReceivingChanges, ReceivingFilter, ReceivingStatus,
    StockChangeType,
};
use crate::errors::{AppError, AppResult};
use crate::infra::UnitOfWork;
use crate::types::{Paginated, PaginationParams};
use crate::with_transaction;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ReceivingService: Send + Sync {
    async fn create(&self, receiving: NewReceiving) -> AppResult<Receiving>;

    async fn list(
        &self,
        filter: ReceivingFilter,
        params: PaginationParams,
    ) -> AppResult<Paginated<Receiving>>;

    async fn get(&self, id: Uuid) -> AppResult<Receiving>;

    async fn update(&self, id: Uuid, changes: ReceivingChanges) -> AppResult<Receiving>;

    async fn update_status(
        &self,
        id: Uuid,
        status: ReceivingStatus,
        actor: Uuid,
    ) -> AppResult<Receiving>;
}

pub struct ReceivingManager<U: UnitOfWork> {
    uow: Arc<U>,
}

impl<U: UnitOfWork> ReceivingManager<U> {
    pub fn new(uow: Arc<U>) -> Self {
        Self { uow }
    }
}

#[async_trait]
impl<U: UnitOfWork> ReceivingService for ReceivingManager<U> {
    async fn create(&self, receiving: NewReceiving) -> AppResult<Receiving> {
        receiving.validate()?;
        if self
            .uow
            .products()
            .find_by_id(receiving.product_id)
            .await?
            .is_none()
        {
            return Err(AppError::validation("Product does not exist"));
        }
        let created = self.uow.receivings().create(receiving).await?;
        tracing::info!(receiving_id = %created.id, order_number = %created.order_number, "Receiving created");
        Ok(created)
    }

    async fn list(
        &self,
        filter: ReceivingFilter,
        params: PaginationParams,
    ) -> AppResult<Paginated<Receiving>> {
        let (rows, total) = self.uow.receivings().list(filter, params).await?;
        Ok(Paginated::new(rows, &params, total))
    }

    async fn get(&self, id: Uuid) -> AppResult<Receiving> {
        self.uow
            .receivings()
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound)
    }

    async fn update(&self, id: Uuid, changes: ReceivingChanges) -> AppResult<Receiving> {
        changes.validate()?;
        let current = self.get(id).await?;
        if current.status != ReceivingStatus::Pending {
            return Err(AppError::bad_request(format!(
                "Receiving cannot be edited once it is {}",
                current.status
            )));
        }
        self.uow.receivings().update(id, changes).await
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: ReceivingStatus,
        actor: Uuid,
    ) -> AppResult<Receiving> {
        let receiving = with_transaction!(self.uow, |ctx| {
            let current = ctx
                .receivings()
                .find_for_update(id)
                .await?
                .ok_or(AppError::NotFound)?;
            current.status.transition(status)?;

            let received_at = if status == ReceivingStatus::Received {
                let change = StockChange::new(
                    current.product_id,
                    current.location.clone(),
                    StockChangeType::In,
                    current.quantity,
                )
                .reason(format!(
                    "Received {} from {}",
                    current.order_number, current.supplier_name
                ))
                .reference(current.order_number.clone())
                .actor(Some(actor));
                apply_change(&ctx, change).await?;
                Some(Utc::now())
            } else {
                None
            };

            ctx.receivings().set_status(id, status, received_at).await
        })?;

        tracing::info!(
            receiving_id = %receiving.id,
            status = %receiving.status,
            "Receiving status changed"
        );
        Ok(receiving)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::repositories::{MockProductRepository, MockReceivingRepository};
    use crate::services::test_support::TestUnitOfWork;

    fn receiving(status: ReceivingStatus) -> Receiving {
        let now = Utc::now();
        Receiving {
            id: Uuid::new_v4(),
            order_number: "PO-2024-0042".into(),
            supplier_name: "Uji Farms".into(),
            product_id: Uuid::new_v4(),
            quantity: 40,
            location: "WH-TOKYO-A1".into(),
            status,
            expected_date: None,
            received_date: None,
            note: None,
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn only_pending_receivings_are_editable() {
        let current = receiving(ReceivingStatus::InTransit);
        let id = current.id;
        let mut repo = MockReceivingRepository::new();
        repo.expect_find_by_id()
            .returning(move |_| Ok(Some(current.clone())));
        repo.expect_update().never();

        let service = ReceivingManager::new(TestUnitOfWork::new().with_receivings(repo).into_arc());
        let err = service
            .update(
                id,
                ReceivingChanges {
                    quantity: Some(50),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn create_requires_existing_product() {
        let mut products = MockProductRepository::new();
        products.expect_find_by_id().returning(|_| Ok(None));

        let service = ReceivingManager::new(TestUnitOfWork::new().with_products(products).into_arc());
        let err = service
            .create(NewReceiving {
                order_number: "PO-1".into(),
                supplier_name: "Uji Farms".into(),
                product_id: Uuid::new_v4(),
                quantity: 10,
                location: "WH-A".into(),
                expected_date: None,
                note: None,
                created_by: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
