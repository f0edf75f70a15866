//! Inventory rows, transfers between locations and stock queries.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::inventory::take;
use crate::domain::{
    Availability, Inventory, InventoryChanges, InventoryFilter, InventoryMovement,
    InventoryStatus, NewInventory, NewStockHistory, StockChangeType, Transfer,
};
use crate::errors::{AppError, AppResult};
use crate::infra::UnitOfWork;
use crate::types::{Paginated, PaginationParams};
use crate::with_transaction;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait InventoryService: Send + Sync {
    async fn create(&self, inventory: NewInventory) -> AppResult<Inventory>;

    async fn get(&self, id: Uuid) -> AppResult<Inventory>;

    async fn list(
        &self,
        filter: InventoryFilter,
        params: PaginationParams,
    ) -> AppResult<Paginated<Inventory>>;

    async fn by_product(&self, product_id: Uuid) -> AppResult<Vec<Inventory>>;

    async fn by_location(&self, location: String) -> AppResult<Vec<Inventory>>;

    async fn update(&self, id: Uuid, changes: InventoryChanges) -> AppResult<Inventory>;

    async fn delete(&self, id: Uuid) -> AppResult<()>;

    /// Move stock between two locations of the same product
    async fn transfer(&self, transfer: Transfer, actor: Uuid) -> AppResult<InventoryMovement>;

    async fn list_movements(
        &self,
        product_id: Option<Uuid>,
        params: PaginationParams,
    ) -> AppResult<Paginated<InventoryMovement>>;

    async fn check_availability(
        &self,
        product_id: Uuid,
        location: String,
        quantity: i32,
    ) -> AppResult<Availability>;

    /// Rows below `threshold`, or the configured threshold when `None`
    async fn low_stock(&self, threshold: Option<i32>) -> AppResult<Vec<Inventory>>;
}

pub struct InventoryManager<U: UnitOfWork> {
    uow: Arc<U>,
    low_stock_threshold: i32,
}

impl<U: UnitOfWork> InventoryManager<U> {
    pub fn new(uow: Arc<U>, low_stock_threshold: i32) -> Self {
        Self {
            uow,
            low_stock_threshold,
        }
    }
}

#[async_trait]
impl<U: UnitOfWork> InventoryService for InventoryManager<U> {
    async fn create(&self, inventory: NewInventory) -> AppResult<Inventory> {
        inventory.validate()?;
        if self
            .uow
            .products()
            .find_by_id(inventory.product_id)
            .await?
            .is_none()
        {
            return Err(AppError::validation("Product does not exist"));
        }
        if self
            .uow
            .inventory()
            .find_by_product_location(inventory.product_id, &inventory.location)
            .await?
            .is_some()
        {
            return Err(AppError::conflict("Inventory for this product and location"));
        }

        let inventory = NewInventory {
            status: inventory.status.after_quantity_change(inventory.quantity),
            ..inventory
        };
        self.uow.inventory().create(inventory).await
    }

    async fn get(&self, id: Uuid) -> AppResult<Inventory> {
        self.uow
            .inventory()
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound)
    }

    async fn list(
        &self,
        filter: InventoryFilter,
        params: PaginationParams,
    ) -> AppResult<Paginated<Inventory>> {
        let (rows, total) = self.uow.inventory().list(filter, params).await?;
        Ok(Paginated::new(rows, &params, total))
    }

    async fn by_product(&self, product_id: Uuid) -> AppResult<Vec<Inventory>> {
        self.uow.inventory().list_by_product(product_id).await
    }

    async fn by_location(&self, location: String) -> AppResult<Vec<Inventory>> {
        self.uow.inventory().list_by_location(&location).await
    }

    async fn update(&self, id: Uuid, changes: InventoryChanges) -> AppResult<Inventory> {
        changes.validate()?;
        let current = self.get(id).await?;

        if let Some(location) = changes.location.as_deref().filter(|l| *l != current.location) {
            if self
                .uow
                .inventory()
                .find_by_product_location(current.product_id, location)
                .await?
                .is_some()
            {
                return Err(AppError::conflict("Inventory for this product and location"));
            }
        }

        let changes = changes.resolve_status(&current);
        self.uow.inventory().update(id, changes).await
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.uow.inventory().delete(id).await
    }

    async fn transfer(&self, transfer: Transfer, actor: Uuid) -> AppResult<InventoryMovement> {
        transfer.validate()?;

        let movement = with_transaction!(self.uow, |ctx| {
            let source = ctx
                .inventory()
                .find_for_update(transfer.product_id, &transfer.from_location)
                .await?
                .ok_or(AppError::NotFound)?;
            let source_after = take(source.quantity, transfer.quantity)?;
            ctx.inventory()
                .set_quantity(
                    source.id,
                    source_after,
                    source.status.after_quantity_change(source_after),
                )
                .await?;

            let destination = ctx
                .inventory()
                .find_for_update(transfer.product_id, &transfer.to_location)
                .await?;
            let destination_before = destination.as_ref().map_or(0, |row| row.quantity);
            let destination_after = StockChangeType::In.apply(destination_before, transfer.quantity)?;
            match destination {
                Some(row) => {
                    ctx.inventory()
                        .set_quantity(
                            row.id,
                            destination_after,
                            row.status.after_quantity_change(destination_after),
                        )
                        .await?;
                }
                None => {
                    ctx.inventory()
                        .create(NewInventory {
                            product_id: transfer.product_id,
                            location: transfer.to_location.clone(),
                            quantity: destination_after,
                            status: InventoryStatus::for_new_row(destination_after),
                        })
                        .await?;
                }
            }

            let reason = format!(
                "Transfer {} -> {}",
                transfer.from_location, transfer.to_location
            );
            ctx.stock_history()
                .record(NewStockHistory {
                    product_id: transfer.product_id,
                    location: transfer.from_location.clone(),
                    previous_stock: source.quantity,
                    new_stock: source_after,
                    change_type: StockChangeType::Out,
                    reason: Some(reason.clone()),
                    created_by: Some(actor),
                })
                .await?;
            ctx.stock_history()
                .record(NewStockHistory {
                    product_id: transfer.product_id,
                    location: transfer.to_location.clone(),
                    previous_stock: destination_before,
                    new_stock: destination_after,
                    change_type: StockChangeType::In,
                    reason: Some(reason),
                    created_by: Some(actor),
                })
                .await?;

            ctx.inventory()
                .record_movement(transfer.into_movement(Utc::now()))
                .await
        })?;

        tracing::info!(
            product_id = %movement.product_id,
            quantity = movement.quantity,
            "Stock transferred"
        );
        Ok(movement)
    }

    async fn list_movements(
        &self,
        product_id: Option<Uuid>,
        params: PaginationParams,
    ) -> AppResult<Paginated<InventoryMovement>> {
        let (rows, total) = self
            .uow
            .inventory()
            .list_movements(product_id, params)
            .await?;
        Ok(Paginated::new(rows, &params, total))
    }

    async fn check_availability(
        &self,
        product_id: Uuid,
        location: String,
        quantity: i32,
    ) -> AppResult<Availability> {
        if quantity <= 0 {
            return Err(AppError::validation("Quantity must be greater than 0"));
        }
        let on_hand = self
            .uow
            .inventory()
            .find_by_product_location(product_id, &location)
            .await?
            .map_or(0, |row| row.quantity);
        Ok(Availability::new(product_id, location, on_hand, quantity))
    }

    async fn low_stock(&self, threshold: Option<i32>) -> AppResult<Vec<Inventory>> {
        let threshold = threshold.unwrap_or(self.low_stock_threshold);
        if threshold < 0 {
            return Err(AppError::validation("Threshold must not be negative"));
        }
        self.uow.inventory().below_threshold(threshold).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MovementType;
    use crate::infra::repositories::{MockInventoryRepository, MockProductRepository};
    use crate::services::test_support::{inventory, product, TestUnitOfWork};

    #[tokio::test]
    async fn availability_reads_on_hand_at_location() {
        let product_id = Uuid::new_v4();
        let mut repo = MockInventoryRepository::new();
        repo.expect_find_by_product_location()
            .returning(move |pid, loc| Ok(Some(inventory(pid, loc, 7))));

        let service = InventoryManager::new(TestUnitOfWork::new().with_inventory(repo).into_arc(), 10);
        let ok = service
            .check_availability(product_id, "WH-A".into(), 7)
            .await
            .unwrap();
        assert!(ok.available);
        let short = service
            .check_availability(product_id, "WH-A".into(), 8)
            .await
            .unwrap();
        assert!(!short.available);
        assert_eq!(short.on_hand, 7);
    }

    #[tokio::test]
    async fn missing_row_means_nothing_available() {
        let mut repo = MockInventoryRepository::new();
        repo.expect_find_by_product_location().returning(|_, _| Ok(None));

        let service = InventoryManager::new(TestUnitOfWork::new().with_inventory(repo).into_arc(), 10);
        let result = service
            .check_availability(Uuid::new_v4(), "WH-B".into(), 1)
            .await
            .unwrap();
        assert!(!result.available);
        assert_eq!(result.on_hand, 0);
    }

    #[tokio::test]
    async fn low_stock_defaults_to_configured_threshold() {
        let mut repo = MockInventoryRepository::new();
        repo.expect_below_threshold()
            .withf(|t| *t == 25)
            .returning(|_| Ok(vec![]));

        let service = InventoryManager::new(TestUnitOfWork::new().with_inventory(repo).into_arc(), 25);
        assert!(service.low_stock(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_rejects_duplicate_location() {
        let product_id = Uuid::new_v4();
        let mut products = MockProductRepository::new();
        products
            .expect_find_by_id()
            .returning(|id| Ok(Some(product(id, "GT-001", 10.0))));
        let mut repo = MockInventoryRepository::new();
        repo.expect_find_by_product_location()
            .returning(|pid, loc| Ok(Some(inventory(pid, loc, 1))));
        repo.expect_create().never();

        let service = InventoryManager::new(
            TestUnitOfWork::new()
                .with_products(products)
                .with_inventory(repo)
                .into_arc(),
            10,
        );
        let err = service
            .create(NewInventory {
                product_id,
                location: "WH-A".into(),
                quantity: 3,
                status: InventoryStatus::Available,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn transfer_to_same_location_is_rejected_before_any_io() {
        let service = InventoryManager::new(TestUnitOfWork::new().into_arc(), 10);
        let err = service
            .transfer(
                Transfer {
                    product_id: Uuid::new_v4(),
                    from_location: "WH-A".into(),
                    to_location: "WH-A".into(),
                    quantity: 2,
                    movement_type: MovementType::Transfer,
                    reference_number: None,
                    moved_at: None,
                },
                Uuid::new_v4(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn update_derives_status_from_new_quantity() {
        let row = inventory(Uuid::new_v4(), "WH-A", 4);
        let id = row.id;
        let mut repo = MockInventoryRepository::new();
        repo.expect_find_by_id().returning(move |_| Ok(Some(row.clone())));
        repo.expect_update()
            .withf(|_, c| c.status == Some(InventoryStatus::OutOfStock))
            .returning(|_, c| {
                let mut updated = inventory(Uuid::new_v4(), "WH-A", 0);
                updated.status = c.status.unwrap_or(InventoryStatus::Available);
                Ok(updated)
            });

        let service = InventoryManager::new(TestUnitOfWork::new().with_inventory(repo).into_arc(), 10);
        let updated = service
            .update(
                id,
                InventoryChanges {
                    quantity: Some(0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, InventoryStatus::OutOfStock);
    }
}
