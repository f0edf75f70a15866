//! Inventory rows and stock movements.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use super::base::{fetch_page, into_domain, opt_into_domain, page_into_domain, unique_violation};
use super::entities::inventory::{self, ActiveModel, Entity as InventoryEntity};
use super::entities::inventory_movement::{
    self, ActiveModel as MovementActiveModel, Entity as MovementEntity,
};
use crate::domain::{
    Inventory, InventoryChanges, InventoryFilter, InventoryMovement, InventoryStatus,
    NewInventory, NewMovement,
};
use crate::errors::{AppError, AppResult};
use crate::types::{DateRange, PaginationParams};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

const DUPLICATE_ROW: &str = "Inventory for this product and location";

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait InventoryRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Inventory>>;

    async fn find_by_product_location(
        &self,
        product_id: Uuid,
        location: &str,
    ) -> AppResult<Option<Inventory>>;

    async fn list(
        &self,
        filter: InventoryFilter,
        params: PaginationParams,
    ) -> AppResult<(Vec<Inventory>, u64)>;

    async fn list_by_product(&self, product_id: Uuid) -> AppResult<Vec<Inventory>>;

    async fn list_by_location(&self, location: &str) -> AppResult<Vec<Inventory>>;

    /// Rows created inside `range`, for export
    async fn list_created(&self, range: DateRange) -> AppResult<Vec<Inventory>>;

    async fn create(&self, inventory: NewInventory) -> AppResult<Inventory>;

    async fn update(&self, id: Uuid, changes: InventoryChanges) -> AppResult<Inventory>;

    async fn delete(&self, id: Uuid) -> AppResult<()>;

    /// Rows holding fewer than `threshold` units
    async fn below_threshold(&self, threshold: i32) -> AppResult<Vec<Inventory>>;

    async fn total_stock(&self) -> AppResult<i64>;

    /// Summed quantity per product over every location
    async fn stock_by_product(&self, product_ids: Vec<Uuid>) -> AppResult<HashMap<Uuid, i64>>;

    /// Newest first
    async fn list_movements(
        &self,
        product_id: Option<Uuid>,
        params: PaginationParams,
    ) -> AppResult<(Vec<InventoryMovement>, u64)>;

    /// Movements with `start <= moved_at < end`
    async fn movements_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<InventoryMovement>>;
}

pub struct InventoryStore {
    db: DatabaseConnection,
}

impl InventoryStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl InventoryRepository for InventoryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Inventory>> {
        opt_into_domain(InventoryEntity::find_by_id(id).one(&self.db).await?)
    }

    async fn find_by_product_location(
        &self,
        product_id: Uuid,
        location: &str,
    ) -> AppResult<Option<Inventory>> {
        let model = InventoryEntity::find()
            .filter(inventory::Column::ProductId.eq(product_id))
            .filter(inventory::Column::Location.eq(location))
            .one(&self.db)
            .await?;
        opt_into_domain(model)
    }

    async fn list(
        &self,
        filter: InventoryFilter,
        params: PaginationParams,
    ) -> AppResult<(Vec<Inventory>, u64)> {
        let mut query = InventoryEntity::find()
            .order_by_asc(inventory::Column::Location)
            .order_by_asc(inventory::Column::Id);

        if let Some(product_id) = filter.product_id {
            query = query.filter(inventory::Column::ProductId.eq(product_id));
        }
        if let Some(location) = filter.location {
            query = query.filter(inventory::Column::Location.eq(location));
        }
        if let Some(status) = filter.status {
            query = query.filter(inventory::Column::Status.eq(status.as_str()));
        }

        page_into_domain(fetch_page(&self.db, query, &params).await?)
    }

    async fn list_by_product(&self, product_id: Uuid) -> AppResult<Vec<Inventory>> {
        let models = InventoryEntity::find()
            .filter(inventory::Column::ProductId.eq(product_id))
            .order_by_asc(inventory::Column::Location)
            .all(&self.db)
            .await?;
        into_domain(models)
    }

    async fn list_by_location(&self, location: &str) -> AppResult<Vec<Inventory>> {
        let models = InventoryEntity::find()
            .filter(inventory::Column::Location.eq(location))
            .order_by_asc(inventory::Column::ProductId)
            .all(&self.db)
            .await?;
        into_domain(models)
    }

    async fn list_created(&self, range: DateRange) -> AppResult<Vec<Inventory>> {
        let mut query = InventoryEntity::find().order_by_asc(inventory::Column::CreatedAt);
        if let Some(start) = range.start() {
            query = query.filter(inventory::Column::CreatedAt.gte(start));
        }
        if let Some(end) = range.end_exclusive() {
            query = query.filter(inventory::Column::CreatedAt.lt(end));
        }
        into_domain(query.all(&self.db).await?)
    }

    async fn create(&self, inventory: NewInventory) -> AppResult<Inventory> {
        insert(&self.db, inventory).await
    }

    async fn update(&self, id: Uuid, changes: InventoryChanges) -> AppResult<Inventory> {
        let model = InventoryEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut active: ActiveModel = model.into();
        if let Some(location) = changes.location {
            active.location = Set(location);
        }
        if let Some(quantity) = changes.quantity {
            active.quantity = Set(quantity);
        }
        if let Some(status) = changes.status {
            active.status = Set(status.to_string());
        }
        active.updated_at = Set(Utc::now());

        let model = active
            .update(&self.db)
            .await
            .map_err(unique_violation(DUPLICATE_ROW))?;
        Inventory::try_from(model)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = InventoryEntity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn below_threshold(&self, threshold: i32) -> AppResult<Vec<Inventory>> {
        let models = InventoryEntity::find()
            .filter(inventory::Column::Quantity.lt(threshold))
            .filter(inventory::Column::Status.ne(InventoryStatus::Discontinued.as_str()))
            .order_by_asc(inventory::Column::Quantity)
            .all(&self.db)
            .await?;
        into_domain(models)
    }

    async fn total_stock(&self) -> AppResult<i64> {
        let total: Option<Option<i64>> = InventoryEntity::find()
            .select_only()
            .column_as(inventory::Column::Quantity.sum(), "total")
            .into_tuple()
            .one(&self.db)
            .await?;
        Ok(total.flatten().unwrap_or(0))
    }

    async fn stock_by_product(&self, product_ids: Vec<Uuid>) -> AppResult<HashMap<Uuid, i64>> {
        if product_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<(Uuid, Option<i64>)> = InventoryEntity::find()
            .select_only()
            .column(inventory::Column::ProductId)
            .column_as(inventory::Column::Quantity.sum(), "total")
            .filter(inventory::Column::ProductId.is_in(product_ids))
            .group_by(inventory::Column::ProductId)
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(id, total)| (id, total.unwrap_or(0)))
            .collect())
    }

    async fn list_movements(
        &self,
        product_id: Option<Uuid>,
        params: PaginationParams,
    ) -> AppResult<(Vec<InventoryMovement>, u64)> {
        let mut query = MovementEntity::find()
            .order_by_desc(inventory_movement::Column::MovedAt)
            .order_by_desc(inventory_movement::Column::CreatedAt);
        if let Some(product_id) = product_id {
            query = query.filter(inventory_movement::Column::ProductId.eq(product_id));
        }
        page_into_domain(fetch_page(&self.db, query, &params).await?)
    }

    async fn movements_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<InventoryMovement>> {
        let models = MovementEntity::find()
            .filter(inventory_movement::Column::MovedAt.gte(start))
            .filter(inventory_movement::Column::MovedAt.lt(end))
            .order_by_asc(inventory_movement::Column::MovedAt)
            .all(&self.db)
            .await?;
        into_domain(models)
    }
}

/// Row for (product, location), locked until the transaction ends
pub(crate) async fn find_for_update<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    location: &str,
) -> AppResult<Option<Inventory>> {
    let model = InventoryEntity::find()
        .filter(inventory::Column::ProductId.eq(product_id))
        .filter(inventory::Column::Location.eq(location))
        .lock_exclusive()
        .one(conn)
        .await?;
    opt_into_domain(model)
}

pub(crate) async fn insert<C: ConnectionTrait>(
    conn: &C,
    inventory: NewInventory,
) -> AppResult<Inventory> {
    let now = Utc::now();
    let active_model = ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(inventory.product_id),
        location: Set(inventory.location),
        quantity: Set(inventory.quantity),
        status: Set(inventory.status.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let model = active_model
        .insert(conn)
        .await
        .map_err(unique_violation(DUPLICATE_ROW))?;
    Inventory::try_from(model)
}

pub(crate) async fn set_quantity<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
    quantity: i32,
    status: InventoryStatus,
) -> AppResult<Inventory> {
    let active = ActiveModel {
        id: Set(id),
        quantity: Set(quantity),
        status: Set(status.to_string()),
        updated_at: Set(Utc::now()),
        ..Default::default()
    };
    Inventory::try_from(active.update(conn).await?)
}

pub(crate) async fn insert_movement<C: ConnectionTrait>(
    conn: &C,
    movement: NewMovement,
) -> AppResult<InventoryMovement> {
    let active_model = MovementActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(movement.product_id),
        from_location: Set(movement.from_location),
        to_location: Set(movement.to_location),
        quantity: Set(movement.quantity),
        movement_type: Set(movement.movement_type.to_string()),
        reference_number: Set(movement.reference_number),
        moved_at: Set(movement.moved_at),
        created_at: Set(Utc::now()),
    };
    InventoryMovement::try_from(active_model.insert(conn).await?)
}
