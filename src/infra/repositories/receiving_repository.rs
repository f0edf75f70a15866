//! Inbound receiving records.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use super::base::{fetch_page, opt_into_domain, page_into_domain};
use super::entities::receiving::{self, ActiveModel, Entity as ReceivingEntity};
use crate::domain::{
    NewReceiving, Receiving, ReceivingChanges, ReceivingFilter, ReceivingStatus,
};
use crate::errors::{AppError, AppResult};
use crate::types::PaginationParams;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ReceivingRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Receiving>>;

    async fn list(
        &self,
        filter: ReceivingFilter,
        params: PaginationParams,
    ) -> AppResult<(Vec<Receiving>, u64)>;

    async fn create(&self, receiving: NewReceiving) -> AppResult<Receiving>;

    async fn update(&self, id: Uuid, changes: ReceivingChanges) -> AppResult<Receiving>;

    async fn count_by_status(&self, status: ReceivingStatus) -> AppResult<u64>;
}

pub struct ReceivingStore {
    db: DatabaseConnection,
}

impl ReceivingStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ReceivingRepository for ReceivingStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Receiving>> {
        opt_into_domain(ReceivingEntity::find_by_id(id).one(&self.db).await?)
    }

    async fn list(
        &self,
        filter: ReceivingFilter,
        params: PaginationParams,
    ) -> AppResult<(Vec<Receiving>, u64)> {
        let mut query = ReceivingEntity::find()
            .order_by_desc(receiving::Column::CreatedAt)
            .order_by_desc(receiving::Column::Id);
        if let Some(status) = filter.status {
            query = query.filter(receiving::Column::Status.eq(status.as_str()));
        }
        if let Some(product_id) = filter.product_id {
            query = query.filter(receiving::Column::ProductId.eq(product_id));
        }
        page_into_domain(fetch_page(&self.db, query, &params).await?)
    }

    async fn create(&self, receiving: NewReceiving) -> AppResult<Receiving> {
        let now = Utc::now();
        let active_model = ActiveModel {
            id: Set(Uuid::new_v4()),
            order_number: Set(receiving.order_number),
            supplier_name: Set(receiving.supplier_name),
            product_id: Set(receiving.product_id),
            quantity: Set(receiving.quantity),
            location: Set(receiving.location),
            status: Set(ReceivingStatus::Pending.to_string()),
            expected_date: Set(receiving.expected_date),
            received_date: Set(None),
            note: Set(receiving.note),
            created_by: Set(receiving.created_by),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Receiving::try_from(active_model.insert(&self.db).await?)
    }

    async fn update(&self, id: Uuid, changes: ReceivingChanges) -> AppResult<Receiving> {
        let model = ReceivingEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut active: ActiveModel = model.into();
        if let Some(supplier_name) = changes.supplier_name {
            active.supplier_name = Set(supplier_name);
        }
        if let Some(quantity) = changes.quantity {
            active.quantity = Set(quantity);
        }
        if let Some(location) = changes.location {
            active.location = Set(location);
        }
        if let Some(date) = changes.expected_date {
            active.expected_date = Set(Some(date));
        }
        if let Some(note) = changes.note {
            active.note = Set(Some(note));
        }
        active.updated_at = Set(Utc::now());

        Receiving::try_from(active.update(&self.db).await?)
    }

    async fn count_by_status(&self, status: ReceivingStatus) -> AppResult<u64> {
        Ok(ReceivingEntity::find()
            .filter(receiving::Column::Status.eq(status.as_str()))
            .count(&self.db)
            .await?)
    }
}

/// Receiving row, locked until the transaction ends
pub(crate) async fn find_for_update<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> AppResult<Option<Receiving>> {
    let model = ReceivingEntity::find_by_id(id)
        .lock_exclusive()
        .one(conn)
        .await?;
    opt_into_domain(model)
}

pub(crate) async fn set_status<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
    status: ReceivingStatus,
    received_date: Option<DateTime<Utc>>,
) -> AppResult<Receiving> {
    let mut active = ActiveModel {
        id: Set(id),
        status: Set(status.to_string()),
        updated_at: Set(Utc::now()),
        ..Default::default()
    };
    if received_date.is_some() {
        active.received_date = Set(received_date);
    }
    Receiving::try_from(active.update(conn).await?)
}
