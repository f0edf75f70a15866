//! Deliveries and their tracking trail.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Condition, Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use super::base::{fetch_page, into_domain, opt_into_domain, page_into_domain};
use super::entities::delivery::{self, ActiveModel, Entity as DeliveryEntity};
use super::entities::delivery_tracking::{
    self, ActiveModel as TrackingActiveModel, Entity as TrackingEntity,
};
use crate::domain::report::StatusCount;
use crate::domain::{
    Delivery, DeliveryChanges, DeliveryFilter, DeliveryStatus, DeliveryTracking, NewDelivery,
    NewTracking,
};
use crate::errors::{AppError, AppResult};
use crate::types::{DateRange, PaginationParams};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait DeliveryRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Delivery>>;

    async fn find_by_order_number(&self, order_number: &str) -> AppResult<Option<Delivery>>;

    async fn list(
        &self,
        filter: DeliveryFilter,
        params: PaginationParams,
    ) -> AppResult<(Vec<Delivery>, u64)>;

    /// Deliveries created inside `range`, for export
    async fn list_created(&self, range: DateRange) -> AppResult<Vec<Delivery>>;

    async fn list_by_status(&self, status: DeliveryStatus) -> AppResult<Vec<Delivery>>;

    /// Insert without touching inventory
    async fn create(&self, delivery: NewDelivery) -> AppResult<Delivery>;

    async fn update(&self, id: Uuid, changes: DeliveryChanges) -> AppResult<Delivery>;

    async fn count_by_status(&self) -> AppResult<Vec<StatusCount>>;

    /// Delivered with `start <= actual_delivery_date < end`
    async fn delivered_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<Delivery>>;

    async fn add_tracking(&self, tracking: NewTracking) -> AppResult<DeliveryTracking>;

    /// Oldest first
    async fn list_tracking(&self, delivery_id: Uuid) -> AppResult<Vec<DeliveryTracking>>;
}

pub struct DeliveryStore {
    db: DatabaseConnection,
}

impl DeliveryStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DeliveryRepository for DeliveryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Delivery>> {
        opt_into_domain(DeliveryEntity::find_by_id(id).one(&self.db).await?)
    }

    async fn find_by_order_number(&self, order_number: &str) -> AppResult<Option<Delivery>> {
        let model = DeliveryEntity::find()
            .filter(delivery::Column::OrderNumber.eq(order_number))
            .one(&self.db)
            .await?;
        opt_into_domain(model)
    }

    async fn list(
        &self,
        filter: DeliveryFilter,
        params: PaginationParams,
    ) -> AppResult<(Vec<Delivery>, u64)> {
        let mut query = DeliveryEntity::find()
            .order_by_desc(delivery::Column::CreatedAt)
            .order_by_desc(delivery::Column::Id);

        if let Some(status) = filter.status {
            query = query.filter(delivery::Column::Status.eq(status.as_str()));
        }
        if let Some(term) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", term.to_lowercase());
            query = query.filter(
                Condition::any()
                    .add(
                        Expr::expr(Func::lower(Expr::col(delivery::Column::OrderNumber)))
                            .like(pattern.clone()),
                    )
                    .add(
                        Expr::expr(Func::lower(Expr::col(delivery::Column::CustomerName)))
                            .like(pattern),
                    ),
            );
        }
        if let Some(start) = filter.estimated.start_date {
            query = query.filter(delivery::Column::EstimatedDeliveryDate.gte(start));
        }
        if let Some(end) = filter.estimated.end_date {
            query = query.filter(delivery::Column::EstimatedDeliveryDate.lte(end));
        }

        page_into_domain(fetch_page(&self.db, query, &params).await?)
    }

    async fn list_created(&self, range: DateRange) -> AppResult<Vec<Delivery>> {
        let mut query = DeliveryEntity::find().order_by_asc(delivery::Column::CreatedAt);
        if let Some(start) = range.start() {
            query = query.filter(delivery::Column::CreatedAt.gte(start));
        }
        if let Some(end) = range.end_exclusive() {
            query = query.filter(delivery::Column::CreatedAt.lt(end));
        }
        into_domain(query.all(&self.db).await?)
    }

    async fn list_by_status(&self, status: DeliveryStatus) -> AppResult<Vec<Delivery>> {
        let models = DeliveryEntity::find()
            .filter(delivery::Column::Status.eq(status.as_str()))
            .order_by_asc(delivery::Column::EstimatedDeliveryDate)
            .all(&self.db)
            .await?;
        into_domain(models)
    }

    async fn create(&self, delivery: NewDelivery) -> AppResult<Delivery> {
        insert(&self.db, delivery).await
    }

    async fn update(&self, id: Uuid, changes: DeliveryChanges) -> AppResult<Delivery> {
        let model = DeliveryEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut active: ActiveModel = model.into();
        if let Some(name) = changes.customer_name {
            active.customer_name = Set(name);
        }
        if let Some(address) = changes.customer_address {
            active.customer_address = Set(address);
        }
        if let Some(phone) = changes.customer_phone {
            active.customer_phone = Set(phone);
        }
        if let Some(date) = changes.estimated_delivery_date {
            active.estimated_delivery_date = Set(Some(date));
        }
        if let Some(note) = changes.note {
            active.note = Set(Some(note));
        }
        active.updated_at = Set(Utc::now());

        Delivery::try_from(active.update(&self.db).await?)
    }

    async fn count_by_status(&self) -> AppResult<Vec<StatusCount>> {
        let rows: Vec<(String, i64)> = DeliveryEntity::find()
            .select_only()
            .column(delivery::Column::Status)
            .column_as(delivery::Column::Id.count(), "count")
            .group_by(delivery::Column::Status)
            .order_by_asc(delivery::Column::Status)
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(status, count)| StatusCount {
                status,
                count: count.max(0) as u64,
            })
            .collect())
    }

    async fn delivered_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<Delivery>> {
        let models = DeliveryEntity::find()
            .filter(delivery::Column::Status.eq(DeliveryStatus::Delivered.as_str()))
            .filter(delivery::Column::ActualDeliveryDate.gte(start))
            .filter(delivery::Column::ActualDeliveryDate.lt(end))
            .order_by_asc(delivery::Column::ActualDeliveryDate)
            .all(&self.db)
            .await?;
        into_domain(models)
    }

    async fn add_tracking(&self, tracking: NewTracking) -> AppResult<DeliveryTracking> {
        let active_model = TrackingActiveModel {
            id: Set(Uuid::new_v4()),
            delivery_id: Set(tracking.delivery_id),
            location: Set(tracking.location),
            status: Set(tracking.status),
            notes: Set(tracking.notes),
            created_at: Set(Utc::now()),
        };
        Ok(DeliveryTracking::from(active_model.insert(&self.db).await?))
    }

    async fn list_tracking(&self, delivery_id: Uuid) -> AppResult<Vec<DeliveryTracking>> {
        let models = TrackingEntity::find()
            .filter(delivery_tracking::Column::DeliveryId.eq(delivery_id))
            .order_by_asc(delivery_tracking::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(DeliveryTracking::from).collect())
    }
}

/// Delivery row, locked until the transaction ends
pub(crate) async fn find_for_update<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> AppResult<Option<Delivery>> {
    let model = DeliveryEntity::find_by_id(id)
        .lock_exclusive()
        .one(conn)
        .await?;
    opt_into_domain(model)
}

pub(crate) async fn insert<C: ConnectionTrait>(
    conn: &C,
    delivery: NewDelivery,
) -> AppResult<Delivery> {
    let now = Utc::now();
    let active_model = ActiveModel {
        id: Set(Uuid::new_v4()),
        order_number: Set(delivery.order_number),
        product_id: Set(delivery.product_id),
        quantity: Set(delivery.quantity),
        from_location: Set(delivery.from_location),
        customer_name: Set(delivery.customer_name),
        customer_address: Set(delivery.customer_address),
        customer_phone: Set(delivery.customer_phone),
        status: Set(delivery.status.to_string()),
        estimated_delivery_date: Set(delivery.estimated_delivery_date),
        actual_delivery_date: Set(None),
        note: Set(delivery.note),
        stock_reserved: Set(delivery.stock_reserved),
        created_by: Set(delivery.created_by),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Delivery::try_from(active_model.insert(conn).await?)
}

pub(crate) async fn set_status<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
    status: DeliveryStatus,
    actual_delivery_date: Option<DateTime<Utc>>,
) -> AppResult<Delivery> {
    let mut active = ActiveModel {
        id: Set(id),
        status: Set(status.to_string()),
        updated_at: Set(Utc::now()),
        ..Default::default()
    };
    if actual_delivery_date.is_some() {
        active.actual_delivery_date = Set(actual_delivery_date);
    }
    Delivery::try_from(active.update(conn).await?)
}
