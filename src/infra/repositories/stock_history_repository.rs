//! Stock change audit trail. Records are append-only and written inside
//! the same transaction as the inventory change they describe.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use super::base::{fetch_page, page_into_domain};
use super::entities::stock_history::{self, ActiveModel, Entity as StockHistoryEntity};
use crate::domain::{NewStockHistory, StockHistory};
use crate::errors::AppResult;
use crate::types::PaginationParams;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait StockHistoryRepository: Send + Sync {
    /// Newest first
    async fn list_by_product(
        &self,
        product_id: Uuid,
        params: PaginationParams,
    ) -> AppResult<(Vec<StockHistory>, u64)>;
}

pub struct StockHistoryStore {
    db: DatabaseConnection,
}

impl StockHistoryStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl StockHistoryRepository for StockHistoryStore {
    async fn list_by_product(
        &self,
        product_id: Uuid,
        params: PaginationParams,
    ) -> AppResult<(Vec<StockHistory>, u64)> {
        let query = StockHistoryEntity::find()
            .filter(stock_history::Column::ProductId.eq(product_id))
            .order_by_desc(stock_history::Column::CreatedAt)
            .order_by_desc(stock_history::Column::Id);
        page_into_domain(fetch_page(&self.db, query, &params).await?)
    }
}

pub(crate) async fn insert<C: ConnectionTrait>(
    conn: &C,
    entry: NewStockHistory,
) -> AppResult<StockHistory> {
    let change_amount = entry.change_amount();
    let active_model = ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(entry.product_id),
        location: Set(entry.location),
        previous_stock: Set(entry.previous_stock),
        new_stock: Set(entry.new_stock),
        change_amount: Set(change_amount),
        change_type: Set(entry.change_type.to_string()),
        reason: Set(entry.reason),
        created_by: Set(entry.created_by),
        created_at: Set(chrono::Utc::now()),
    };
    StockHistory::try_from(active_model.insert(conn).await?)
}
