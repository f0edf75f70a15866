//! Product catalog and per-product stock adjustments.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use super::stock::{apply_change, StockChange};
use crate::domain::product::ProductResponse;
use crate::domain::{
    NewProduct, Product, ProductChanges, ProductFilter, StockAdjustment, StockHistory,
};
use crate::errors::{AppError, AppResult};
use crate::infra::UnitOfWork;
use crate::types::{Paginated, PaginationParams};
use crate::with_transaction;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ProductService: Send + Sync {
    async fn create(&self, product: NewProduct) -> AppResult<Product>;

    /// Live product with its total stock
    async fn get(&self, id: Uuid) -> AppResult<ProductResponse>;

    async fn list(
        &self,
        filter: ProductFilter,
        params: PaginationParams,
    ) -> AppResult<Paginated<ProductResponse>>;

    async fn update(&self, id: Uuid, changes: ProductChanges) -> AppResult<Product>;

    /// Soft delete. The SKU stays taken.
    async fn delete(&self, id: Uuid) -> AppResult<()>;

    async fn adjust_stock(
        &self,
        product_id: Uuid,
        adjustment: StockAdjustment,
        actor: Uuid,
    ) -> AppResult<StockHistory>;

    async fn stock_history(
        &self,
        product_id: Uuid,
        params: PaginationParams,
    ) -> AppResult<Paginated<StockHistory>>;
}

pub struct ProductManager<U: UnitOfWork> {
    uow: Arc<U>,
}

impl<U: UnitOfWork> ProductManager<U> {
    pub fn new(uow: Arc<U>) -> Self {
        Self { uow }
    }

    async fn live(&self, id: Uuid) -> AppResult<Product> {
        self.uow
            .products()
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound)
    }

    async fn with_stock(&self, products: Vec<Product>) -> AppResult<Vec<ProductResponse>> {
        let ids = products.iter().map(|p| p.id).collect();
        let stock = self.uow.inventory().stock_by_product(ids).await?;
        Ok(products
            .into_iter()
            .map(|product| ProductResponse {
                stock: stock.get(&product.id).copied().unwrap_or(0),
                product,
            })
            .collect())
    }
}

#[async_trait]
impl<U: UnitOfWork> ProductService for ProductManager<U> {
    async fn create(&self, product: NewProduct) -> AppResult<Product> {
        product.validate()?;
        if self.uow.products().find_by_sku(&product.sku).await?.is_some() {
            return Err(AppError::conflict("SKU"));
        }

        let created = self.uow.products().create(product).await?;
        tracing::info!(product_id = %created.id, sku = %created.sku, "Product created");
        Ok(created)
    }

    async fn get(&self, id: Uuid) -> AppResult<ProductResponse> {
        let product = self.live(id).await?;
        let mut rows = self.with_stock(vec![product]).await?;
        rows.pop().ok_or(AppError::NotFound)
    }

    async fn list(
        &self,
        filter: ProductFilter,
        params: PaginationParams,
    ) -> AppResult<Paginated<ProductResponse>> {
        filter.validate()?;
        let (products, total) = self.uow.products().list(filter, params).await?;
        let rows = self.with_stock(products).await?;
        Ok(Paginated::new(rows, &params, total))
    }

    async fn update(&self, id: Uuid, changes: ProductChanges) -> AppResult<Product> {
        changes.validate()?;
        let product = self.live(id).await?;
        if changes.is_empty() {
            return Ok(product);
        }
        self.uow.products().update(id, changes).await
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.uow.products().delete(id).await?;
        tracing::info!(product_id = %id, "Product deleted");
        Ok(())
    }

    async fn adjust_stock(
        &self,
        product_id: Uuid,
        adjustment: StockAdjustment,
        actor: Uuid,
    ) -> AppResult<StockHistory> {
        adjustment.validate()?;
        self.live(product_id).await?;

        let mut change = StockChange::new(
            product_id,
            adjustment.location,
            adjustment.change_type,
            adjustment.quantity,
        )
        .actor(Some(actor));
        change.reason = adjustment.reason;

        let (_, history) = with_transaction!(self.uow, |ctx| apply_change(&ctx, change).await)?;
        Ok(history)
    }

    async fn stock_history(
        &self,
        product_id: Uuid,
        params: PaginationParams,
    ) -> AppResult<Paginated<StockHistory>> {
        self.live(product_id).await?;
        let (entries, total) = self
            .uow
            .stock_history()
            .list_by_product(product_id, params)
            .await?;
        Ok(Paginated::new(entries, &params, total))
    }
}
