//! Product catalog repository. Deletes are soft.

use async_trait::async_trait;
use sea_orm::sea_query::{Condition, Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, Select, Set,
};
use uuid::Uuid;

use super::base::{fetch_page, into_domain, opt_into_domain, page_into_domain, unique_violation};
use super::entities::product::{self, ActiveModel, Entity as ProductEntity};
use crate::domain::{
    NewProduct, Product, ProductChanges, ProductFilter, ProductSortField, SortDirection,
};
use crate::errors::{AppError, AppResult};
use crate::types::{DateRange, PaginationParams};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Product>>;

    /// Includes deleted products, since SKUs stay reserved after deletion
    async fn find_by_sku(&self, sku: &str) -> AppResult<Option<Product>>;

    async fn find_by_ids(&self, ids: Vec<Uuid>) -> AppResult<Vec<Product>>;

    async fn create(&self, product: NewProduct) -> AppResult<Product>;

    async fn update(&self, id: Uuid, changes: ProductChanges) -> AppResult<Product>;

    async fn delete(&self, id: Uuid) -> AppResult<()>;

    async fn list(
        &self,
        filter: ProductFilter,
        params: PaginationParams,
    ) -> AppResult<(Vec<Product>, u64)>;

    /// Live products created inside `range`, oldest first
    async fn list_created(&self, range: DateRange) -> AppResult<Vec<Product>>;

    async fn count(&self) -> AppResult<u64>;
}

pub struct ProductStore {
    db: DatabaseConnection,
}

impl ProductStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProductRepository for ProductStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Product>> {
        let model = ProductEntity::find_by_id(id)
            .filter(product::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?;
        opt_into_domain(model)
    }

    async fn find_by_sku(&self, sku: &str) -> AppResult<Option<Product>> {
        let model = ProductEntity::find()
            .filter(product::Column::Sku.eq(sku))
            .one(&self.db)
            .await?;
        opt_into_domain(model)
    }

    async fn find_by_ids(&self, ids: Vec<Uuid>) -> AppResult<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let models = ProductEntity::find()
            .filter(product::Column::Id.is_in(ids))
            .all(&self.db)
            .await?;
        into_domain(models)
    }

    async fn create(&self, product: NewProduct) -> AppResult<Product> {
        let now = chrono::Utc::now();
        let active_model = ActiveModel {
            id: Set(Uuid::new_v4()),
            sku: Set(product.sku),
            name: Set(product.name),
            description: Set(product.description),
            category: Set(product.category.to_string()),
            price: Set(product.price),
            unit: Set(product.unit),
            status: Set(product.status.to_string()),
            image_url: Set(product.image_url),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        };

        let model = active_model
            .insert(&self.db)
            .await
            .map_err(unique_violation("SKU"))?;
        Product::try_from(model)
    }

    async fn update(&self, id: Uuid, changes: ProductChanges) -> AppResult<Product> {
        let model = ProductEntity::find_by_id(id)
            .filter(product::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut active: ActiveModel = model.into();
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(description) = changes.description {
            active.description = Set(Some(description));
        }
        if let Some(category) = changes.category {
            active.category = Set(category.to_string());
        }
        if let Some(price) = changes.price {
            active.price = Set(price);
        }
        if let Some(unit) = changes.unit {
            active.unit = Set(unit);
        }
        if let Some(status) = changes.status {
            active.status = Set(status.to_string());
        }
        if let Some(image_url) = changes.image_url {
            active.image_url = Set(Some(image_url));
        }
        active.updated_at = Set(chrono::Utc::now());

        let model = active.update(&self.db).await?;
        Product::try_from(model)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let model = ProductEntity::find_by_id(id)
            .filter(product::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut active: ActiveModel = model.into();
        let now = chrono::Utc::now();
        active.deleted_at = Set(Some(now));
        active.updated_at = Set(now);
        active.update(&self.db).await?;
        Ok(())
    }

    async fn list(
        &self,
        filter: ProductFilter,
        params: PaginationParams,
    ) -> AppResult<(Vec<Product>, u64)> {
        page_into_domain(fetch_page(&self.db, filtered(&filter), &params).await?)
    }

    async fn list_created(&self, range: DateRange) -> AppResult<Vec<Product>> {
        let mut query = ProductEntity::find()
            .filter(product::Column::DeletedAt.is_null())
            .order_by_asc(product::Column::CreatedAt);
        if let Some(start) = range.start() {
            query = query.filter(product::Column::CreatedAt.gte(start));
        }
        if let Some(end) = range.end_exclusive() {
            query = query.filter(product::Column::CreatedAt.lt(end));
        }
        into_domain(query.all(&self.db).await?)
    }

    async fn count(&self) -> AppResult<u64> {
        Ok(ProductEntity::find()
            .filter(product::Column::DeletedAt.is_null())
            .count(&self.db)
            .await?)
    }
}

fn filtered(filter: &ProductFilter) -> Select<ProductEntity> {
    let mut query = ProductEntity::find().filter(product::Column::DeletedAt.is_null());

    if let Some(category) = filter.category {
        query = query.filter(product::Column::Category.eq(category.as_str()));
    }
    if let Some(status) = filter.status {
        query = query.filter(product::Column::Status.eq(status.as_str()));
    }
    if let Some(min) = filter.min_price {
        query = query.filter(product::Column::Price.gte(min));
    }
    if let Some(max) = filter.max_price {
        query = query.filter(product::Column::Price.lte(max));
    }
    if let Some(term) = filter.search_term() {
        let pattern = format!("%{}%", term.to_lowercase());
        query = query.filter(
            Condition::any()
                .add(lower(product::Column::Name).like(pattern.clone()))
                .add(lower(product::Column::Sku).like(pattern.clone()))
                .add(lower(product::Column::Description).like(pattern)),
        );
    }

    let column = match filter.sort_by {
        ProductSortField::Name => product::Column::Name,
        ProductSortField::Category => product::Column::Category,
        ProductSortField::Price => product::Column::Price,
        ProductSortField::CreatedAt => product::Column::CreatedAt,
    };
    let order = match filter.sort_dir {
        SortDirection::Asc => Order::Asc,
        SortDirection::Desc => Order::Desc,
    };

    query
        .order_by(column, order)
        .order_by_asc(product::Column::Id)
}

fn lower(column: product::Column) -> Expr {
    Expr::expr(Func::lower(Expr::col(column)))
}
