//! Product catalog and stock history handlers.

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::get,
    Extension, Router,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::api::extractors::{ValidatedJson, ValidatedQuery};
use crate::api::middleware::{require_role, CurrentUser};
use crate::api::AppState;
use crate::domain::product::SKU_PATTERN;
use crate::domain::{
    NewProduct, Product, ProductCategory, ProductChanges, ProductFilter, ProductResponse,
    ProductSortField, ProductStatus, SortDirection, StockAdjustment, StockChangeType,
    StockHistory, UserRole,
};
use crate::errors::AppResult;
use crate::types::{Created, NoContent, Paginated, PaginationParams};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    /// Upper-case letters, digits and dashes
    #[validate(regex(path = *SKU_PATTERN, message = "SKU must be 3-32 characters of A-Z, 0-9 or '-'"))]
    #[schema(example = "GT-SENCHA-100")]
    pub sku: String,
    #[validate(length(min = 1, max = 100))]
    #[schema(example = "Sencha Superior")]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub category: ProductCategory,
    #[validate(range(exclusive_min = 0.0, max = 1_000_000.0))]
    #[schema(example = 24.5)]
    pub price: f64,
    #[validate(length(min = 1, max = 10))]
    #[schema(example = "kg")]
    pub unit: String,
    pub status: Option<ProductStatus>,
    #[validate(url)]
    pub image_url: Option<String>,
}

impl From<CreateProductRequest> for NewProduct {
    fn from(req: CreateProductRequest) -> Self {
        Self {
            sku: req.sku,
            name: req.name,
            description: req.description,
            category: req.category,
            price: req.price,
            unit: req.unit,
            status: req.status.unwrap_or(ProductStatus::Active),
            image_url: req.image_url,
        }
    }
}

/// Partial update; omitted fields are left unchanged
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub category: Option<ProductCategory>,
    #[validate(range(exclusive_min = 0.0, max = 1_000_000.0))]
    pub price: Option<f64>,
    #[validate(length(min = 1, max = 10))]
    pub unit: Option<String>,
    pub status: Option<ProductStatus>,
    #[validate(url)]
    pub image_url: Option<String>,
}

impl From<UpdateProductRequest> for ProductChanges {
    fn from(req: UpdateProductRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            category: req.category,
            price: req.price,
            unit: req.unit,
            status: req.status,
            image_url: req.image_url,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductListQuery {
    pub category: Option<ProductCategory>,
    pub status: Option<ProductStatus>,
    /// Matches name, SKU or description
    #[validate(length(max = 100))]
    pub search: Option<String>,
    #[validate(range(min = 0.0))]
    pub min_price: Option<f64>,
    #[validate(range(min = 0.0))]
    pub max_price: Option<f64>,
    pub sort_by: Option<ProductSortField>,
    pub sort_dir: Option<SortDirection>,
}

impl From<ProductListQuery> for ProductFilter {
    fn from(query: ProductListQuery) -> Self {
        Self {
            category: query.category,
            status: query.status,
            search: query.search,
            min_price: query.min_price,
            max_price: query.max_price,
            sort_by: query.sort_by.unwrap_or_default(),
            sort_dir: query.sort_dir.unwrap_or_default(),
        }
    }
}

/// Manual stock change at one location
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AdjustStockRequest {
    #[validate(length(min = 1, max = 100))]
    #[schema(example = "warehouse-a")]
    pub location: String,
    /// `in` adds, `out` subtracts, `adjustment` sets the absolute count
    #[serde(rename = "type")]
    pub change_type: StockChangeType,
    #[validate(range(min = 0))]
    pub quantity: i32,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

impl From<AdjustStockRequest> for StockAdjustment {
    fn from(req: AdjustStockRequest) -> Self {
        Self {
            location: req.location,
            change_type: req.change_type,
            quantity: req.quantity,
            reason: req.reason,
        }
    }
}

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route(
            "/:id/stock-history",
            get(list_stock_history).post(adjust_stock),
        )
}

#[utoipa::path(
    get,
    path = "/products",
    tag = "Products",
    security(("bearer_auth" = [])),
    params(PaginationParams, ProductListQuery),
    responses(
        (status = 200, description = "Paginated products with total stock"),
        (status = 400, description = "Invalid filter")
    )
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
    ValidatedQuery(query): ValidatedQuery<ProductListQuery>,
) -> AppResult<Json<Paginated<ProductResponse>>> {
    let products = state.product_service.list(query.into(), params).await?;
    Ok(Json(products))
}

/// Create a product (manager or above)
#[utoipa::path(
    post,
    path = "/products",
    tag = "Products",
    security(("bearer_auth" = [])),
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = Product),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "SKU already exists")
    )
)]
pub async fn create_product(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    ValidatedJson(payload): ValidatedJson<CreateProductRequest>,
) -> AppResult<Created<Product>> {
    require_role(&current_user, UserRole::Manager)?;

    let product = state.product_service.create(payload.into()).await?;
    Ok(Created(product))
}

#[utoipa::path(
    get,
    path = "/products/{id}",
    tag = "Products",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product with total stock", body = ProductResponse),
        (status = 404, description = "Product not found")
    )
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ProductResponse>> {
    let product = state.product_service.get(id).await?;
    Ok(Json(product))
}

#[utoipa::path(
    put,
    path = "/products/{id}",
    tag = "Products",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = Product),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Product not found")
    )
)]
pub async fn update_product(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateProductRequest>,
) -> AppResult<Json<Product>> {
    require_role(&current_user, UserRole::Manager)?;

    let product = state.product_service.update(id, payload.into()).await?;
    Ok(Json(product))
}

/// Soft delete
#[utoipa::path(
    delete,
    path = "/products/{id}",
    tag = "Products",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Product not found")
    )
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> AppResult<NoContent> {
    require_role(&current_user, UserRole::Manager)?;

    state.product_service.delete(id).await?;
    Ok(NoContent)
}

/// Stock changes for a product, newest first
#[utoipa::path(
    get,
    path = "/products/{id}/stock-history",
    tag = "Products",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Product ID"), PaginationParams),
    responses(
        (status = 200, description = "Paginated stock history"),
        (status = 404, description = "Product not found")
    )
)]
pub async fn list_stock_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<Paginated<StockHistory>>> {
    let history = state.product_service.stock_history(id, params).await?;
    Ok(Json(history))
}

/// Adjust stock and record the change (operator or above)
#[utoipa::path(
    post,
    path = "/products/{id}/stock-history",
    tag = "Products",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = AdjustStockRequest,
    responses(
        (status = 201, description = "Stock adjusted", body = StockHistory),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Product or stock row not found"),
        (status = 409, description = "Insufficient stock")
    )
)]
pub async fn adjust_stock(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<AdjustStockRequest>,
) -> AppResult<Created<StockHistory>> {
    require_role(&current_user, UserRole::Operator)?;

    let entry = state
        .product_service
        .adjust_stock(id, payload.into(), current_user.id)
        .await?;

    Ok(Created(entry))
}
