//! Inventory, transfer and availability handlers.
//!
//! Reads are open to every role. Writes need operator, deletes manager.

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
    Extension, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::api::extractors::{ValidatedJson, ValidatedQuery};
use crate::api::middleware::{require_role, CurrentUser};
use crate::api::AppState;
use crate::domain::{
    Availability, Inventory, InventoryChanges, InventoryFilter, InventoryMovement,
    InventoryStatus, MovementType, NewInventory, Transfer, UserRole,
};
use crate::errors::AppResult;
use crate::types::{Created, NoContent, Paginated, PaginationParams};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateInventoryRequest {
    pub product_id: Uuid,
    #[validate(length(min = 1, max = 100))]
    #[schema(example = "warehouse-a")]
    pub location: String,
    #[validate(range(min = 0))]
    pub quantity: i32,
    /// Derived from the quantity when omitted
    pub status: Option<InventoryStatus>,
}

impl From<CreateInventoryRequest> for NewInventory {
    fn from(req: CreateInventoryRequest) -> Self {
        Self {
            product_id: req.product_id,
            status: req
                .status
                .unwrap_or_else(|| InventoryStatus::for_new_row(req.quantity)),
            location: req.location,
            quantity: req.quantity,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateInventoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub location: Option<String>,
    #[validate(range(min = 0))]
    pub quantity: Option<i32>,
    pub status: Option<InventoryStatus>,
}

impl From<UpdateInventoryRequest> for InventoryChanges {
    fn from(req: UpdateInventoryRequest) -> Self {
        Self {
            location: req.location,
            quantity: req.quantity,
            status: req.status,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct InventoryListQuery {
    pub product_id: Option<Uuid>,
    #[validate(length(max = 100))]
    pub location: Option<String>,
    pub status: Option<InventoryStatus>,
}

impl From<InventoryListQuery> for InventoryFilter {
    fn from(query: InventoryListQuery) -> Self {
        Self {
            product_id: query.product_id,
            location: query.location,
            status: query.status,
        }
    }
}

/// Move stock between two locations
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TransferRequest {
    pub product_id: Uuid,
    #[validate(length(min = 1, max = 100))]
    pub from_location: String,
    #[validate(length(min = 1, max = 100))]
    pub to_location: String,
    #[validate(range(min = 1))]
    pub quantity: i32,
    /// Defaults to `transfer`
    pub movement_type: Option<MovementType>,
    #[validate(length(max = 100))]
    pub reference_number: Option<String>,
    pub moved_at: Option<DateTime<Utc>>,
}

impl From<TransferRequest> for Transfer {
    fn from(req: TransferRequest) -> Self {
        Self {
            product_id: req.product_id,
            from_location: req.from_location,
            to_location: req.to_location,
            quantity: req.quantity,
            movement_type: req.movement_type.unwrap_or(MovementType::Transfer),
            reference_number: req.reference_number,
            moved_at: req.moved_at,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MovementQuery {
    pub product_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AvailabilityQuery {
    pub product_id: Uuid,
    #[validate(length(min = 1, max = 100))]
    pub location: String,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

#[derive(Debug, Default, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LowStockQuery {
    /// Defaults to the configured low stock threshold
    #[validate(range(min = 1))]
    pub threshold: Option<i32>,
}

pub fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_inventory).post(create_inventory))
        .route("/transfer", post(transfer_stock))
        .route("/movements", get(list_movements))
        .route("/availability", get(check_availability))
        .route("/low-stock", get(low_stock))
        .route("/product/:product_id", get(inventory_by_product))
        .route("/location/:location", get(inventory_by_location))
        .route(
            "/:id",
            get(get_inventory)
                .put(update_inventory)
                .delete(delete_inventory),
        )
}

#[utoipa::path(
    get,
    path = "/inventory",
    tag = "Inventory",
    security(("bearer_auth" = [])),
    params(PaginationParams, InventoryListQuery),
    responses((status = 200, description = "Paginated inventory rows"))
)]
pub async fn list_inventory(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
    ValidatedQuery(query): ValidatedQuery<InventoryListQuery>,
) -> AppResult<Json<Paginated<Inventory>>> {
    let rows = state.inventory_service.list(query.into(), params).await?;
    Ok(Json(rows))
}

#[utoipa::path(
    post,
    path = "/inventory",
    tag = "Inventory",
    security(("bearer_auth" = [])),
    request_body = CreateInventoryRequest,
    responses(
        (status = 201, description = "Inventory row created", body = Inventory),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Product not found"),
        (status = 409, description = "Row already exists for product and location")
    )
)]
pub async fn create_inventory(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    ValidatedJson(payload): ValidatedJson<CreateInventoryRequest>,
) -> AppResult<Created<Inventory>> {
    require_role(&current_user, UserRole::Operator)?;

    let row = state.inventory_service.create(payload.into()).await?;
    Ok(Created(row))
}

#[utoipa::path(
    get,
    path = "/inventory/{id}",
    tag = "Inventory",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Inventory ID")),
    responses(
        (status = 200, description = "Inventory row", body = Inventory),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_inventory(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Inventory>> {
    let row = state.inventory_service.get(id).await?;
    Ok(Json(row))
}

#[utoipa::path(
    put,
    path = "/inventory/{id}",
    tag = "Inventory",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Inventory ID")),
    request_body = UpdateInventoryRequest,
    responses(
        (status = 200, description = "Inventory row updated", body = Inventory),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_inventory(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateInventoryRequest>,
) -> AppResult<Json<Inventory>> {
    require_role(&current_user, UserRole::Operator)?;

    let row = state.inventory_service.update(id, payload.into()).await?;
    Ok(Json(row))
}

#[utoipa::path(
    delete,
    path = "/inventory/{id}",
    tag = "Inventory",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Inventory ID")),
    responses(
        (status = 204, description = "Inventory row deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_inventory(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> AppResult<NoContent> {
    require_role(&current_user, UserRole::Manager)?;

    state.inventory_service.delete(id).await?;
    Ok(NoContent)
}

#[utoipa::path(
    get,
    path = "/inventory/product/{product_id}",
    tag = "Inventory",
    security(("bearer_auth" = [])),
    params(("product_id" = Uuid, Path, description = "Product ID")),
    responses((status = 200, description = "Rows for the product", body = [Inventory]))
)]
pub async fn inventory_by_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Vec<Inventory>>> {
    let rows = state.inventory_service.by_product(product_id).await?;
    Ok(Json(rows))
}

#[utoipa::path(
    get,
    path = "/inventory/location/{location}",
    tag = "Inventory",
    security(("bearer_auth" = [])),
    params(("location" = String, Path, description = "Location name")),
    responses((status = 200, description = "Rows at the location", body = [Inventory]))
)]
pub async fn inventory_by_location(
    State(state): State<AppState>,
    Path(location): Path<String>,
) -> AppResult<Json<Vec<Inventory>>> {
    let rows = state.inventory_service.by_location(location).await?;
    Ok(Json(rows))
}

/// Move stock between locations (operator or above)
#[utoipa::path(
    post,
    path = "/inventory/transfer",
    tag = "Inventory",
    security(("bearer_auth" = [])),
    request_body = TransferRequest,
    responses(
        (status = 201, description = "Movement recorded", body = InventoryMovement),
        (status = 400, description = "Validation error"),
        (status = 404, description = "No stock at the source location"),
        (status = 409, description = "Insufficient stock")
    )
)]
pub async fn transfer_stock(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    ValidatedJson(payload): ValidatedJson<TransferRequest>,
) -> AppResult<Created<InventoryMovement>> {
    require_role(&current_user, UserRole::Operator)?;

    let movement = state
        .inventory_service
        .transfer(payload.into(), current_user.id)
        .await?;

    Ok(Created(movement))
}

#[utoipa::path(
    get,
    path = "/inventory/movements",
    tag = "Inventory",
    security(("bearer_auth" = [])),
    params(PaginationParams, MovementQuery),
    responses((status = 200, description = "Paginated movements, newest first"))
)]
pub async fn list_movements(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
    Query(query): Query<MovementQuery>,
) -> AppResult<Json<Paginated<InventoryMovement>>> {
    let movements = state
        .inventory_service
        .list_movements(query.product_id, params)
        .await?;

    Ok(Json(movements))
}

#[utoipa::path(
    get,
    path = "/inventory/availability",
    tag = "Inventory",
    security(("bearer_auth" = [])),
    params(AvailabilityQuery),
    responses((status = 200, description = "Availability", body = Availability))
)]
pub async fn check_availability(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<AvailabilityQuery>,
) -> AppResult<Json<Availability>> {
    let availability = state
        .inventory_service
        .check_availability(query.product_id, query.location, query.quantity)
        .await?;

    Ok(Json(availability))
}

#[utoipa::path(
    get,
    path = "/inventory/low-stock",
    tag = "Inventory",
    security(("bearer_auth" = [])),
    params(LowStockQuery),
    responses((status = 200, description = "Rows below the threshold", body = [Inventory]))
)]
pub async fn low_stock(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<LowStockQuery>,
) -> AppResult<Json<Vec<Inventory>>> {
    let rows = state.inventory_service.low_stock(query.threshold).await?;
    Ok(Json(rows))
}
