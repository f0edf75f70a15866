//! Delivery (shipping) handlers.

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post, put},
    Extension, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::api::extractors::{ValidatedJson, ValidatedQuery};
use crate::api::middleware::{require_role, CurrentUser};
use crate::api::AppState;
use crate::domain::{
    Delivery, DeliveryChanges, DeliveryFilter, DeliveryStatus, DeliveryTracking, NewDelivery,
    NewTracking, UserRole,
};
use crate::errors::AppResult;
use crate::types::{Created, DateRange, Paginated, PaginationParams};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateDeliveryRequest {
    #[validate(length(min = 1, max = 50))]
    #[schema(example = "SO-2024-0412")]
    pub order_number: String,
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
    /// Location the stock is reserved from
    #[validate(length(min = 1, max = 100))]
    pub from_location: String,
    #[validate(length(min = 1, max = 100))]
    pub customer_name: String,
    #[validate(length(min = 1, max = 255))]
    pub customer_address: String,
    #[validate(length(min = 1, max = 20))]
    #[schema(example = "+81-3-1234-5678")]
    pub customer_phone: String,
    pub estimated_delivery_date: Option<NaiveDate>,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

impl CreateDeliveryRequest {
    fn into_new(self, created_by: Uuid) -> NewDelivery {
        NewDelivery {
            order_number: self.order_number,
            product_id: self.product_id,
            quantity: self.quantity,
            from_location: self.from_location,
            customer_name: self.customer_name,
            customer_address: self.customer_address,
            customer_phone: self.customer_phone,
            estimated_delivery_date: self.estimated_delivery_date,
            note: self.note,
            status: DeliveryStatus::Pending,
            stock_reserved: true,
            created_by: Some(created_by),
        }
    }
}

/// Detail edits, allowed while pending or scheduled
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateDeliveryRequest {
    #[validate(length(min = 1, max = 100))]
    pub customer_name: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub customer_address: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub customer_phone: Option<String>,
    pub estimated_delivery_date: Option<NaiveDate>,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

impl From<UpdateDeliveryRequest> for DeliveryChanges {
    fn from(req: UpdateDeliveryRequest) -> Self {
        Self {
            customer_name: req.customer_name,
            customer_address: req.customer_address,
            customer_phone: req.customer_phone,
            estimated_delivery_date: req.estimated_delivery_date,
            note: req.note,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DeliveryStatusRequest {
    pub status: DeliveryStatus,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TrackingRequest {
    #[validate(length(min = 1, max = 100))]
    #[schema(example = "Osaka hub")]
    pub location: String,
    /// Free-form carrier status
    #[validate(length(min = 1, max = 50))]
    #[schema(example = "arrived_at_hub")]
    pub status: String,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DeliveryListQuery {
    pub status: Option<DeliveryStatus>,
    /// Matches order number or customer name
    #[validate(length(max = 100))]
    pub search: Option<String>,
    /// Estimated delivery date, inclusive
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl From<DeliveryListQuery> for DeliveryFilter {
    fn from(query: DeliveryListQuery) -> Self {
        Self {
            status: query.status,
            search: query.search,
            estimated: DateRange::new(query.start_date, query.end_date),
        }
    }
}

pub fn delivery_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_deliveries).post(create_delivery))
        .route("/:id", get(get_delivery).put(update_delivery))
        .route("/:id/status", put(update_delivery_status))
        .route("/:id/complete", post(complete_delivery))
        .route("/:id/tracking", get(list_tracking).post(add_tracking))
}

/// Create a delivery and reserve its stock (manager or above)
#[utoipa::path(
    post,
    path = "/deliveries",
    tag = "Deliveries",
    security(("bearer_auth" = [])),
    request_body = CreateDeliveryRequest,
    responses(
        (status = 201, description = "Delivery created", body = Delivery),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Product or stock row not found"),
        (status = 409, description = "Insufficient stock")
    )
)]
pub async fn create_delivery(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    ValidatedJson(payload): ValidatedJson<CreateDeliveryRequest>,
) -> AppResult<Created<Delivery>> {
    require_role(&current_user, UserRole::Manager)?;

    let delivery = state
        .delivery_service
        .create(payload.into_new(current_user.id))
        .await?;

    Ok(Created(delivery))
}

#[utoipa::path(
    get,
    path = "/deliveries",
    tag = "Deliveries",
    security(("bearer_auth" = [])),
    params(PaginationParams, DeliveryListQuery),
    responses(
        (status = 200, description = "Paginated deliveries"),
        (status = 400, description = "Invalid filter")
    )
)]
pub async fn list_deliveries(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
    ValidatedQuery(query): ValidatedQuery<DeliveryListQuery>,
) -> AppResult<Json<Paginated<Delivery>>> {
    let deliveries = state.delivery_service.list(query.into(), params).await?;
    Ok(Json(deliveries))
}

#[utoipa::path(
    get,
    path = "/deliveries/{id}",
    tag = "Deliveries",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Delivery ID")),
    responses(
        (status = 200, description = "Delivery", body = Delivery),
        (status = 404, description = "Delivery not found")
    )
)]
pub async fn get_delivery(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Delivery>> {
    let delivery = state.delivery_service.get(id).await?;
    Ok(Json(delivery))
}

#[utoipa::path(
    put,
    path = "/deliveries/{id}",
    tag = "Deliveries",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Delivery ID")),
    request_body = UpdateDeliveryRequest,
    responses(
        (status = 200, description = "Delivery updated", body = Delivery),
        (status = 400, description = "Delivery is no longer editable"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Delivery not found")
    )
)]
pub async fn update_delivery(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateDeliveryRequest>,
) -> AppResult<Json<Delivery>> {
    require_role(&current_user, UserRole::Manager)?;

    let delivery = state.delivery_service.update(id, payload.into()).await?;
    Ok(Json(delivery))
}

/// Move a delivery to its next status
#[utoipa::path(
    put,
    path = "/deliveries/{id}/status",
    tag = "Deliveries",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Delivery ID")),
    request_body = DeliveryStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = Delivery),
        (status = 400, description = "Transition not allowed"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Delivery not found")
    )
)]
pub async fn update_delivery_status(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DeliveryStatusRequest>,
) -> AppResult<Json<Delivery>> {
    require_role(&current_user, UserRole::Operator)?;

    let delivery = state
        .delivery_service
        .update_status(id, payload.status, Some(current_user.id))
        .await?;

    Ok(Json(delivery))
}

/// Mark an in-transit delivery as delivered
#[utoipa::path(
    post,
    path = "/deliveries/{id}/complete",
    tag = "Deliveries",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Delivery ID")),
    responses(
        (status = 200, description = "Delivery completed", body = Delivery),
        (status = 400, description = "Delivery is not in transit"),
        (status = 404, description = "Delivery not found")
    )
)]
pub async fn complete_delivery(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Delivery>> {
    require_role(&current_user, UserRole::Operator)?;

    let delivery = state
        .delivery_service
        .complete(id, Some(current_user.id))
        .await?;

    Ok(Json(delivery))
}

#[utoipa::path(
    post,
    path = "/deliveries/{id}/tracking",
    tag = "Deliveries",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Delivery ID")),
    request_body = TrackingRequest,
    responses(
        (status = 201, description = "Tracking entry added", body = DeliveryTracking),
        (status = 400, description = "Delivery already finished"),
        (status = 404, description = "Delivery not found")
    )
)]
pub async fn add_tracking(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<TrackingRequest>,
) -> AppResult<Created<DeliveryTracking>> {
    require_role(&current_user, UserRole::Operator)?;

    let tracking = NewTracking {
        delivery_id: id,
        location: payload.location,
        status: payload.status,
        notes: payload.notes,
    };
    let entry = state
        .delivery_service
        .add_tracking(tracking, current_user.id)
        .await?;

    Ok(Created(entry))
}

/// Tracking history, oldest first
#[utoipa::path(
    get,
    path = "/deliveries/{id}/tracking",
    tag = "Deliveries",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Delivery ID")),
    responses(
        (status = 200, description = "Tracking entries", body = [DeliveryTracking]),
        (status = 404, description = "Delivery not found")
    )
)]
pub async fn list_tracking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<DeliveryTracking>>> {
    let entries = state.delivery_service.list_tracking(id).await?;
    Ok(Json(entries))
}
