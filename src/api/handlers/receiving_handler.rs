//! Inbound receiving handlers. Writes need the operator role.

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, put},
    Extension, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::{require_role, CurrentUser};
use crate::api::AppState;
use crate::domain::{
    NewReceiving, Receiving, ReceivingChanges, ReceivingFilter, ReceivingStatus, UserRole,
};
use crate::errors::AppResult;
use crate::types::{Created, Paginated, PaginationParams};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateReceivingRequest {
    #[validate(length(min = 1, max = 50))]
    #[schema(example = "PO-2024-0097")]
    pub order_number: String,
    #[validate(length(min = 1, max = 100))]
    #[schema(example = "Uji Tea Farm")]
    pub supplier_name: String,
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
    /// Where the goods are put away on receipt
    #[validate(length(min = 1, max = 100))]
    pub location: String,
    pub expected_date: Option<NaiveDate>,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateReceivingRequest {
    #[validate(length(min = 1, max = 100))]
    pub supplier_name: Option<String>,
    #[validate(range(min = 1))]
    pub quantity: Option<i32>,
    #[validate(length(min = 1, max = 100))]
    pub location: Option<String>,
    pub expected_date: Option<NaiveDate>,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

impl From<UpdateReceivingRequest> for ReceivingChanges {
    fn from(req: UpdateReceivingRequest) -> Self {
        Self {
            supplier_name: req.supplier_name,
            quantity: req.quantity,
            location: req.location,
            expected_date: req.expected_date,
            note: req.note,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReceivingStatusRequest {
    pub status: ReceivingStatus,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReceivingListQuery {
    pub status: Option<ReceivingStatus>,
    pub product_id: Option<Uuid>,
}

pub fn receiving_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_receivings).post(create_receiving))
        .route("/:id", get(get_receiving).put(update_receiving))
        .route("/:id/status", put(update_receiving_status))
}

#[utoipa::path(
    post,
    path = "/receivings",
    tag = "Receivings",
    security(("bearer_auth" = [])),
    request_body = CreateReceivingRequest,
    responses(
        (status = 201, description = "Receiving created", body = Receiving),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Product not found")
    )
)]
pub async fn create_receiving(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    ValidatedJson(payload): ValidatedJson<CreateReceivingRequest>,
) -> AppResult<Created<Receiving>> {
    require_role(&current_user, UserRole::Operator)?;

    let receiving = NewReceiving {
        order_number: payload.order_number,
        supplier_name: payload.supplier_name,
        product_id: payload.product_id,
        quantity: payload.quantity,
        location: payload.location,
        expected_date: payload.expected_date,
        note: payload.note,
        created_by: Some(current_user.id),
    };
    let receiving = state.receiving_service.create(receiving).await?;

    Ok(Created(receiving))
}

#[utoipa::path(
    get,
    path = "/receivings",
    tag = "Receivings",
    security(("bearer_auth" = [])),
    params(PaginationParams, ReceivingListQuery),
    responses((status = 200, description = "Paginated receivings"))
)]
pub async fn list_receivings(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
    Query(query): Query<ReceivingListQuery>,
) -> AppResult<Json<Paginated<Receiving>>> {
    let filter = ReceivingFilter {
        status: query.status,
        product_id: query.product_id,
    };
    let receivings = state.receiving_service.list(filter, params).await?;

    Ok(Json(receivings))
}

#[utoipa::path(
    get,
    path = "/receivings/{id}",
    tag = "Receivings",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Receiving ID")),
    responses(
        (status = 200, description = "Receiving", body = Receiving),
        (status = 404, description = "Receiving not found")
    )
)]
pub async fn get_receiving(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Receiving>> {
    let receiving = state.receiving_service.get(id).await?;
    Ok(Json(receiving))
}

/// Edit a receiving that is still pending
#[utoipa::path(
    put,
    path = "/receivings/{id}",
    tag = "Receivings",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Receiving ID")),
    request_body = UpdateReceivingRequest,
    responses(
        (status = 200, description = "Receiving updated", body = Receiving),
        (status = 400, description = "Receiving is no longer pending"),
        (status = 404, description = "Receiving not found")
    )
)]
pub async fn update_receiving(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateReceivingRequest>,
) -> AppResult<Json<Receiving>> {
    require_role(&current_user, UserRole::Operator)?;

    let receiving = state.receiving_service.update(id, payload.into()).await?;
    Ok(Json(receiving))
}

/// Advance the status; `received` puts the goods into stock
#[utoipa::path(
    put,
    path = "/receivings/{id}/status",
    tag = "Receivings",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Receiving ID")),
    request_body = ReceivingStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = Receiving),
        (status = 400, description = "Transition not allowed"),
        (status = 404, description = "Receiving not found")
    )
)]
pub async fn update_receiving_status(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReceivingStatusRequest>,
) -> AppResult<Json<Receiving>> {
    require_role(&current_user, UserRole::Operator)?;

    let receiving = state
        .receiving_service
        .update_status(id, payload.status, current_user.id)
        .await?;

    Ok(Json(receiving))
}
