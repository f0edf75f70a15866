//! Batch job handlers. Reading is open to every role; managing batches
//! needs the manager role.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Extension, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::api::middleware::{require_role, CurrentUser};
use crate::api::AppState;
use crate::domain::{Batch, BatchConfig, BatchFilter, BatchLogs, BatchStatus, BatchType, UserRole};
use crate::errors::AppResult;
use crate::types::{Created, DateRange, NoContent, Paginated, PaginationParams};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BatchListQuery {
    #[serde(rename = "type")]
    #[param(rename = "type")]
    pub batch_type: Option<BatchType>,
    pub status: Option<BatchStatus>,
    /// Creation date, inclusive
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl From<BatchListQuery> for BatchFilter {
    fn from(query: BatchListQuery) -> Self {
        Self {
            batch_type: query.batch_type,
            status: query.status,
            created: DateRange::new(query.start_date, query.end_date),
        }
    }
}

pub fn batch_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_batches).post(create_batch))
        .route("/:id", get(get_batch).delete(delete_batch))
        .route("/:id/logs", get(batch_logs))
        .route("/:id/execute", post(execute_batch))
        .route("/:id/cancel", post(cancel_batch))
}

#[utoipa::path(
    post,
    path = "/batches",
    tag = "Batches",
    security(("bearer_auth" = [])),
    request_body = BatchConfig,
    responses(
        (status = 201, description = "Batch created", body = Batch),
        (status = 400, description = "Invalid schedule, retry count or timeout"),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn create_batch(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(config): Json<BatchConfig>,
) -> AppResult<Created<Batch>> {
    require_role(&current_user, UserRole::Manager)?;

    let batch = state.batch_service.create(config, current_user.id).await?;
    Ok(Created(batch))
}

#[utoipa::path(
    get,
    path = "/batches",
    tag = "Batches",
    security(("bearer_auth" = [])),
    params(PaginationParams, BatchListQuery),
    responses(
        (status = 200, description = "Paginated batches, newest first"),
        (status = 400, description = "Invalid date range")
    )
)]
pub async fn list_batches(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
    Query(query): Query<BatchListQuery>,
) -> AppResult<Json<Paginated<Batch>>> {
    let batches = state.batch_service.list(query.into(), params).await?;
    Ok(Json(batches))
}

#[utoipa::path(
    get,
    path = "/batches/{id}",
    tag = "Batches",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Batch ID")),
    responses(
        (status = 200, description = "Batch", body = Batch),
        (status = 404, description = "Batch not found")
    )
)]
pub async fn get_batch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Batch>> {
    let batch = state.batch_service.get(id).await?;
    Ok(Json(batch))
}

#[utoipa::path(
    get,
    path = "/batches/{id}/logs",
    tag = "Batches",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Batch ID")),
    responses(
        (status = 200, description = "Log lines and errors of the last run", body = BatchLogs),
        (status = 404, description = "Batch not found")
    )
)]
pub async fn batch_logs(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<BatchLogs>> {
    let logs = state.batch_service.logs(id).await?;
    Ok(Json(logs))
}

#[utoipa::path(
    delete,
    path = "/batches/{id}",
    tag = "Batches",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Batch ID")),
    responses(
        (status = 204, description = "Batch deleted"),
        (status = 400, description = "Batch is running"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Batch not found")
    )
)]
pub async fn delete_batch(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> AppResult<NoContent> {
    require_role(&current_user, UserRole::Manager)?;

    state.batch_service.delete(id).await?;
    Ok(NoContent)
}

/// Start a run in the background; poll the batch for its result
#[utoipa::path(
    post,
    path = "/batches/{id}/execute",
    tag = "Batches",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Batch ID")),
    responses(
        (status = 202, description = "Batch started", body = Batch),
        (status = 400, description = "Batch is already running"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Batch not found")
    )
)]
pub async fn execute_batch(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<Batch>)> {
    require_role(&current_user, UserRole::Manager)?;

    let batch = state.batch_service.execute(id).await?;
    tracing::info!(batch_id = %id, user_id = %current_user.id, "Batch execution requested");

    Ok((StatusCode::ACCEPTED, Json(batch)))
}

#[utoipa::path(
    post,
    path = "/batches/{id}/cancel",
    tag = "Batches",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Batch ID")),
    responses(
        (status = 200, description = "Batch cancelled", body = Batch),
        (status = 400, description = "Batch already finished"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Batch not found")
    )
)]
pub async fn cancel_batch(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Batch>> {
    require_role(&current_user, UserRole::Manager)?;

    let batch = state.batch_service.cancel(id).await?;
    Ok(Json(batch))
}
