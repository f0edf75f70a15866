//! CSV/JSON export and import handlers (manager or above).

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderName},
    response::{IntoResponse, Json},
    routing::post,
    Extension, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::api::middleware::{require_role, CurrentUser};
use crate::api::AppState;
use crate::domain::{DataFormat, DataType, ExportOptions, ImportOptions, ImportResult, UserRole};
use crate::errors::{AppError, AppResult};
use crate::types::DateRange;

static TOTAL_RECORDS: HeaderName = HeaderName::from_static("x-total-records");

#[derive(Debug, Deserialize, ToSchema)]
pub struct ExportRequest {
    #[serde(rename = "type")]
    pub data_type: DataType,
    pub format: DataFormat,
    /// Creation date, inclusive
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// CSV header row
    #[serde(default = "default_true")]
    pub include_headers: bool,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ImportQuery {
    #[serde(rename = "type")]
    #[param(rename = "type")]
    pub data_type: DataType,
    pub format: DataFormat,
    /// Reserve stock for imported deliveries
    #[serde(default = "default_true")]
    pub reserve_stock: bool,
}

fn default_true() -> bool {
    true
}

pub fn exchange_routes() -> Router<AppState> {
    Router::new()
        .route("/export", post(export_data))
        .route("/import", post(import_data))
}

/// Download records as a CSV or JSON file
#[utoipa::path(
    post,
    path = "/export",
    tag = "Data Exchange",
    security(("bearer_auth" = [])),
    request_body = ExportRequest,
    responses(
        (status = 200, description = "File body; X-Total-Records holds the row count"),
        (status = 400, description = "Invalid date range"),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn export_data(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<ExportRequest>,
) -> AppResult<impl IntoResponse> {
    require_role(&current_user, UserRole::Manager)?;

    let options = ExportOptions {
        data_type: payload.data_type,
        format: payload.format,
        range: DateRange::new(payload.start_date, payload.end_date),
        include_headers: payload.include_headers,
    };
    let file = state.exchange_service.export(options).await?;

    let disposition = format!("attachment; filename=\"{}\"", file.filename)
        .parse::<header::HeaderValue>()
        .map_err(|e| AppError::internal(format!("Invalid export filename: {}", e)))?;
    let headers = [
        (header::CONTENT_TYPE, header::HeaderValue::from_static(file.content_type)),
        (header::CONTENT_DISPOSITION, disposition),
        (TOTAL_RECORDS.clone(), header::HeaderValue::from(file.total_records)),
    ];

    Ok((headers, file.body))
}

/// Upload a CSV or JSON file; rows are applied one by one
#[utoipa::path(
    post,
    path = "/import",
    tag = "Data Exchange",
    security(("bearer_auth" = [])),
    params(ImportQuery),
    request_body(content = String, description = "CSV or JSON document", content_type = "text/csv"),
    responses(
        (status = 200, description = "Per-row outcome", body = ImportResult),
        (status = 400, description = "Unreadable document"),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn import_data(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Query(query): Query<ImportQuery>,
    body: Bytes,
) -> AppResult<Json<ImportResult>> {
    require_role(&current_user, UserRole::Manager)?;

    if body.is_empty() {
        return Err(AppError::bad_request("Import body is empty"));
    }

    let options = ImportOptions {
        data_type: query.data_type,
        format: query.format,
        reserve_stock: query.reserve_stock,
    };
    let result = state
        .exchange_service
        .import(options, body.to_vec(), current_user.id)
        .await?;

    tracing::info!(
        user_id = %current_user.id,
        data_type = %options.data_type,
        total = result.total_records,
        failed = result.error_count,
        "Import finished"
    );

    Ok(Json(result))
}
