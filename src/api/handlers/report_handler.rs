//! Report and dashboard handlers.

use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Extension, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::api::middleware::CurrentUser;
use crate::api::AppState;
use crate::domain::{DashboardSummary, ReportPeriod, ReportResponse};
use crate::errors::AppResult;
use crate::types::DateRange;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReportQuery {
    /// Bucket size, `monthly` when omitted
    pub period_type: Option<ReportPeriod>,
    /// Defaults to a window ending today sized to the period
    pub start_date: Option<NaiveDate>,
    /// Defaults to today
    pub end_date: Option<NaiveDate>,
}

pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(generate_report))
        .route("/dashboard", get(dashboard))
}

/// Sales, inventory and delivery figures bucketed by period
#[utoipa::path(
    get,
    path = "/reports",
    tag = "Reports",
    security(("bearer_auth" = [])),
    params(ReportQuery),
    responses(
        (status = 200, description = "Report", body = ReportResponse),
        (status = 400, description = "Invalid period or date range")
    )
)]
pub async fn generate_report(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> AppResult<Json<ReportResponse>> {
    let report = state
        .report_service
        .generate(
            query.period_type.unwrap_or_default(),
            DateRange::new(query.start_date, query.end_date),
        )
        .await?;

    Ok(Json(report))
}

#[utoipa::path(
    get,
    path = "/reports/dashboard",
    tag = "Reports",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Dashboard counters", body = DashboardSummary))
)]
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> AppResult<Json<DashboardSummary>> {
    let summary = state.report_service.dashboard(current_user.id).await?;
    Ok(Json(summary))
}
