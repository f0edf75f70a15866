//! Notification inbox handlers. Users only ever see their own notifications.

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, put},
    Extension, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::{require_role, CurrentUser};
use crate::api::AppState;
use crate::domain::{NewNotification, Notification, NotificationType, UserRole};
use crate::errors::AppResult;
use crate::types::{Created, NoContent, Paginated, PaginationParams};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NotificationListQuery {
    #[serde(default)]
    pub unread_only: bool,
}

/// Notification addressed to any user (manager or above)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateNotificationRequest {
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 2000))]
    pub message: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_notifications).post(create_notification))
        .route("/read-all", put(mark_all_read))
        .route(
            "/:id",
            get(get_notification).delete(delete_notification),
        )
        .route("/:id/read", put(mark_read))
}

#[utoipa::path(
    get,
    path = "/notifications",
    tag = "Notifications",
    security(("bearer_auth" = [])),
    params(PaginationParams, NotificationListQuery),
    responses((status = 200, description = "Paginated notifications, newest first"))
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Query(params): Query<PaginationParams>,
    Query(query): Query<NotificationListQuery>,
) -> AppResult<Json<Paginated<Notification>>> {
    let notifications = state
        .notification_service
        .list(current_user.id, query.unread_only, params)
        .await?;

    Ok(Json(notifications))
}

#[utoipa::path(
    post,
    path = "/notifications",
    tag = "Notifications",
    security(("bearer_auth" = [])),
    request_body = CreateNotificationRequest,
    responses(
        (status = 201, description = "Notification created", body = Notification),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Recipient not found")
    )
)]
pub async fn create_notification(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    ValidatedJson(payload): ValidatedJson<CreateNotificationRequest>,
) -> AppResult<Created<Notification>> {
    require_role(&current_user, UserRole::Manager)?;

    let notification = NewNotification {
        user_id: payload.user_id,
        notification_type: payload.notification_type,
        title: payload.title,
        message: payload.message,
        data: payload.data,
    };
    let notification = state.notification_service.create(notification).await?;

    Ok(Created(notification))
}

#[utoipa::path(
    get,
    path = "/notifications/{id}",
    tag = "Notifications",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Notification", body = Notification),
        (status = 404, description = "Not found or not yours")
    )
)]
pub async fn get_notification(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Notification>> {
    let notification = state.notification_service.get(current_user.id, id).await?;
    Ok(Json(notification))
}

#[utoipa::path(
    put,
    path = "/notifications/{id}/read",
    tag = "Notifications",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Marked as read", body = Notification),
        (status = 404, description = "Not found or not yours")
    )
)]
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Notification>> {
    let notification = state
        .notification_service
        .mark_read(current_user.id, id)
        .await?;

    Ok(Json(notification))
}

#[utoipa::path(
    put,
    path = "/notifications/read-all",
    tag = "Notifications",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Unread notifications marked as read", body = MarkAllReadResponse))
)]
pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> AppResult<Json<MarkAllReadResponse>> {
    let updated = state
        .notification_service
        .mark_all_read(current_user.id)
        .await?;

    Ok(Json(MarkAllReadResponse { updated }))
}

#[utoipa::path(
    delete,
    path = "/notifications/{id}",
    tag = "Notifications",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Notification ID")),
    responses(
        (status = 204, description = "Notification deleted"),
        (status = 404, description = "Not found or not yours")
    )
)]
pub async fn delete_notification(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> AppResult<NoContent> {
    state
        .notification_service
        .delete(current_user.id, id)
        .await?;

    Ok(NoContent)
}
