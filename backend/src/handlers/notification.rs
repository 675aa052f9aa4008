//! HTTP handlers for the notification center

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::notification::{
    MarkAllReadResult, NotificationQuery, NotificationService, UnreadCount,
};
use crate::AppState;
use shared::{ActionResponse, Notification, PaginatedResponse};

/// List the caller's notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<NotificationQuery>,
) -> AppResult<Json<PaginatedResponse<Notification>>> {
    let service = NotificationService::new(state.db);
    Ok(Json(service.list(user.user_id, query).await?))
}

pub async fn get_unread_count(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<UnreadCount>> {
    let service = NotificationService::new(state.db);
    Ok(Json(service.unread_count(user.user_id).await?))
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(notification_id): Path<Uuid>,
) -> AppResult<Json<ActionResponse<Notification>>> {
    let service = NotificationService::new(state.db);
    let notification = service.mark_read(user.user_id, notification_id).await?;
    Ok(Json(ActionResponse::ok("Notification marked as read", notification)))
}

pub async fn mark_all_notifications_read(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<ActionResponse<MarkAllReadResult>>> {
    let service = NotificationService::new(state.db);
    let result = service.mark_all_read(user.user_id).await?;
    Ok(Json(ActionResponse::ok("All notifications marked as read", result)))
}
