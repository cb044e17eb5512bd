use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::Result,
    handlers::page,
    models::{DeletedNotification, MarkReadResult, NotificationQuery, UnreadCount},
};

pub async fn get_notifications(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(params): Query<NotificationQuery>,
) -> Result<Json<Value>> {
    let (skip, limit) = page(params.skip, params.limit);
    let unread_only = params.unread_only.unwrap_or(false);

    let notifications = state
        .notifications
        .get_user_notifications(auth_user.user_id, skip, limit, unread_only)
        .await?;

    let unread_count = state
        .notifications
        .get_unread_count(auth_user.user_id)
        .await?;

    Ok(Json(json!({
        "notifications": notifications,
        "unread_count": unread_count.count,
        "pagination": {
            "skip": skip,
            "limit": limit,
            "has_more": notifications.len() == limit as usize
        }
    })))
}

pub async fn get_unread_count(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<UnreadCount>> {
    let count = state
        .notifications
        .get_unread_count(auth_user.user_id)
        .await?;
    Ok(Json(count))
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<MarkReadResult>> {
    let result = state
        .notifications
        .mark_as_read(auth_user.user_id, notification_id)
        .await?;
    Ok(Json(result))
}

pub async fn mark_all_notifications_read(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<MarkReadResult>> {
    let result = state
        .notifications
        .mark_all_as_read(auth_user.user_id)
        .await?;
    Ok(Json(result))
}

pub async fn delete_notification(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<DeletedNotification>> {
    let result = state
        .notifications
        .delete_notification(auth_user.user_id, notification_id)
        .await?;
    Ok(Json(result))
}
