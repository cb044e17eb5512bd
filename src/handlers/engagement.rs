use axum::{
    extract::{Path, State},
    response::Json,
};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, Result},
    models::{BookmarkState, EngagementAggregate, ItemKind, ItemRef, VoteDirection, VoteRequest},
};

const VOTE_WINDOW_SECONDS: usize = 3600;

pub async fn cast_vote(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(kind): Path<ItemKind>,
    Json(payload): Json<VoteRequest>,
) -> Result<Json<EngagementAggregate>> {
    // Rate limiting for voting
    let rate_limit_key = format!("vote:{}", auth_user.user_id);
    if !state
        .cache
        .check_rate_limit(&rate_limit_key, state.config.vote_rate_limit, VOTE_WINDOW_SECONDS)
        .await?
    {
        return Err(AppError::RateLimit);
    }

    let item = ItemRef {
        kind,
        id: payload.item_id,
    };
    let aggregate = state
        .engagement
        .cast_vote(
            auth_user.user_id,
            item,
            VoteDirection::from_flag(payload.direction),
        )
        .await?;
    Ok(Json(aggregate))
}

pub async fn get_aggregate(
    State(state): State<AppState>,
    Path((kind, item_id)): Path<(ItemKind, Uuid)>,
) -> Result<Json<EngagementAggregate>> {
    let aggregate = state
        .engagement
        .aggregate(ItemRef { kind, id: item_id })
        .await?;
    Ok(Json(aggregate))
}

pub async fn get_bookmarks(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<Value>> {
    let post_ids = state.engagement.bookmarked_posts(auth_user.user_id).await?;
    Ok(Json(json!({ "post_ids": post_ids })))
}

pub async fn add_bookmark(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(post_id): Path<Uuid>,
) -> Result<Json<BookmarkState>> {
    let bookmark = state
        .engagement
        .add_bookmark(auth_user.user_id, post_id)
        .await?;
    Ok(Json(bookmark))
}

pub async fn remove_bookmark(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(post_id): Path<Uuid>,
) -> Result<Json<BookmarkState>> {
    let bookmark = state
        .engagement
        .remove_bookmark(auth_user.user_id, post_id)
        .await?;
    Ok(Json(bookmark))
}

pub async fn toggle_bookmark(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(post_id): Path<Uuid>,
) -> Result<Json<BookmarkState>> {
    let bookmark = state
        .engagement
        .toggle_bookmark(auth_user.user_id, post_id)
        .await?;
    Ok(Json(bookmark))
}
