use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{Value, json};

use crate::{AppState, auth::AuthUser, error::Result};

pub async fn logout(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<(StatusCode, Json<Value>)> {
    state.cache.delete_session(&auth_user.jti).await?;
    tracing::info!(user_id = %auth_user.user_id, "session revoked");

    Ok((
        StatusCode::OK,
        Json(json!({
            "message": "Logout successful"
        })),
    ))
}
