pub mod auth;
pub mod engagement;
pub mod notifications;
pub mod reports;

use axum::response::Json;
use serde_json::{Value, json};

const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;

/// Normalises `skip`/`limit` query parameters.
pub(crate) fn page(skip: Option<u32>, limit: Option<u32>) -> (u32, u32) {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    (skip.unwrap_or(0), limit)
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
