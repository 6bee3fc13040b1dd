/*
 * Responsibility
 * - GET /health (疎通用), answered by the gateway itself
 * - never gated, never relayed
 */
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}
