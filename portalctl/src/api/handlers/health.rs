use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

/// Liveness probe
#[utoipa::path(
    get,
    path = "/healthz",
    tag = "health",
    responses(
        (status = 200, description = "Service is up", body = String),
    )
)]
pub async fn healthz() -> &'static str {
    "OK"
}

/// Response for routes that match nothing
pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" })))
}
