//! Liveness HTTP surface.
//!
//! The daemon is a background process; this router only answers "is the
//! process up". Unknown routes get a JSON 404.

use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

/// Build the liveness router.
pub fn build_router() -> Router {
    Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .fallback(not_found)
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "swell daemon is running" }))
}

async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "not found, check your URL" })),
    )
}
