//! Liveness probe and trivial demo endpoints.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// `GET /healthz`: always returns 200 OK with `{"status": "ok"}`.
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

/// `GET /ping`: plain-text `Pong`.
pub async fn ping() -> &'static str {
    "Pong"
}

/// `GET /fail`: a server error returned as a normal response.
pub async fn fail() -> impl IntoResponse {
    (StatusCode::SERVICE_UNAVAILABLE, "upstream unavailable")
}

/// `GET /panic`: a handler that never returns.
pub async fn panicking() -> &'static str {
    panic!("demo handler panicked")
}
