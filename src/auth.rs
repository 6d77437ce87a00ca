//! Optional API-key gate for the wake and machine endpoints.

use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Rejects requests whose `X-API-Key` header is missing or does not
/// match the configured key. Mounted only when a key is configured.
pub async fn require_api_key<B>(
    State(expected): State<String>,
    req: Request<B>,
    next: Next<B>,
) -> Response {
    let provided = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());
    match provided {
        None | Some("") => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Missing X-API-Key header" })),
        )
            .into_response(),
        Some(key) if key != expected => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Invalid API key" })),
        )
            .into_response(),
        Some(_) => next.run(req).await,
    }
}
