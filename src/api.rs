//! HTTP delivery layer: routes, handlers and request observability.

use crate::auth;
use crate::config::Config;
use crate::dispatch::{DispatchError, Dispatcher};
use crate::machine::Machine;
use crate::metrics::Metrics;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::{routing, Json, Router};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub metrics: Arc<Metrics>,
    pub started_at: Instant,
}

#[derive(Debug, Deserialize)]
pub struct WakeRequest {
    pub machine_id: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    uptime_seconds: u64,
    configured_machines: usize,
    checks: serde_json::Value,
}

/// Builds the application router. Wake and machine routes sit behind
/// the API-key gate when a key is configured; health and metrics
/// routes can be switched off entirely.
pub fn router(state: AppState, config: &Config) -> Router {
    let mut protected = Router::new()
        .route("/wol", routing::post(wake))
        .route("/machines", routing::get(list_machines))
        .route("/machines/:id", routing::get(get_machine));
    if !config.authentication.api_key.is_empty() {
        protected = protected.route_layer(middleware::from_fn_with_state(
            config.authentication.api_key.clone(),
            auth::require_api_key,
        ));
    }

    let mut app = Router::new().merge(protected);
    if config.observability.health_check.enabled {
        app = app
            .route("/health", routing::get(health))
            .route("/live", routing::get(live))
            .route("/ready", routing::get(ready));
    }
    if config.observability.metrics.enabled {
        app = app.route("/metrics", routing::get(metrics_text));
    }
    app.route("/version", routing::get(version))
        .route_layer(middleware::from_fn(add_observability))
        .with_state(state)
}

async fn add_observability<B>(req: Request<B>, next: Next<B>) -> Response {
    let method = req.method().clone();
    let path = req
        .uri()
        .path_and_query()
        .map(|pq| pq.to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let resp = next.run(req).await;
    info!(
        "{method} {path} {status}",
        status = resp.status().as_str()
    );
    resp
}

/// POST /wol: 202 once the packet is on the wire, 404 for unknown
/// machines, 500 when transmission fails.
async fn wake(
    State(state): State<AppState>,
    payload: Result<Json<WakeRequest>, JsonRejection>,
) -> Response {
    let start = Instant::now();
    let resp = match payload {
        Err(rejection) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": format!("Invalid request: {rejection}") })),
        )
            .into_response(),
        Ok(Json(req)) => match state.dispatcher.dispatch(&req.machine_id) {
            Ok(()) => (
                StatusCode::ACCEPTED,
                Json(json!({ "message": "WoL packet sent successfully" })),
            )
                .into_response(),
            Err(DispatchError::NotFound(_)) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "Machine not found or not allowed" })),
            )
                .into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": format!("Failed to send WoL packet: {err}") })),
            )
                .into_response(),
        },
    };
    state
        .metrics
        .request_duration
        .observe(start.elapsed().as_secs_f64());
    resp
}

/// GET /machines: the full allowlist, an empty array when nothing is
/// configured.
async fn list_machines(State(state): State<AppState>) -> Json<Vec<Machine>> {
    state.metrics.machines_listed.inc();
    let machines: Vec<Machine> = state
        .dispatcher
        .list_machines()
        .iter()
        .map(|m| (**m).clone())
        .collect();
    Json(machines)
}

/// GET /machines/:id.
async fn get_machine(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.dispatcher.get_machine(&id) {
        Ok(machine) => {
            state.metrics.machines_retrieved.inc();
            Json((*machine).clone()).into_response()
        }
        Err(_) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Machine not found" })),
        )
            .into_response(),
    }
}

async fn health(State(state): State<AppState>) -> Response {
    let configured_machines = state.dispatcher.machine_count();
    let machine_check = if configured_machines == 0 { "warning" } else { "ok" };
    Json(HealthResponse {
        status: "healthy",
        version: VERSION,
        uptime_seconds: state.started_at.elapsed().as_secs(),
        configured_machines,
        checks: json!({
            "config_loaded": "ok",
            "machines": machine_check,
        }),
    })
    .into_response()
}

async fn live() -> Json<serde_json::Value> {
    Json(json!({ "status": "alive" }))
}

/// GET /ready: 503 until at least one machine is configured.
async fn ready(State(state): State<AppState>) -> Response {
    let machines = state.dispatcher.machine_count();
    if machines == 0 {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "not ready", "error": "no machines configured" })),
        )
            .into_response();
    }
    Json(json!({ "status": "ready", "machines": machines })).into_response()
}

async fn metrics_text(State(state): State<AppState>) -> Response {
    match state.metrics.gather_text() {
        Ok(text) => text.into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{err}")).into_response(),
    }
}

async fn version() -> Json<serde_json::Value> {
    Json(json!({ "version": VERSION }))
}
