use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use serde_json::json;

use crate::{db, handlers::AppState};

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Up,
    Down,
}

/// Tracks application start time for uptime calculation
static START_TIME: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize the start time (call this on application startup)
pub fn init_start_time() {
    let _ = START_TIME.get_or_init(Instant::now);
}

fn uptime_secs() -> u64 {
    START_TIME.get().map(|t| t.elapsed().as_secs()).unwrap_or(0)
}

/// Liveness: the process is up and serving.
async fn liveness_check() -> impl IntoResponse {
    Json(json!({
        "status": ComponentStatus::Up,
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": uptime_secs(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Readiness of the database connection.
async fn database_check(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();
    let (status, code, message) = match db::check_connection(state.db.as_ref()).await {
        Ok(()) => (ComponentStatus::Up, StatusCode::OK, "database reachable".to_string()),
        Err(e) => (
            ComponentStatus::Down,
            StatusCode::SERVICE_UNAVAILABLE,
            e.to_string(),
        ),
    };
    (
        code,
        Json(json!({
            "status": status,
            "message": message,
            "latency_ms": start.elapsed().as_millis() as u64,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
}

pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(liveness_check))
        .route("/health/db", get(database_check))
}
