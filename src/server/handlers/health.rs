use crate::server::state::AppState;
use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
}

/// Health check endpoint returning structured JSON diagnostics
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: VERSION,
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}
