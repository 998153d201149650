use axum::{Json, extract::State};
use serde::Serialize;
use std::sync::Arc;

use super::{ApiResponse, AppState};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
}

/// GET /health
///
/// Liveness plus a database round-trip; stays 200 even when the database is
/// down so load balancers can distinguish "up but degraded" from "gone".
pub async fn health(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthResponse>> {
    let database = if state.store().ping().await.is_ok() {
        "up"
    } else {
        "down"
    };

    Json(ApiResponse::success(HealthResponse {
        status: "ok",
        database,
    }))
}
