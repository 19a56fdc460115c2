//! HTTP handlers for the dashboard service.

use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use fleetops_types::dashboard::DashboardSnapshot;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub version: String,
    pub uptime: String,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime: state.uptime(),
    })
}

/// The single required external interface (§6): `GET /dashboard`.
pub async fn dashboard(State(state): State<AppState>) -> Json<DashboardSnapshot> {
    Json(state.control_plane.dashboard("fleetops").await)
}
