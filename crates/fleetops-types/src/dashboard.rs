//! `GET /dashboard` response shape (§6).

use serde::{Deserialize, Serialize};

/// Read-only aggregate snapshot served by the collaborator façades (§2/C8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub name: String,
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub pipelines: Vec<serde_json::Value>,
    pub deployments: Vec<serde_json::Value>,
    pub environments: Vec<serde_json::Value>,
    pub releases: Vec<serde_json::Value>,
    pub incidents: Vec<serde_json::Value>,
    pub metrics: serde_json::Value,
}
