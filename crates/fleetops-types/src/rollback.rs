//! Rollback Manager data model (§3, §4.4).

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One entry in a `(name, environment)` release ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseRecord {
    pub name: String,
    pub environment: String,
    pub version: semver::Version,
    pub artifact: String,
    pub executor_id: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub metadata: std::collections::HashMap<String, String>,
}

/// How a rollback should be executed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RollbackMode {
    Immediate,
    Gradual {
        steps: Vec<u32>,
        #[serde(with = "crate::status::duration_millis")]
        step_delay: Duration,
    },
    BlueGreen,
}

impl RollbackMode {
    /// Default gradual weight steps per §4.4.
    pub fn default_gradual(step_delay: Duration) -> Self {
        RollbackMode::Gradual {
            steps: vec![25, 50, 75, 100],
            step_delay,
        }
    }
}

/// Request to roll back a `(name, environment)` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackConfig {
    pub name: String,
    pub environment: String,
    pub mode: RollbackMode,
}

/// Request to roll back to a specific, named version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackToVersionConfig {
    pub name: String,
    pub environment: String,
    pub version: semver::Version,
    pub mode: RollbackMode,
}

/// Terminal status of a rollback attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RollbackStatus {
    Success,
    Failed,
}

/// Outcome recorded in the rollback history for a `(name, environment)` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackResult {
    pub from_version: Option<semver::Version>,
    pub target_version: semver::Version,
    pub status: RollbackStatus,
    pub duration: std::time::Duration,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub error: Option<String>,
}

/// Verbatim-stored auto-rollback thresholds; the core never polls metrics
/// itself (§4.4) — an external evaluator invokes `rollback` on breach.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoRollbackConfig {
    pub enabled: bool,
    pub error_rate: f64,
    pub latency_p99_ms: u64,
    #[serde(with = "crate::status::duration_millis")]
    pub window: Duration,
}
