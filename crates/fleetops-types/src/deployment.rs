//! Deployment Strategies data model (§3, §4.3).

use crate::ids::DeploymentId;
use crate::status::{CanaryStatus, DeploymentStatus, StatusHistoryEntry};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which strategy a deployment configuration selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Rolling,
    Recreate,
    BlueGreen,
    Canary,
}

/// Rolling/Recreate deployment configuration. Step arithmetic beyond
/// `max_surge`/`max_unavailable` is delegated to the adapter (§4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    pub name: String,
    pub environment: String,
    pub version: semver::Version,
    pub max_surge: u32,
    pub max_unavailable: u32,
    pub replicas: u32,
}

/// A single canary step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanaryStep {
    pub weight: u32,
    #[serde(with = "crate::status::duration_millis")]
    pub duration: Duration,
    pub manual_approval: bool,
}

/// Metric thresholds that abort a canary rollout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanaryAnalysis {
    pub max_error_rate: f64,
    pub max_latency_p99_ms: Option<u64>,
}

/// Canary deployment configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanaryConfig {
    pub name: String,
    pub environment: String,
    pub version: semver::Version,
    pub steps: Vec<CanaryStep>,
    pub analysis: Option<CanaryAnalysis>,
}

/// Metrics reported by a canary target for analysis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CanaryMetrics {
    pub error_rate: f64,
    pub latency_p99_ms: u64,
}

/// One entry in a canary's step history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanaryStepHistoryEntry {
    pub step_index: usize,
    pub weight: u32,
    pub at: chrono::DateTime<chrono::Utc>,
}

/// Slot identifier for the Blue/Green strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Blue,
    Green,
}

impl Slot {
    pub fn opposite(self) -> Slot {
        match self {
            Slot::Blue => Slot::Green,
            Slot::Green => Slot::Blue,
        }
    }
}

/// Blue/Green health-check configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckConfig {
    pub enabled: bool,
}

/// Blue/Green deployment configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlueGreenConfig {
    pub name: String,
    pub environment: String,
    pub version: semver::Version,
    pub health_check: Option<HealthCheckConfig>,
    pub auto_switch: bool,
}

/// Per-`(name, environment)` Blue/Green state. `active_slot` is flipped
/// only by adapter success on `SwitchTraffic`, or an explicit
/// `Switch`/`Rollback` call — never by `DeployToSlot` (§8 invariant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlueGreenState {
    pub active_slot: Option<Slot>,
    pub blue_version: Option<semver::Version>,
    pub green_version: Option<semver::Version>,
    pub blue_ready: bool,
    pub green_ready: bool,
}

impl Default for BlueGreenState {
    fn default() -> Self {
        Self {
            active_slot: None,
            blue_version: None,
            green_version: None,
            blue_ready: false,
            green_ready: false,
        }
    }
}

impl BlueGreenState {
    /// The slot a new deployment targets: blue on first deployment,
    /// otherwise whichever slot is not currently active.
    pub fn target_slot(&self) -> Slot {
        match self.active_slot {
            None => Slot::Blue,
            Some(active) => active.opposite(),
        }
    }

    pub fn version_for(&self, slot: Slot) -> &Option<semver::Version> {
        match slot {
            Slot::Blue => &self.blue_version,
            Slot::Green => &self.green_version,
        }
    }

    pub fn ready_for(&self, slot: Slot) -> bool {
        match slot {
            Slot::Blue => self.blue_ready,
            Slot::Green => self.green_ready,
        }
    }
}

/// Observable status of a rolling/recreate deployment run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    pub id: DeploymentId,
    pub config: DeployConfig,
    /// The strategy this deployment was driven with, so a later rollback can
    /// replay it with the same strategy instead of assuming rolling.
    pub strategy: StrategyKind,
    pub status: DeploymentStatus,
    pub status_history: Vec<StatusHistoryEntry<DeploymentStatus>>,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub ended_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Observable status of a canary deployment run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanaryDeploy {
    pub id: DeploymentId,
    pub config: CanaryConfig,
    pub status: CanaryStatus,
    pub current_step: usize,
    pub current_weight: u32,
    pub step_history: Vec<CanaryStepHistoryEntry>,
    pub metrics: Option<CanaryMetrics>,
    pub promote_pending: bool,
}
