//! The Rollback Manager (§4.4/C5).

use crate::error::{Result, RollbackError};
use crate::executor::{NoOpRollbackExecutor, RollbackExecutor};
use dashmap::DashMap;
use fleetops_types::rollback::{
    AutoRollbackConfig, ReleaseRecord, RollbackConfig, RollbackMode, RollbackResult,
    RollbackStatus, RollbackToVersionConfig,
};
use fleetops_types::ReleaseKey;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Tracks a release ledger per `(name, environment)` and replays a prior
/// release through a [`RollbackExecutor`] on demand.
pub struct RollbackManager {
    ledger: DashMap<ReleaseKey, Vec<ReleaseRecord>>,
    rollback_history: DashMap<ReleaseKey, Vec<RollbackResult>>,
    auto_rollback: DashMap<ReleaseKey, AutoRollbackConfig>,
    executors: DashMap<String, Arc<dyn RollbackExecutor>>,
    max_history: usize,
}

impl Default for RollbackManager {
    fn default() -> Self {
        Self::new(50)
    }
}

impl RollbackManager {
    pub fn new(max_history: usize) -> Self {
        Self {
            ledger: DashMap::new(),
            rollback_history: DashMap::new(),
            auto_rollback: DashMap::new(),
            executors: DashMap::new(),
            max_history,
        }
    }

    pub fn register_executor(&self, id: impl Into<String>, executor: Arc<dyn RollbackExecutor>) {
        self.executors.insert(id.into(), executor);
    }

    fn resolve_executor(&self, id: &str) -> Arc<dyn RollbackExecutor> {
        self.executors
            .get(id)
            .map(|e| e.clone())
            .unwrap_or_else(|| Arc::new(NoOpRollbackExecutor))
    }

    /// Appends a record, trimming from the head once history exceeds
    /// `max_history` (§3/§4.4).
    pub fn record_release(&self, record: ReleaseRecord) {
        let key = ReleaseKey::new(record.name.clone(), record.environment.clone());
        let mut entry = self.ledger.entry(key).or_default();
        entry.push(record);
        if entry.len() > self.max_history {
            let overflow = entry.len() - self.max_history;
            entry.drain(0..overflow);
        }
    }

    pub fn get_releases(&self, name: &str, environment: &str) -> Vec<ReleaseRecord> {
        self.ledger
            .get(&ReleaseKey::new(name, environment))
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    /// Flattens the release ledger across every `(name, environment)` key,
    /// for read-only dashboard aggregation (§6).
    pub fn all_releases(&self) -> Vec<ReleaseRecord> {
        self.ledger.iter().flat_map(|e| e.value().clone()).collect()
    }

    pub fn rollback_history(&self, name: &str, environment: &str) -> Vec<RollbackResult> {
        self.rollback_history
            .get(&ReleaseKey::new(name, environment))
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    pub fn configure_auto_rollback(&self, name: &str, environment: &str, cfg: AutoRollbackConfig) {
        self.auto_rollback
            .insert(ReleaseKey::new(name, environment), cfg);
    }

    pub fn auto_rollback_config(&self, name: &str, environment: &str) -> Option<AutoRollbackConfig> {
        self.auto_rollback
            .get(&ReleaseKey::new(name, environment))
            .map(|e| e.clone())
    }

    /// Rolls back to the second-most-recent record; requires at least two
    /// releases (§4.4).
    #[instrument(skip(self, config), fields(name = %config.name, environment = %config.environment))]
    pub async fn rollback(&self, config: RollbackConfig) -> Result<RollbackResult> {
        let releases = self.get_releases(&config.name, &config.environment);
        if releases.len() < 2 {
            return Err(RollbackError::Exhausted);
        }
        let from = releases.last().unwrap().clone();
        let target = releases[releases.len() - 2].clone();
        self.execute_rollback(config.mode, from, target).await
    }

    /// Rolls back to a specific, named version; `VersionNotFound` if absent
    /// from the ledger (§4.4).
    #[instrument(skip(self, config), fields(name = %config.name, environment = %config.environment, version = %config.version))]
    pub async fn rollback_to_version(&self, config: RollbackToVersionConfig) -> Result<RollbackResult> {
        let releases = self.get_releases(&config.name, &config.environment);
        let target = releases
            .iter()
            .find(|r| r.version == config.version)
            .cloned()
            .ok_or_else(|| RollbackError::VersionNotFound(config.version.to_string()))?;
        let from = releases.last().cloned();
        self.execute_rollback(
            config.mode,
            from.unwrap_or_else(|| target.clone()),
            target,
        )
        .await
    }

    async fn execute_rollback(
        &self,
        mode: RollbackMode,
        from: ReleaseRecord,
        target: ReleaseRecord,
    ) -> Result<RollbackResult> {
        let executor = self.resolve_executor(&target.executor_id);
        let started = Instant::now();

        let outcome: std::result::Result<(), String> = match &mode {
            RollbackMode::Immediate | RollbackMode::BlueGreen => {
                executor.deploy(&target.artifact).await
            }
            RollbackMode::Gradual { steps, step_delay } => {
                let mut result = Ok(());
                for (idx, weight) in steps.iter().enumerate() {
                    if let Err(err) = executor
                        .set_weight(&target.name, &target.environment, *weight)
                        .await
                    {
                        result = Err(err);
                        break;
                    }
                    if idx + 1 < steps.len() {
                        tokio::time::sleep(*step_delay).await;
                    }
                }
                result
            }
        };

        let status = if outcome.is_ok() {
            RollbackStatus::Success
        } else {
            RollbackStatus::Failed
        };
        if status == RollbackStatus::Failed {
            warn!(name = %target.name, environment = %target.environment, "rollback failed");
        } else {
            info!(name = %target.name, environment = %target.environment, version = %target.version, "rollback succeeded");
        }

        let result = RollbackResult {
            from_version: Some(from.version),
            target_version: target.version,
            status,
            duration: started.elapsed(),
            timestamp: chrono::Utc::now(),
            error: outcome.err(),
        };

        let key = ReleaseKey::new(target.name, target.environment);
        self.rollback_history
            .entry(key)
            .or_default()
            .push(result.clone());
        Ok(result)
    }

    /// Locates the record and validates it through its executor. Absent
    /// executor registration yields trivial success.
    pub async fn validate_rollback(&self, name: &str, environment: &str, version: &semver::Version) -> Result<()> {
        let releases = self.get_releases(name, environment);
        let record = releases
            .iter()
            .find(|r| &r.version == version)
            .ok_or_else(|| RollbackError::VersionNotFound(version.to_string()))?;
        let executor = self.resolve_executor(&record.executor_id);
        executor
            .validate(&record.artifact)
            .await
            .map_err(RollbackError::Unavailable)
    }
}
