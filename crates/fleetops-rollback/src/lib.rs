//! # fleetops-rollback
//!
//! The Rollback Manager (§4.4/C5): a per-`(name, environment)` release
//! ledger and the immediate/gradual/blue-green execution modes that replay
//! an earlier release through a [`RollbackExecutor`].

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]

pub mod error;
pub mod executor;
pub mod manager;

pub use error::{Result, RollbackError};
pub use executor::{NoOpRollbackExecutor, RollbackExecutor};
pub use manager::RollbackManager;

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fleetops_types::rollback::{
        AutoRollbackConfig, ReleaseRecord, RollbackConfig, RollbackMode, RollbackStatus,
        RollbackToVersionConfig,
    };
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    struct RecordingExecutor {
        weights_seen: Arc<std::sync::Mutex<Vec<u32>>>,
        fail: bool,
    }

    #[async_trait]
    impl RollbackExecutor for RecordingExecutor {
        async fn deploy(&self, _artifact: &str) -> std::result::Result<(), String> {
            if self.fail {
                Err("deploy failed".to_string())
            } else {
                Ok(())
            }
        }
        async fn set_weight(
            &self,
            _name: &str,
            _environment: &str,
            weight: u32,
        ) -> std::result::Result<(), String> {
            self.weights_seen.lock().unwrap().push(weight);
            Ok(())
        }
        async fn validate(&self, _artifact: &str) -> std::result::Result<(), String> {
            if self.fail {
                Err("invalid artifact".to_string())
            } else {
                Ok(())
            }
        }
        async fn get_current_version(
            &self,
            _name: &str,
            _environment: &str,
        ) -> Option<semver::Version> {
            None
        }
    }

    fn record(name: &str, environment: &str, version: (u64, u64, u64), executor_id: &str) -> ReleaseRecord {
        ReleaseRecord {
            name: name.to_string(),
            environment: environment.to_string(),
            version: semver::Version::new(version.0, version.1, version.2),
            artifact: format!("{name}:{}.{}.{}", version.0, version.1, version.2),
            executor_id: executor_id.to_string(),
            timestamp: chrono::Utc::now(),
            metadata: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn rollback_requires_at_least_two_releases() {
        let mgr = RollbackManager::new(10);
        mgr.record_release(record("api", "prod", (1, 0, 0), "noop"));
        let result = mgr
            .rollback(RollbackConfig {
                name: "api".to_string(),
                environment: "prod".to_string(),
                mode: RollbackMode::Immediate,
            })
            .await;
        assert!(matches!(result, Err(RollbackError::Exhausted)));
    }

    #[tokio::test]
    async fn rollback_targets_second_most_recent() {
        let mgr = RollbackManager::new(10);
        mgr.register_executor("noop", Arc::new(NoOpRollbackExecutor));
        mgr.record_release(record("api", "prod", (1, 0, 0), "noop"));
        mgr.record_release(record("api", "prod", (2, 0, 0), "noop"));
        mgr.record_release(record("api", "prod", (3, 0, 0), "noop"));

        let result = mgr
            .rollback(RollbackConfig {
                name: "api".to_string(),
                environment: "prod".to_string(),
                mode: RollbackMode::Immediate,
            })
            .await
            .unwrap();

        assert_eq!(result.target_version, semver::Version::new(2, 0, 0));
        assert_eq!(result.from_version, Some(semver::Version::new(3, 0, 0)));
        assert_eq!(result.status, RollbackStatus::Success);
        assert_eq!(mgr.rollback_history("api", "prod").len(), 1);
    }

    #[tokio::test]
    async fn gradual_rollback_walks_default_steps() {
        let mgr = RollbackManager::new(10);
        let weights = Arc::new(std::sync::Mutex::new(Vec::new()));
        mgr.register_executor(
            "scripted",
            Arc::new(RecordingExecutor {
                weights_seen: weights.clone(),
                fail: false,
            }),
        );
        mgr.record_release(record("api", "prod", (1, 0, 0), "scripted"));
        mgr.record_release(record("api", "prod", (2, 0, 0), "scripted"));

        let result = mgr
            .rollback(RollbackConfig {
                name: "api".to_string(),
                environment: "prod".to_string(),
                mode: RollbackMode::default_gradual(Duration::from_millis(1)),
            })
            .await
            .unwrap();

        assert_eq!(result.status, RollbackStatus::Success);
        assert_eq!(*weights.lock().unwrap(), vec![25, 50, 75, 100]);
    }

    #[tokio::test]
    async fn gradual_rollback_aborts_on_step_failure() {
        let mgr = RollbackManager::new(10);
        mgr.register_executor(
            "bad",
            Arc::new(RecordingExecutor {
                weights_seen: Arc::new(std::sync::Mutex::new(Vec::new())),
                fail: true,
            }),
        );
        mgr.record_release(record("api", "prod", (1, 0, 0), "bad"));
        mgr.record_release(record("api", "prod", (2, 0, 0), "bad"));

        let result = mgr
            .rollback(RollbackConfig {
                name: "api".to_string(),
                environment: "prod".to_string(),
                mode: RollbackMode::default_gradual(Duration::from_millis(1)),
            })
            .await
            .unwrap();

        assert_eq!(result.status, RollbackStatus::Failed);
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn rollback_to_version_selects_matching_record() {
        let mgr = RollbackManager::new(10);
        mgr.register_executor("noop", Arc::new(NoOpRollbackExecutor));
        mgr.record_release(record("api", "prod", (1, 0, 0), "noop"));
        mgr.record_release(record("api", "prod", (2, 0, 0), "noop"));
        mgr.record_release(record("api", "prod", (3, 0, 0), "noop"));

        let result = mgr
            .rollback_to_version(RollbackToVersionConfig {
                name: "api".to_string(),
                environment: "prod".to_string(),
                version: semver::Version::new(1, 0, 0),
                mode: RollbackMode::Immediate,
            })
            .await
            .unwrap();
        assert_eq!(result.target_version, semver::Version::new(1, 0, 0));
    }

    #[tokio::test]
    async fn rollback_to_version_missing_fails() {
        let mgr = RollbackManager::new(10);
        mgr.record_release(record("api", "prod", (1, 0, 0), "noop"));
        let result = mgr
            .rollback_to_version(RollbackToVersionConfig {
                name: "api".to_string(),
                environment: "prod".to_string(),
                version: semver::Version::new(9, 9, 9),
                mode: RollbackMode::Immediate,
            })
            .await;
        assert!(matches!(result, Err(RollbackError::VersionNotFound(_))));
    }

    #[tokio::test]
    async fn validate_rollback_trivially_succeeds_without_executor() {
        let mgr = RollbackManager::new(10);
        mgr.record_release(record("api", "prod", (1, 0, 0), "unregistered"));
        mgr.validate_rollback("api", "prod", &semver::Version::new(1, 0, 0))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn ledger_trims_to_max_history() {
        let mgr = RollbackManager::new(2);
        mgr.record_release(record("api", "prod", (1, 0, 0), "noop"));
        mgr.record_release(record("api", "prod", (2, 0, 0), "noop"));
        mgr.record_release(record("api", "prod", (3, 0, 0), "noop"));
        let releases = mgr.get_releases("api", "prod");
        assert_eq!(releases.len(), 2);
        assert_eq!(releases[0].version, semver::Version::new(2, 0, 0));
        assert_eq!(releases[1].version, semver::Version::new(3, 0, 0));
    }

    #[test]
    fn configure_auto_rollback_stores_verbatim() {
        let mgr = RollbackManager::default();
        mgr.configure_auto_rollback(
            "api",
            "prod",
            AutoRollbackConfig {
                enabled: true,
                error_rate: 0.1,
                latency_p99_ms: 500,
                window: Duration::from_secs(60),
            },
        );
        let cfg = mgr.auto_rollback_config("api", "prod").unwrap();
        assert!(cfg.enabled);
        assert_eq!(cfg.error_rate, 0.1);
    }
}
