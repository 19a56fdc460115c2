//! # fleetops-deploy
//!
//! Deployment Strategies (§4.3/C4) and the Target Adapter Contracts
//! (§4.7/C1) they drive: rolling, recreate, canary, and blue/green state
//! machines, each delegating side effects to a pluggable adapter while this
//! crate owns the state machine, hook ordering, cancellation, and history.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]

pub mod adapters;
pub mod error;
pub mod events;
pub mod hooks;
pub mod manager;
pub mod strategies;

pub use adapters::{BlueGreenTarget, CanaryTarget, DeployTarget, NoOpDeployTarget};
pub use error::{DeployError, Result};
pub use events::DeploymentEvent;
pub use hooks::{DeployHook, OptionalHook};
pub use manager::{DeployHandle, DeploymentManager};
pub use strategies::canary::CanaryController;

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fleetops_runtime::CancelToken;
    use fleetops_types::deployment::{
        BlueGreenConfig, CanaryAnalysis, CanaryConfig, CanaryMetrics, CanaryStep, DeployConfig,
        HealthCheckConfig, Slot, StrategyKind,
    };
    use fleetops_types::DeploymentStatus;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct AlwaysOkDeployTarget;
    #[async_trait]
    impl DeployTarget for AlwaysOkDeployTarget {
        async fn deploy(&self, _c: CancelToken, _cfg: &DeployConfig) -> std::result::Result<(), String> {
            Ok(())
        }
        async fn rollback(&self, _c: CancelToken, _cfg: &DeployConfig) -> std::result::Result<(), String> {
            Ok(())
        }
        async fn status(&self, _n: &str, _e: &str) -> std::result::Result<String, String> {
            Ok("ok".into())
        }
        async fn scale(&self, _c: CancelToken, _n: &str, _e: &str, _r: u32) -> std::result::Result<(), String> {
            Ok(())
        }
    }

    struct ScriptedCanaryTarget {
        error_rate: f64,
        rollback_calls: Arc<AtomicU32>,
    }
    #[async_trait]
    impl CanaryTarget for ScriptedCanaryTarget {
        async fn set_weight(&self, _c: CancelToken, _n: &str, _e: &str, _w: u32) -> std::result::Result<(), String> {
            Ok(())
        }
        async fn get_metrics(&self, _n: &str, _e: &str) -> Option<CanaryMetrics> {
            Some(CanaryMetrics {
                error_rate: self.error_rate,
                latency_p99_ms: 10,
            })
        }
        async fn rollback(&self, _c: CancelToken, _n: &str, _e: &str) -> std::result::Result<(), String> {
            self.rollback_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn promote(&self, _c: CancelToken, _n: &str, _e: &str) -> std::result::Result<(), String> {
            Ok(())
        }
    }

    struct AlwaysHealthyBlueGreenTarget;
    #[async_trait]
    impl BlueGreenTarget for AlwaysHealthyBlueGreenTarget {
        async fn deploy_to_slot(
            &self,
            _c: CancelToken,
            _cfg: &BlueGreenConfig,
            _slot: Slot,
        ) -> std::result::Result<(), String> {
            Ok(())
        }
        async fn switch_traffic(
            &self,
            _c: CancelToken,
            _n: &str,
            _e: &str,
            _slot: Slot,
        ) -> std::result::Result<(), String> {
            Ok(())
        }
        async fn check_health(&self, _n: &str, _e: &str, _slot: Slot) -> std::result::Result<bool, String> {
            Ok(true)
        }
        async fn cleanup_slot(
            &self,
            _c: CancelToken,
            _n: &str,
            _e: &str,
            _slot: Slot,
        ) -> std::result::Result<(), String> {
            Ok(())
        }
    }

    fn manager_with(canary_error_rate: f64, rollback_calls: Arc<AtomicU32>) -> DeploymentManager {
        DeploymentManager::new(
            Arc::new(AlwaysOkDeployTarget),
            Arc::new(ScriptedCanaryTarget {
                error_rate: canary_error_rate,
                rollback_calls,
            }),
            Arc::new(AlwaysHealthyBlueGreenTarget),
        )
    }

    fn deploy_config(name: &str, env: &str) -> DeployConfig {
        DeployConfig {
            name: name.to_string(),
            environment: env.to_string(),
            version: semver::Version::new(1, 0, 0),
            max_surge: 1,
            max_unavailable: 0,
            replicas: 3,
        }
    }

    #[tokio::test]
    async fn rolling_deploy_succeeds() {
        let mgr = manager_with(0.0, Arc::new(AtomicU32::new(0)));
        let handle = mgr
            .deploy(StrategyKind::Rolling, deploy_config("api", "prod"), None, None)
            .await
            .unwrap();
        handle.supervisor.wait(Duration::from_secs(2)).await;
        assert_eq!(handle.supervisor.status().await, DeploymentStatus::Success);
    }

    /// End-to-end scenario 2 (§8): canary with steps [{10,10ms},{100,0}] and
    /// analysis max_error_rate=0.05; adapter reports error_rate=0.15 after
    /// the first step -> rolled_back, rollback invoked exactly once.
    #[tokio::test]
    async fn canary_auto_rollback() {
        let rollback_calls = Arc::new(AtomicU32::new(0));
        let mgr = manager_with(0.15, rollback_calls.clone());
        let cfg = CanaryConfig {
            name: "api".to_string(),
            environment: "prod".to_string(),
            version: semver::Version::new(2, 0, 0),
            steps: vec![
                CanaryStep {
                    weight: 10,
                    duration: Duration::from_millis(10),
                    manual_approval: false,
                },
                CanaryStep {
                    weight: 100,
                    duration: Duration::from_millis(0),
                    manual_approval: false,
                },
            ],
            analysis: Some(CanaryAnalysis {
                max_error_rate: 0.05,
                max_latency_p99_ms: None,
            }),
        };
        let controller = mgr.start_canary(cfg).await;
        controller.supervisor.wait(Duration::from_secs(2)).await;
        assert_eq!(
            controller.supervisor.status().await,
            fleetops_types::CanaryStatus::RolledBack
        );
        assert_eq!(rollback_calls.load(Ordering::SeqCst), 1);
    }

    /// End-to-end scenario 3 (§8): first deployment targets blue; a second
    /// deployment with auto_switch targets green and flips active_slot;
    /// explicit rollback flips it back without touching versions.
    #[tokio::test]
    async fn blue_green_first_and_second_deploy() {
        let mgr = manager_with(0.0, Arc::new(AtomicU32::new(0)));
        let cfg_v1 = BlueGreenConfig {
            name: "web".to_string(),
            environment: "prod".to_string(),
            version: semver::Version::new(1, 0, 0),
            health_check: Some(HealthCheckConfig { enabled: true }),
            auto_switch: true,
        };
        let state = mgr.deploy_blue_green(cfg_v1).await.unwrap();
        assert_eq!(state.active_slot, Some(Slot::Blue));
        assert_eq!(state.blue_version, Some(semver::Version::new(1, 0, 0)));

        let cfg_v2 = BlueGreenConfig {
            name: "web".to_string(),
            environment: "prod".to_string(),
            version: semver::Version::new(2, 0, 0),
            health_check: Some(HealthCheckConfig { enabled: true }),
            auto_switch: true,
        };
        let state = mgr.deploy_blue_green(cfg_v2).await.unwrap();
        assert_eq!(state.active_slot, Some(Slot::Green));
        assert_eq!(state.green_version, Some(semver::Version::new(2, 0, 0)));

        let state = mgr.rollback_blue_green("web", "prod").await.unwrap();
        assert_eq!(state.active_slot, Some(Slot::Blue));
        assert_eq!(state.blue_version, Some(semver::Version::new(1, 0, 0)));
        assert_eq!(state.green_version, Some(semver::Version::new(2, 0, 0)));
    }

    #[tokio::test]
    async fn rollback_reverts_to_second_most_recent_terminal_deployment() {
        let mgr = manager_with(0.0, Arc::new(AtomicU32::new(0)));
        let first = mgr
            .deploy(StrategyKind::Rolling, deploy_config("api", "prod"), None, None)
            .await
            .unwrap();
        first.supervisor.wait(Duration::from_secs(2)).await;

        let mut second_cfg = deploy_config("api", "prod");
        second_cfg.version = semver::Version::new(2, 0, 0);
        let second = mgr
            .deploy(StrategyKind::Rolling, second_cfg, None, None)
            .await
            .unwrap();
        second.supervisor.wait(Duration::from_secs(2)).await;

        let history = mgr.history("api", "prod").await;
        assert_eq!(history.len(), 2);

        let rolled_back = mgr.rollback("api", "prod").await.unwrap();
        rolled_back.supervisor.wait(Duration::from_secs(2)).await;
        let snapshot = rolled_back.snapshot().await;
        assert_eq!(snapshot.config.version, semver::Version::new(1, 0, 0));

        assert_eq!(mgr.history("api", "prod").await.len(), 3);
    }

    #[tokio::test]
    async fn rollback_preserves_original_strategy_and_passes_through_rollback_status() {
        let mgr = manager_with(0.0, Arc::new(AtomicU32::new(0)));
        let first = mgr
            .deploy(StrategyKind::Recreate, deploy_config("api", "prod"), None, None)
            .await
            .unwrap();
        first.supervisor.wait(Duration::from_secs(2)).await;

        let mut second_cfg = deploy_config("api", "prod");
        second_cfg.version = semver::Version::new(2, 0, 0);
        let second = mgr
            .deploy(StrategyKind::Recreate, second_cfg, None, None)
            .await
            .unwrap();
        second.supervisor.wait(Duration::from_secs(2)).await;

        let rolled_back = mgr.rollback("api", "prod").await.unwrap();
        rolled_back.supervisor.wait(Duration::from_secs(2)).await;
        let snapshot = rolled_back.snapshot().await;
        assert_eq!(snapshot.strategy, StrategyKind::Recreate);
        assert!(snapshot
            .status_history
            .iter()
            .any(|entry| entry.status == DeploymentStatus::Rollback));
    }

    #[tokio::test]
    async fn rollback_fails_with_fewer_than_two_terminal_deployments() {
        let mgr = manager_with(0.0, Arc::new(AtomicU32::new(0)));
        let handle = mgr
            .deploy(StrategyKind::Rolling, deploy_config("api", "prod"), None, None)
            .await
            .unwrap();
        handle.supervisor.wait(Duration::from_secs(2)).await;
        assert!(mgr.rollback("api", "prod").await.is_err());
    }

    #[tokio::test]
    async fn canary_promote_rejected_when_not_paused() {
        let mgr = manager_with(0.0, Arc::new(AtomicU32::new(0)));
        let cfg = CanaryConfig {
            name: "api".to_string(),
            environment: "prod".to_string(),
            version: semver::Version::new(1, 0, 0),
            steps: vec![CanaryStep {
                weight: 100,
                duration: Duration::from_millis(5),
                manual_approval: false,
            }],
            analysis: None,
        };
        let controller = mgr.start_canary(cfg).await;
        assert!(controller.promote().await.is_err());
    }
}
