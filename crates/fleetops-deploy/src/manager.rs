//! The Deployment Strategies engine (§4.3/C4): selects a strategy, drives
//! hooks, records history per `(name, environment)`, and returns a
//! supervised run for each.

use crate::adapters::{BlueGreenTarget, CanaryTarget, DeployTarget};
use crate::error::{DeployError, Result};
use crate::events::DeploymentEvent;
use crate::hooks::OptionalHook;
use crate::strategies::{blue_green, canary, recreate, rolling};
use dashmap::DashMap;
use fleetops_runtime::SupervisedRun;
use fleetops_types::deployment::{
    BlueGreenConfig, BlueGreenState, CanaryConfig, CanaryDeploy, DeployConfig, Deployment,
    StrategyKind,
};
use fleetops_types::{DeploymentId, DeploymentStatus, ReleaseKey};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::instrument;

/// A started rolling/recreate deployment: its mutable snapshot plus the
/// supervisor owning its cancellation token and history.
pub struct DeployHandle {
    pub supervisor: SupervisedRun<DeploymentStatus>,
    data: RwLock<Deployment>,
}

impl DeployHandle {
    pub async fn snapshot(&self) -> Deployment {
        self.data.read().await.clone()
    }
}

pub struct DeploymentManager {
    deploy_target: Arc<dyn DeployTarget>,
    canary_target: Arc<dyn CanaryTarget>,
    blue_green_target: Arc<dyn BlueGreenTarget>,

    deployments: DashMap<String, Arc<DeployHandle>>,
    // Deployment ids per (name, environment), in creation order. History is
    // read live off `deployments` through this index rather than snapshotted
    // into a side map, so a deployment's terminal status is always visible
    // to `history`/`rollback` the moment its supervised run reaches it.
    deployments_by_key: DashMap<ReleaseKey, Vec<String>>,

    canaries: DashMap<String, Arc<canary::CanaryController>>,

    bg_states: DashMap<ReleaseKey, Arc<RwLock<BlueGreenState>>>,
    // Tracked per (name, environment) rather than a single hard-coded field,
    // resolving the ambiguity called out in §9's open questions.
    bg_adapters: DashMap<ReleaseKey, Arc<dyn BlueGreenTarget>>,

    event_tx: broadcast::Sender<DeploymentEvent>,
    dropped_events: AtomicU64,
}

impl DeploymentManager {
    pub fn new(
        deploy_target: Arc<dyn DeployTarget>,
        canary_target: Arc<dyn CanaryTarget>,
        blue_green_target: Arc<dyn BlueGreenTarget>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(1024);
        Self {
            deploy_target,
            canary_target,
            blue_green_target,
            deployments: DashMap::new(),
            deployments_by_key: DashMap::new(),
            canaries: DashMap::new(),
            bg_states: DashMap::new(),
            bg_adapters: DashMap::new(),
            event_tx,
            dropped_events: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DeploymentEvent> {
        self.event_tx.subscribe()
    }

    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    fn publish(&self, event: DeploymentEvent) {
        if self.event_tx.send(event).is_err() {
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
        }
    }

    async fn snapshot_by_id(&self, id: &str) -> Option<Deployment> {
        let handle = self.deployments.get(id).map(|e| e.clone())?;
        Some(handle.snapshot().await)
    }

    /// Deployment history for `(name, environment)`, in creation order.
    pub async fn history(&self, name: &str, environment: &str) -> Vec<Deployment> {
        let ids = self
            .deployments_by_key
            .get(&ReleaseKey::new(name, environment))
            .map(|e| e.clone())
            .unwrap_or_default();
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(d) = self.snapshot_by_id(&id).await {
                out.push(d);
            }
        }
        out
    }

    /// Flattens history across every `(name, environment)` key, for
    /// read-only dashboard aggregation (§6).
    pub async fn all_history(&self) -> Vec<Deployment> {
        let keys: Vec<ReleaseKey> = self.deployments_by_key.iter().map(|e| e.key().clone()).collect();
        let mut out = Vec::new();
        for key in keys {
            out.extend(self.history(&key.name, &key.environment).await);
        }
        out
    }

    #[instrument(skip(self, pre_deploy, post_deploy, cfg), fields(name = %cfg.name, environment = %cfg.environment))]
    pub async fn deploy(
        &self,
        strategy: StrategyKind,
        cfg: DeployConfig,
        pre_deploy: OptionalHook,
        post_deploy: OptionalHook,
    ) -> Result<Arc<DeployHandle>> {
        self.deploy_internal(strategy, cfg, pre_deploy, post_deploy, false).await
    }

    async fn deploy_internal(
        &self,
        strategy: StrategyKind,
        cfg: DeployConfig,
        pre_deploy: OptionalHook,
        post_deploy: OptionalHook,
        is_rollback: bool,
    ) -> Result<Arc<DeployHandle>> {
        if !matches!(strategy, StrategyKind::Rolling | StrategyKind::Recreate) {
            return Err(DeployError::InvalidSpec(
                "deploy() only drives rolling/recreate; use start_canary/deploy_blue_green for the others"
                    .to_string(),
            ));
        }

        let id = DeploymentId::generate();
        let key = ReleaseKey::new(cfg.name.clone(), cfg.environment.clone());
        let deployment = Deployment {
            id: id.clone(),
            config: cfg.clone(),
            strategy,
            status: DeploymentStatus::Pending,
            status_history: Vec::new(),
            started_at: chrono::Utc::now(),
            ended_at: None,
        };
        let handle = Arc::new(DeployHandle {
            supervisor: SupervisedRun::new(DeploymentStatus::Pending, "deployment created"),
            data: RwLock::new(deployment),
        });
        self.deployments.insert(id.as_str().to_string(), handle.clone());
        self.deployments_by_key
            .entry(key.clone())
            .or_default()
            .push(id.as_str().to_string());

        let target = self.deploy_target.clone();
        let event_tx = self.event_tx.clone();
        let handle_task = handle.clone();
        let id_task = id.clone();
        let cfg_task = cfg;

        tokio::spawn(async move {
            if is_rollback {
                handle_task
                    .supervisor
                    .transition(DeploymentStatus::Rollback, "rolling back to previous release")
                    .await;
            }
            let status = if strategy == StrategyKind::Rolling {
                rolling::run(&handle_task.supervisor, target, pre_deploy, post_deploy, cfg_task.clone()).await
            } else {
                recreate::run(&handle_task.supervisor, target, pre_deploy, post_deploy, cfg_task.clone()).await
            };
            {
                let mut data = handle_task.data.write().await;
                data.status = status;
                data.status_history = handle_task.supervisor.status_history().await;
                data.ended_at = Some(chrono::Utc::now());
            }
            let _ = event_tx.send(DeploymentEvent::StatusChanged {
                deployment_id: id_task,
                status,
                message: format!("{status:?}"),
            });
        });

        Ok(handle)
    }

    /// Rolls back `(name, env)` by reverting to the second-to-last terminal
    /// deployment recorded in history, replayed with its original strategy
    /// and passing through `DeploymentStatus::Rollback` before the
    /// strategy's own state machine runs (§3/§4.3).
    pub async fn rollback(&self, name: &str, environment: &str) -> Result<Arc<DeployHandle>> {
        let history = self.history(name, environment).await;
        let terminal: Vec<&Deployment> = history.iter().filter(|d| d.status.is_terminal()).collect();
        if terminal.len() < 2 {
            return Err(DeployError::Conflict(
                "not enough history to roll back".to_string(),
            ));
        }
        let target_record = terminal[terminal.len() - 2].clone();
        self.deploy_internal(
            target_record.strategy,
            target_record.config,
            None,
            None,
            true,
        )
        .await
    }

    #[instrument(skip(self, cfg), fields(name = %cfg.name, environment = %cfg.environment))]
    pub async fn start_canary(&self, cfg: CanaryConfig) -> Arc<canary::CanaryController> {
        let id = DeploymentId::generate();
        let controller = Arc::new(canary::CanaryController::new(cfg.clone(), id.clone()));
        self.canaries.insert(id.as_str().to_string(), controller.clone());

        let target = self.canary_target.clone();
        let controller_task = controller.clone();
        tokio::spawn(async move {
            canary::run(controller_task, target, cfg).await;
        });
        controller
    }

    pub fn get_canary(&self, id: &str) -> Option<Arc<canary::CanaryController>> {
        self.canaries.get(id).map(|c| c.clone())
    }

    pub async fn canary_snapshot(&self, id: &str) -> Option<CanaryDeploy> {
        match self.get_canary(id) {
            Some(c) => Some(c.snapshot().await),
            None => None,
        }
    }

    pub async fn deploy_blue_green(&self, cfg: BlueGreenConfig) -> Result<BlueGreenState> {
        let key = ReleaseKey::new(cfg.name.clone(), cfg.environment.clone());
        let state_lock = self
            .bg_states
            .entry(key.clone())
            .or_insert_with(|| Arc::new(RwLock::new(BlueGreenState::default())))
            .clone();
        self.bg_adapters
            .entry(key)
            .or_insert_with(|| self.blue_green_target.clone());

        let target = self.blue_green_target.clone();
        let cancel = fleetops_runtime::CancelToken::new();
        let mut state = state_lock.write().await;
        blue_green::deploy_to_slot(cancel, target.as_ref(), &cfg, &mut state).await?;
        let snapshot = state.clone();
        self.publish(DeploymentEvent::BlueGreenSwitched {
            name: cfg.name,
            environment: cfg.environment,
            active_slot: snapshot.active_slot.expect("deploy_to_slot sets active_slot"),
        });
        Ok(snapshot)
    }

    pub async fn switch_blue_green(&self, name: &str, environment: &str) -> Result<BlueGreenState> {
        let key = ReleaseKey::new(name, environment);
        let state_lock = self
            .bg_states
            .get(&key)
            .map(|e| e.clone())
            .ok_or_else(|| DeployError::NotFound(key.to_string()))?;
        let mut state = state_lock.write().await;
        blue_green::switch(&mut state)?;
        let snapshot = state.clone();
        self.publish(DeploymentEvent::BlueGreenSwitched {
            name: name.to_string(),
            environment: environment.to_string(),
            active_slot: snapshot.active_slot.expect("switch sets active_slot"),
        });
        Ok(snapshot)
    }

    pub async fn rollback_blue_green(&self, name: &str, environment: &str) -> Result<BlueGreenState> {
        let key = ReleaseKey::new(name, environment);
        let state_lock = self
            .bg_states
            .get(&key)
            .map(|e| e.clone())
            .ok_or_else(|| DeployError::NotFound(key.to_string()))?;
        let mut state = state_lock.write().await;
        blue_green::rollback(&mut state)?;
        Ok(state.clone())
    }

    pub async fn cleanup_blue_green(&self, name: &str, environment: &str) -> Result<()> {
        let key = ReleaseKey::new(name, environment);
        let state_lock = self
            .bg_states
            .get(&key)
            .map(|e| e.clone())
            .ok_or_else(|| DeployError::NotFound(key.to_string()))?;
        let target = self
            .bg_adapters
            .get(&key)
            .map(|e| e.clone())
            .ok_or_else(|| DeployError::NotFound(key.to_string()))?;
        let state = state_lock.read().await;
        blue_green::cleanup(
            fleetops_runtime::CancelToken::new(),
            target.as_ref(),
            name,
            environment,
            &state,
        )
        .await
    }
}
