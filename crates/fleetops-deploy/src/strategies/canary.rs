//! Canary sub-state-machine (§4.3).

use crate::adapters::CanaryTarget;
use crate::error::{DeployError, Result};
use fleetops_runtime::SupervisedRun;
use fleetops_types::deployment::{CanaryConfig, CanaryDeploy, CanaryStepHistoryEntry};
use fleetops_types::CanaryStatus;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex, Notify, RwLock};
use tracing::info;

enum CanarySignal {
    Promote,
}

/// Drives one canary deployment: step weights, manual-approval pauses, and
/// metric-driven auto-rollback. Held behind an `Arc` so `promote`/`abort`
/// can be called from outside the execution task.
pub struct CanaryController {
    pub supervisor: SupervisedRun<CanaryStatus>,
    data: RwLock<CanaryDeploy>,
    pause_slot: Mutex<Option<oneshot::Sender<CanarySignal>>>,
    abort_requested: AtomicBool,
    abort_notify: Notify,
}

impl CanaryController {
    pub fn new(config: CanaryConfig, deployment_id: fleetops_types::DeploymentId) -> Self {
        let data = CanaryDeploy {
            id: deployment_id,
            config,
            status: CanaryStatus::Pending,
            current_step: 0,
            current_weight: 0,
            step_history: Vec::new(),
            metrics: None,
            promote_pending: false,
        };
        Self {
            supervisor: SupervisedRun::new(CanaryStatus::Pending, "canary created"),
            data: RwLock::new(data),
            pause_slot: Mutex::new(None),
            abort_requested: AtomicBool::new(false),
            abort_notify: Notify::new(),
        }
    }

    pub async fn snapshot(&self) -> CanaryDeploy {
        self.data.read().await.clone()
    }

    /// Resolves `promote` against a paused canary. `NotPaused` when not
    /// currently paused; `PromotePending` when a promote is already
    /// in-flight (§4.3).
    pub async fn promote(&self) -> Result<()> {
        if self.supervisor.status().await != CanaryStatus::Paused {
            return Err(DeployError::Conflict("NotPaused".to_string()));
        }
        let mut slot = self.pause_slot.lock().await;
        match slot.take() {
            Some(tx) => {
                let _ = tx.send(CanarySignal::Promote);
                Ok(())
            }
            None => Err(DeployError::Conflict("PromotePending".to_string())),
        }
    }

    /// Abort is accepted at any point: before the first step, mid-step, or
    /// while paused. No rollback is invoked.
    pub fn abort(&self) {
        self.abort_requested.store(true, Ordering::SeqCst);
        self.abort_notify.notify_waiters();
    }

    fn abort_requested_flag(&self) -> bool {
        self.abort_requested.load(Ordering::SeqCst)
    }
}

pub async fn run(
    controller: Arc<CanaryController>,
    target: Arc<dyn CanaryTarget>,
    cfg: CanaryConfig,
) -> CanaryStatus {
    let cancel = controller.supervisor.cancel_token();
    controller
        .supervisor
        .transition(CanaryStatus::Running, "canary started")
        .await;

    if controller.abort_requested_flag() || cancel.is_cancelled() {
        controller
            .supervisor
            .transition(CanaryStatus::Aborted, "aborted before first step")
            .await;
        return CanaryStatus::Aborted;
    }

    for (step_index, step) in cfg.steps.iter().enumerate() {
        {
            let mut data = controller.data.write().await;
            data.current_step = step_index;
            data.current_weight = step.weight;
            data.step_history.push(CanaryStepHistoryEntry {
                step_index,
                weight: step.weight,
                at: chrono::Utc::now(),
            });
        }

        if let Err(err) = target
            .set_weight(cancel.clone(), &cfg.name, &cfg.environment, step.weight)
            .await
        {
            controller
                .supervisor
                .transition(CanaryStatus::Aborted, format!("set_weight failed: {err}"))
                .await;
            return CanaryStatus::Aborted;
        }

        if step.manual_approval {
            let (tx, rx) = oneshot::channel();
            *controller.pause_slot.lock().await = Some(tx);
            controller
                .supervisor
                .transition(CanaryStatus::Paused, "awaiting manual approval")
                .await;

            tokio::select! {
                result = rx => {
                    match result {
                        Ok(CanarySignal::Promote) => {
                            controller
                                .supervisor
                                .transition(CanaryStatus::Running, "promoted")
                                .await;
                        }
                        Err(_) => {
                            controller
                                .supervisor
                                .transition(CanaryStatus::Aborted, "aborted while paused")
                                .await;
                            return CanaryStatus::Aborted;
                        }
                    }
                }
                _ = controller.abort_notify.notified() => {
                    controller
                        .supervisor
                        .transition(CanaryStatus::Aborted, "aborted while paused")
                        .await;
                    return CanaryStatus::Aborted;
                }
                _ = cancel.cancelled() => {
                    controller
                        .supervisor
                        .transition(CanaryStatus::Aborted, "cancelled while paused")
                        .await;
                    return CanaryStatus::Aborted;
                }
            }
        } else {
            tokio::select! {
                _ = tokio::time::sleep(step.duration) => {}
                _ = controller.abort_notify.notified() => {
                    controller
                        .supervisor
                        .transition(CanaryStatus::Aborted, "aborted mid-step")
                        .await;
                    return CanaryStatus::Aborted;
                }
                _ = cancel.cancelled() => {
                    controller
                        .supervisor
                        .transition(CanaryStatus::Aborted, "cancelled mid-step")
                        .await;
                    return CanaryStatus::Aborted;
                }
            }
        }

        if let Some(analysis) = &cfg.analysis {
            if let Some(metrics) = target.get_metrics(&cfg.name, &cfg.environment).await {
                controller.data.write().await.metrics = Some(metrics);
                let error_violated = metrics.error_rate > analysis.max_error_rate;
                let latency_violated = analysis
                    .max_latency_p99_ms
                    .map(|max| metrics.latency_p99_ms > max)
                    .unwrap_or(false);
                if error_violated || latency_violated {
                    controller
                        .supervisor
                        .transition(
                            CanaryStatus::RolledBack,
                            "analysis thresholds breached, rolling back",
                        )
                        .await;
                    let _ = target.rollback(cancel.clone(), &cfg.name, &cfg.environment).await;
                    return CanaryStatus::RolledBack;
                }
            }
            // Missing metrics are treated as non-violating (§4.3).
        }
    }

    if let Err(err) = target.promote(cancel.clone(), &cfg.name, &cfg.environment).await {
        controller
            .supervisor
            .transition(CanaryStatus::Aborted, format!("final promote failed: {err}"))
            .await;
        return CanaryStatus::Aborted;
    }

    info!(name = %cfg.name, environment = %cfg.environment, "canary complete");
    controller
        .supervisor
        .transition(CanaryStatus::Complete, "canary complete")
        .await;
    CanaryStatus::Complete
}
