//! Deployment strategy state machines (§4.3).

pub mod blue_green;
pub mod canary;
pub mod recreate;
pub mod rolling;

use crate::adapters::DeployTarget;
use crate::hooks::{run_optional, OptionalHook};
use fleetops_runtime::{CancelToken, SupervisedRun};
use fleetops_types::deployment::DeployConfig;
use fleetops_types::DeploymentStatus;
use std::sync::Arc;
use tracing::info;

/// The lifecycle shared by rolling and recreate (§4.3): this layer owns the
/// state machine, hook ordering, cancellation, and history — not the step
/// arithmetic, which is passed verbatim to the adapter as configuration.
pub async fn run_basic_lifecycle(
    supervisor: &SupervisedRun<DeploymentStatus>,
    target: Arc<dyn DeployTarget>,
    pre_deploy: OptionalHook,
    post_deploy: OptionalHook,
    cfg: DeployConfig,
) -> DeploymentStatus {
    let cancel: CancelToken = supervisor.cancel_token();
    supervisor
        .transition(DeploymentStatus::Running, "deployment started")
        .await;

    if let Err(err) = run_optional(&pre_deploy, &cfg).await {
        supervisor
            .transition(DeploymentStatus::Failed, format!("pre-deploy hook failed: {err}"))
            .await;
        return DeploymentStatus::Failed;
    }

    if cancel.is_cancelled() {
        supervisor
            .transition(DeploymentStatus::Canceled, "cancelled before deploy")
            .await;
        return DeploymentStatus::Canceled;
    }

    let deploy_result = target.deploy(cancel.clone(), &cfg).await;
    if cancel.is_cancelled() {
        supervisor
            .transition(DeploymentStatus::Canceled, "cancelled during deploy")
            .await;
        return DeploymentStatus::Canceled;
    }
    if let Err(err) = deploy_result {
        supervisor
            .transition(DeploymentStatus::Failed, format!("adapter deploy failed: {err}"))
            .await;
        return DeploymentStatus::Failed;
    }

    if let Err(err) = run_optional(&post_deploy, &cfg).await {
        supervisor
            .transition(
                DeploymentStatus::Failed,
                format!("post-deploy hook failed: {err}"),
            )
            .await;
        return DeploymentStatus::Failed;
    }

    info!(name = %cfg.name, environment = %cfg.environment, "deployment succeeded");
    supervisor
        .transition(DeploymentStatus::Success, "deployment succeeded")
        .await;
    DeploymentStatus::Success
}
