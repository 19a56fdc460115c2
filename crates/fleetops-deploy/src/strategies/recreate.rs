//! Recreate strategy: terminate all, then create new. The adapter owns the
//! actual teardown/recreate sequencing; this layer owns only the state
//! machine shared with rolling (§4.3).

use super::run_basic_lifecycle;
use crate::adapters::DeployTarget;
use crate::hooks::OptionalHook;
use fleetops_runtime::SupervisedRun;
use fleetops_types::deployment::DeployConfig;
use fleetops_types::DeploymentStatus;
use std::sync::Arc;

pub async fn run(
    supervisor: &SupervisedRun<DeploymentStatus>,
    target: Arc<dyn DeployTarget>,
    pre_deploy: OptionalHook,
    post_deploy: OptionalHook,
    cfg: DeployConfig,
) -> DeploymentStatus {
    run_basic_lifecycle(supervisor, target, pre_deploy, post_deploy, cfg).await
}
