//! Deployment event payloads, broadcast on a bounded channel (§9).

use fleetops_types::deployment::Slot;
use fleetops_types::{DeploymentId, DeploymentStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DeploymentEvent {
    StatusChanged {
        deployment_id: DeploymentId,
        status: DeploymentStatus,
        message: String,
    },
    CanaryStepAdvanced {
        deployment_id: DeploymentId,
        step_index: usize,
        weight: u32,
    },
    CanaryRolledBack {
        deployment_id: DeploymentId,
        reason: String,
    },
    BlueGreenSwitched {
        name: String,
        environment: String,
        active_slot: Slot,
    },
}
