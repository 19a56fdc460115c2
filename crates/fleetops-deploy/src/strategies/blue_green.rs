//! Blue/Green strategy (§4.3).
//!
//! `active_slot` is flipped only by adapter success on `SwitchTraffic`, or
//! by an explicit `switch`/`rollback` call — never by `deploy_to_slot`
//! itself (§8 invariant).

use crate::adapters::BlueGreenTarget;
use crate::error::{DeployError, Result};
use fleetops_runtime::CancelToken;
use fleetops_types::deployment::{BlueGreenConfig, BlueGreenState, Slot};
use tracing::info;

/// Deploys to the inactive slot (blue on first deployment). If a health
/// check is configured, it must report healthy before the slot is marked
/// ready; a single unhealthy response is treated as failure. If
/// `auto_switch` is set and a prior active slot exists, traffic is switched
/// atomically after readiness.
pub async fn deploy_to_slot(
    cancel: CancelToken,
    target: &dyn BlueGreenTarget,
    cfg: &BlueGreenConfig,
    state: &mut BlueGreenState,
) -> Result<()> {
    let slot = state.target_slot();
    let had_active = state.active_slot.is_some();

    target
        .deploy_to_slot(cancel.clone(), cfg, slot)
        .await
        .map_err(DeployError::Unavailable)?;

    match slot {
        Slot::Blue => state.blue_version = Some(cfg.version.clone()),
        Slot::Green => state.green_version = Some(cfg.version.clone()),
    }

    if let Some(health_check) = &cfg.health_check {
        if health_check.enabled {
            let healthy = target
                .check_health(&cfg.name, &cfg.environment, slot)
                .await
                .map_err(DeployError::Unavailable)?;
            if !healthy {
                return Err(DeployError::Unavailable(
                    "health check reported unhealthy".to_string(),
                ));
            }
        }
    }

    match slot {
        Slot::Blue => state.blue_ready = true,
        Slot::Green => state.green_ready = true,
    }

    if cfg.auto_switch && had_active {
        switch_traffic(cancel, target, &cfg.name, &cfg.environment, slot, state).await?;
    } else if !had_active {
        // First deployment: the deployed slot becomes active without an
        // adapter call, since there is no prior traffic to move.
        state.active_slot = Some(slot);
    }

    info!(name = %cfg.name, environment = %cfg.environment, ?slot, "blue/green deploy ready");
    Ok(())
}

/// Switches traffic to `slot`, updating `active_slot` only on adapter
/// success.
pub async fn switch_traffic(
    cancel: CancelToken,
    target: &dyn BlueGreenTarget,
    name: &str,
    environment: &str,
    slot: Slot,
    state: &mut BlueGreenState,
) -> Result<()> {
    target
        .switch_traffic(cancel, name, environment, slot)
        .await
        .map_err(DeployError::Unavailable)?;
    state.active_slot = Some(slot);
    Ok(())
}

/// Flips `active_slot` to the opposite slot without redeploying.
pub fn switch(state: &mut BlueGreenState) -> Result<()> {
    let current = state
        .active_slot
        .ok_or_else(|| DeployError::Conflict("no active slot".to_string()))?;
    state.active_slot = Some(current.opposite());
    Ok(())
}

/// Equivalent to `switch` at this layer; the adapter owns slot semantics.
pub fn rollback(state: &mut BlueGreenState) -> Result<()> {
    switch(state)
}

pub async fn cleanup(
    cancel: CancelToken,
    target: &dyn BlueGreenTarget,
    name: &str,
    environment: &str,
    state: &BlueGreenState,
) -> Result<()> {
    let active = state
        .active_slot
        .ok_or_else(|| DeployError::Conflict("no active slot".to_string()))?;
    target
        .cleanup_slot(cancel, name, environment, active.opposite())
        .await
        .map_err(DeployError::Unavailable)
}
