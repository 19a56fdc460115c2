//! Target Adapter Contracts (§4.7/C1).
//!
//! Adapters receive a cancellation token and an immutable view of the
//! current configuration at call time; per §9 they must not retain either
//! beyond the call.

use async_trait::async_trait;
use fleetops_runtime::CancelToken;
use fleetops_types::deployment::{BlueGreenConfig, CanaryMetrics, DeployConfig, Slot};

/// Side-effecting operations for rolling/recreate deployments.
#[async_trait]
pub trait DeployTarget: Send + Sync {
    async fn deploy(&self, cancel: CancelToken, cfg: &DeployConfig) -> Result<(), String>;
    async fn rollback(&self, cancel: CancelToken, cfg: &DeployConfig) -> Result<(), String>;
    async fn status(&self, name: &str, environment: &str) -> Result<String, String>;
    async fn scale(
        &self,
        cancel: CancelToken,
        name: &str,
        environment: &str,
        replicas: u32,
    ) -> Result<(), String>;
}

/// Side-effecting operations for canary deployments.
#[async_trait]
pub trait CanaryTarget: Send + Sync {
    async fn set_weight(
        &self,
        cancel: CancelToken,
        name: &str,
        environment: &str,
        weight: u32,
    ) -> Result<(), String>;
    async fn get_metrics(&self, name: &str, environment: &str) -> Option<CanaryMetrics>;
    async fn rollback(&self, cancel: CancelToken, name: &str, environment: &str) -> Result<(), String>;
    async fn promote(&self, cancel: CancelToken, name: &str, environment: &str) -> Result<(), String>;
}

/// Side-effecting operations for blue/green deployments.
#[async_trait]
pub trait BlueGreenTarget: Send + Sync {
    async fn deploy_to_slot(
        &self,
        cancel: CancelToken,
        cfg: &BlueGreenConfig,
        slot: Slot,
    ) -> Result<(), String>;
    async fn switch_traffic(
        &self,
        cancel: CancelToken,
        name: &str,
        environment: &str,
        slot: Slot,
    ) -> Result<(), String>;
    async fn check_health(&self, name: &str, environment: &str, slot: Slot) -> Result<bool, String>;
    async fn cleanup_slot(
        &self,
        cancel: CancelToken,
        name: &str,
        environment: &str,
        slot: Slot,
    ) -> Result<(), String>;
}

/// An adapter that always succeeds; useful for tests and as a documented
/// default wiring.
pub struct NoOpDeployTarget;

#[async_trait]
impl DeployTarget for NoOpDeployTarget {
    async fn deploy(&self, _cancel: CancelToken, _cfg: &DeployConfig) -> Result<(), String> {
        Ok(())
    }
    async fn rollback(&self, _cancel: CancelToken, _cfg: &DeployConfig) -> Result<(), String> {
        Ok(())
    }
    async fn status(&self, _name: &str, _environment: &str) -> Result<String, String> {
        Ok("unknown".to_string())
    }
    async fn scale(
        &self,
        _cancel: CancelToken,
        _name: &str,
        _environment: &str,
        _replicas: u32,
    ) -> Result<(), String> {
        Ok(())
    }
}

#[async_trait]
impl CanaryTarget for NoOpDeployTarget {
    async fn set_weight(
        &self,
        _cancel: CancelToken,
        _name: &str,
        _environment: &str,
        _weight: u32,
    ) -> Result<(), String> {
        Ok(())
    }
    async fn get_metrics(&self, _name: &str, _environment: &str) -> Option<CanaryMetrics> {
        None
    }
    async fn rollback(&self, _cancel: CancelToken, _name: &str, _environment: &str) -> Result<(), String> {
        Ok(())
    }
    async fn promote(&self, _cancel: CancelToken, _name: &str, _environment: &str) -> Result<(), String> {
        Ok(())
    }
}

#[async_trait]
impl BlueGreenTarget for NoOpDeployTarget {
    async fn deploy_to_slot(
        &self,
        _cancel: CancelToken,
        _cfg: &BlueGreenConfig,
        _slot: Slot,
    ) -> Result<(), String> {
        Ok(())
    }
    async fn switch_traffic(
        &self,
        _cancel: CancelToken,
        _name: &str,
        _environment: &str,
        _slot: Slot,
    ) -> Result<(), String> {
        Ok(())
    }
    async fn check_health(&self, _name: &str, _environment: &str, _slot: Slot) -> Result<bool, String> {
        Ok(true)
    }
    async fn cleanup_slot(
        &self,
        _cancel: CancelToken,
        _name: &str,
        _environment: &str,
        _slot: Slot,
    ) -> Result<(), String> {
        Ok(())
    }
}
