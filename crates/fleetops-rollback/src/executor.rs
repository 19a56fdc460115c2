//! `RollbackExecutor` target adapter contract (§4.7/C1).

use async_trait::async_trait;

#[async_trait]
pub trait RollbackExecutor: Send + Sync {
    async fn deploy(&self, artifact: &str) -> Result<(), String>;
    async fn set_weight(&self, name: &str, environment: &str, weight: u32) -> Result<(), String>;
    async fn validate(&self, artifact: &str) -> Result<(), String>;
    async fn get_current_version(&self, name: &str, environment: &str) -> Option<semver::Version>;
}

/// Installed when a release record carries no matching registered
/// executor; validation is trivially successful per §4.4.
pub struct NoOpRollbackExecutor;

#[async_trait]
impl RollbackExecutor for NoOpRollbackExecutor {
    async fn deploy(&self, _artifact: &str) -> Result<(), String> {
        Ok(())
    }
    async fn set_weight(&self, _name: &str, _environment: &str, _weight: u32) -> Result<(), String> {
        Ok(())
    }
    async fn validate(&self, _artifact: &str) -> Result<(), String> {
        Ok(())
    }
    async fn get_current_version(&self, _name: &str, _environment: &str) -> Option<semver::Version> {
        None
    }
}
