//! Pre/post-deploy hooks for rolling and recreate (§4.3).

use async_trait::async_trait;
use fleetops_types::deployment::DeployConfig;

#[async_trait]
pub trait DeployHook: Send + Sync {
    async fn run(&self, cfg: &DeployConfig) -> Result<(), String>;
}

/// A hook slot: `None` means "no hook configured", which always succeeds.
pub type OptionalHook = Option<std::sync::Arc<dyn DeployHook>>;

pub async fn run_optional(hook: &OptionalHook, cfg: &DeployConfig) -> Result<(), String> {
    match hook {
        Some(h) => h.run(cfg).await,
        None => Ok(()),
    }
}
