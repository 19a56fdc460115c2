//! `JobExecutor` target adapter contract (§4.7/C1).

use async_trait::async_trait;
use fleetops_runtime::CancelToken;
use std::collections::HashMap;
use std::time::Duration;

/// Read-only view of a job's execution context. Executors must not retain
/// this beyond the call (§4.7).
pub struct JobContext<'a> {
    pub job_name: &'a str,
    pub attempt: u32,
    pub variables: &'a HashMap<String, String>,
    pub cancel: CancelToken,
    /// Per-attempt deadline from `JobSpec.timeout`. The engine enforces this
    /// around the call; executors may also consult it for their own pacing.
    pub timeout: Duration,
}

/// A pluggable job executor, keyed by `executor_id` on a [`JobSpec`](fleetops_types::pipeline::JobSpec).
#[async_trait]
pub trait JobExecutor: Send + Sync {
    /// Run one attempt. `Ok(artifacts)` on success; `Err(reason)` on failure.
    async fn execute(&self, ctx: JobContext<'_>) -> Result<Vec<String>, String>;
}

/// The executor installed for unknown/unregistered executor IDs (§4.2):
/// a no-op success.
pub struct NoOpExecutor;

#[async_trait]
impl JobExecutor for NoOpExecutor {
    async fn execute(&self, _ctx: JobContext<'_>) -> Result<Vec<String>, String> {
        Ok(Vec::new())
    }
}
