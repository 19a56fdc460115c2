//! Pipeline Engine data model (§3, §4.2).

use crate::ids::RunId;
use crate::status::{RunStatus, StatusHistoryEntry};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// What kind of external trigger a pipeline reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Push,
    PullRequest,
    Tag,
    Schedule,
    Manual,
}

/// Context supplied alongside a trigger; fields not relevant to the trigger
/// kind are left `None`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerContext {
    pub branch: Option<String>,
    pub commit: Option<String>,
    pub tag: Option<String>,
}

/// A single job within a stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSpec {
    pub name: String,
    pub executor_id: String,
    pub retries: u32,
    #[serde(with = "crate::status::duration_millis")]
    pub timeout: std::time::Duration,
}

impl JobSpec {
    /// `max(1, retries)` attempts, per §4.2.
    pub fn max_attempts(&self) -> u32 {
        self.retries.max(1)
    }
}

/// An ordered group of jobs, executed sequentially or concurrently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    pub name: String,
    pub jobs: Vec<JobSpec>,
    pub parallel: bool,
}

/// A registered pipeline definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    pub name: String,
    pub trigger: TriggerKind,
    pub branch_filter: HashSet<String>,
    pub stages: Vec<Stage>,
}

impl Pipeline {
    /// Whether `trigger_kind` + `ctx` would fire this pipeline, per §4.2.
    pub fn matches(&self, trigger_kind: TriggerKind, ctx: &TriggerContext) -> bool {
        if self.trigger != trigger_kind {
            return false;
        }
        match trigger_kind {
            TriggerKind::Push => match &ctx.branch {
                Some(branch) => self.branch_filter.is_empty() || self.branch_filter.contains(branch),
                None => self.branch_filter.is_empty(),
            },
            _ => true,
        }
    }
}

/// Result of executing one job attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobState {
    pub name: String,
    pub attempts: u32,
    pub status: RunStatus,
    pub artifacts: Vec<String>,
}

/// Runtime state of one stage within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageState {
    pub name: String,
    pub status: RunStatus,
    pub jobs: Vec<JobState>,
}

/// A live or completed execution of a [`Pipeline`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: RunId,
    pub pipeline_name: String,
    pub variables: std::collections::HashMap<String, String>,
    pub stages: Vec<StageState>,
    pub artifacts: Vec<String>,
    pub status: RunStatus,
    pub status_history: Vec<StatusHistoryEntry<RunStatus>>,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub ended_at: Option<chrono::DateTime<chrono::Utc>>,
}
