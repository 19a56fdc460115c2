//! Pipeline Engine event payloads, broadcast on a bounded channel (§9).

use fleetops_types::RunId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    RunStarted {
        run_id: RunId,
        pipeline_name: String,
    },
    StageStarted {
        run_id: RunId,
        stage_name: String,
    },
    StageCompleted {
        run_id: RunId,
        stage_name: String,
        succeeded: bool,
    },
    JobAttempt {
        run_id: RunId,
        job_name: String,
        attempt: u32,
        succeeded: bool,
    },
    RunFinished {
        run_id: RunId,
        status: fleetops_types::RunStatus,
    },
}
