//! Pipeline Engine (§4.2/C3).

use crate::error::{PipelineError, Result};
use crate::events::PipelineEvent;
use crate::executor::{JobContext, JobExecutor, NoOpExecutor};
use dashmap::DashMap;
use fleetops_runtime::{CancelToken, SupervisedRun};
use fleetops_types::pipeline::{
    JobSpec, JobState, Pipeline, PipelineRun, Stage, StageState, TriggerContext, TriggerKind,
};
use fleetops_types::{RunId, RunStatus};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tracing::{info, instrument, warn};

/// Options accepted by [`PipelineEngine::run`].
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub variables: HashMap<String, String>,
}

/// A started run: its mutable [`PipelineRun`] snapshot plus the supervisor
/// that owns its cancellation token and authoritative status history.
pub struct RunHandle {
    pub supervisor: SupervisedRun<RunStatus>,
    data: RwLock<PipelineRun>,
}

impl RunHandle {
    pub async fn snapshot(&self) -> PipelineRun {
        self.data.read().await.clone()
    }
}

/// Registers pipelines, installs job executors, and drives runs to
/// completion per the execution model in §4.2.
pub struct PipelineEngine {
    pipelines: DashMap<String, Pipeline>,
    executors: DashMap<String, Arc<dyn JobExecutor>>,
    runs: DashMap<String, Arc<RunHandle>>,
    runs_by_pipeline: DashMap<String, Vec<String>>,
    event_tx: broadcast::Sender<PipelineEvent>,
    dropped_events: AtomicU64,
}

impl Default for PipelineEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineEngine {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(1024);
        Self {
            pipelines: DashMap::new(),
            executors: DashMap::new(),
            runs: DashMap::new(),
            runs_by_pipeline: DashMap::new(),
            event_tx,
            dropped_events: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.event_tx.subscribe()
    }

    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    fn publish(&self, event: PipelineEvent) {
        if self.event_tx.send(event).is_err() {
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn validate(spec: &Pipeline) -> Result<()> {
        if spec.name.trim().is_empty() {
            return Err(PipelineError::InvalidSpec("name must not be empty".into()));
        }
        if spec.stages.is_empty() {
            return Err(PipelineError::InvalidSpec(
                "pipeline must have at least one stage".into(),
            ));
        }
        for stage in &spec.stages {
            if stage.jobs.is_empty() {
                return Err(PipelineError::InvalidSpec(format!(
                    "stage '{}' must have at least one job",
                    stage.name
                )));
            }
        }
        Ok(())
    }

    #[instrument(skip(self, spec), fields(pipeline = %spec.name))]
    pub fn register(&self, spec: Pipeline) -> Result<Pipeline> {
        Self::validate(&spec)?;
        if self.pipelines.contains_key(&spec.name) {
            return Err(PipelineError::AlreadyExists(spec.name));
        }
        self.pipelines.insert(spec.name.clone(), spec.clone());
        info!("pipeline registered");
        Ok(spec)
    }

    pub fn register_executor(&self, id: impl Into<String>, executor: Arc<dyn JobExecutor>) {
        self.executors.insert(id.into(), executor);
    }

    fn resolve_executor(&self, id: &str) -> Arc<dyn JobExecutor> {
        self.executors
            .get(id)
            .map(|e| e.clone())
            .unwrap_or_else(|| Arc::new(NoOpExecutor))
    }

    pub fn get(&self, name: &str) -> Option<Pipeline> {
        self.pipelines.get(name).map(|p| p.clone())
    }

    pub fn list(&self) -> Vec<Pipeline> {
        self.pipelines.iter().map(|e| e.value().clone()).collect()
    }

    pub async fn runs(&self, name: &str) -> Vec<PipelineRun> {
        let mut out = Vec::new();
        if let Some(ids) = self.runs_by_pipeline.get(name) {
            for id in ids.value() {
                if let Some(handle) = self.runs.get(id) {
                    out.push(handle.snapshot().await);
                }
            }
        }
        out
    }

    pub fn get_run_handle(&self, run_id: &str) -> Option<Arc<RunHandle>> {
        self.runs.get(run_id).map(|r| r.clone())
    }

    /// Fires the set of registered pipelines whose trigger and branch filter
    /// match, starting one run per match (§4.2). Unknown/no matches yield an
    /// empty set; failures to start a run are logged, not propagated.
    #[instrument(skip(self, ctx))]
    pub async fn trigger_by_event(
        &self,
        trigger_kind: TriggerKind,
        ctx: TriggerContext,
    ) -> Vec<RunId> {
        let matching: Vec<Pipeline> = self
            .pipelines
            .iter()
            .filter(|e| e.value().matches(trigger_kind, &ctx))
            .map(|e| e.value().clone())
            .collect();

        let mut started = Vec::new();
        for pipeline in matching {
            match self
                .run(&pipeline.name, Duration::from_secs(3600), RunOptions::default())
                .await
            {
                Ok(handle) => started.push(handle.snapshot().await.id),
                Err(err) => warn!(pipeline = %pipeline.name, %err, "trigger failed to start run"),
            }
        }
        started
    }

    /// Creates a [`PipelineRun`] with deep-copied stages/jobs and starts
    /// asynchronous execution, returning the handle immediately.
    #[instrument(skip(self, options), fields(pipeline = %name))]
    pub async fn run(
        &self,
        name: &str,
        _deadline: Duration,
        options: RunOptions,
    ) -> Result<Arc<RunHandle>> {
        let pipeline = self
            .get(name)
            .ok_or_else(|| PipelineError::NotFound(name.to_string()))?;

        let run_id = RunId::generate();
        let stages: Vec<StageState> = pipeline
            .stages
            .iter()
            .map(|s| StageState {
                name: s.name.clone(),
                status: RunStatus::Pending,
                jobs: s
                    .jobs
                    .iter()
                    .map(|j| JobState {
                        name: j.name.clone(),
                        attempts: 0,
                        status: RunStatus::Pending,
                        artifacts: Vec::new(),
                    })
                    .collect(),
            })
            .collect();

        let data = PipelineRun {
            id: run_id.clone(),
            pipeline_name: pipeline.name.clone(),
            variables: options.variables.clone(),
            stages,
            artifacts: Vec::new(),
            status: RunStatus::Pending,
            status_history: Vec::new(),
            started_at: chrono::Utc::now(),
            ended_at: None,
        };

        let handle = Arc::new(RunHandle {
            supervisor: SupervisedRun::new(RunStatus::Pending, "run created"),
            data: RwLock::new(data),
        });

        self.runs
            .insert(run_id.as_str().to_string(), handle.clone());
        self.runs_by_pipeline
            .entry(pipeline.name.clone())
            .or_default()
            .push(run_id.as_str().to_string());

        self.publish(PipelineEvent::RunStarted {
            run_id: run_id.clone(),
            pipeline_name: pipeline.name.clone(),
        });

        let executors: HashMap<String, Arc<dyn JobExecutor>> = pipeline
            .stages
            .iter()
            .flat_map(|s| s.jobs.iter())
            .map(|j| (j.executor_id.clone(), self.resolve_executor(&j.executor_id)))
            .collect();
        let event_tx = self.event_tx.clone();
        let run_id_for_task = run_id.clone();
        let stages_spec = pipeline.stages.clone();
        let variables = options.variables;
        let handle_for_task = handle.clone();

        tokio::spawn(async move {
            execute_run(
                handle_for_task,
                run_id_for_task,
                stages_spec,
                variables,
                executors,
                event_tx,
            )
            .await;
        });

        Ok(handle)
    }
}

async fn execute_run(
    handle: Arc<RunHandle>,
    run_id: RunId,
    stages: Vec<Stage>,
    variables: HashMap<String, String>,
    executors: HashMap<String, Arc<dyn JobExecutor>>,
    event_tx: broadcast::Sender<PipelineEvent>,
) {
    let cancel = handle.supervisor.cancel_token();
    handle
        .supervisor
        .transition(RunStatus::Running, "execution started")
        .await;
    {
        let mut data = handle.data.write().await;
        data.status = RunStatus::Running;
    }

    let mut run_failed = false;
    let mut run_cancelled = false;

    for (stage_idx, stage) in stages.iter().enumerate() {
        if cancel.is_cancelled() {
            run_cancelled = true;
            break;
        }

        let _ = event_tx.send(PipelineEvent::StageStarted {
            run_id: run_id.clone(),
            stage_name: stage.name.clone(),
        });
        set_stage_status(&handle, stage_idx, RunStatus::Running).await;

        let stage_ok = if stage.parallel {
            run_parallel_stage(
                &handle, &run_id, stage_idx, stage, &variables, &executors, &cancel, &event_tx,
            )
            .await
        } else {
            run_sequential_stage(
                &handle, &run_id, stage_idx, stage, &variables, &executors, &cancel, &event_tx,
            )
            .await
        };

        let stage_status = if cancel.is_cancelled() {
            RunStatus::Canceled
        } else if stage_ok {
            RunStatus::Success
        } else {
            RunStatus::Failed
        };
        set_stage_status(&handle, stage_idx, stage_status).await;
        let _ = event_tx.send(PipelineEvent::StageCompleted {
            run_id: run_id.clone(),
            stage_name: stage.name.clone(),
            succeeded: stage_status == RunStatus::Success,
        });

        if cancel.is_cancelled() {
            run_cancelled = true;
            break;
        }
        if !stage_ok {
            run_failed = true;
            break;
        }
    }

    let final_status = if run_cancelled {
        RunStatus::Canceled
    } else if run_failed {
        RunStatus::Failed
    } else {
        RunStatus::Success
    };

    handle
        .supervisor
        .transition(final_status, format!("run finished: {final_status:?}"))
        .await;
    {
        let mut data = handle.data.write().await;
        data.status = final_status;
        data.status_history = handle.supervisor.status_history().await;
        data.ended_at = Some(chrono::Utc::now());
    }
    let _ = event_tx.send(PipelineEvent::RunFinished {
        run_id,
        status: final_status,
    });
}

async fn set_stage_status(handle: &RunHandle, stage_idx: usize, status: RunStatus) {
    let mut data = handle.data.write().await;
    if let Some(stage) = data.stages.get_mut(stage_idx) {
        stage.status = status;
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_sequential_stage(
    handle: &RunHandle,
    run_id: &RunId,
    stage_idx: usize,
    stage: &Stage,
    variables: &HashMap<String, String>,
    executors: &HashMap<String, Arc<dyn JobExecutor>>,
    cancel: &CancelToken,
    event_tx: &broadcast::Sender<PipelineEvent>,
) -> bool {
    for (job_idx, job) in stage.jobs.iter().enumerate() {
        if cancel.is_cancelled() {
            return false;
        }
        let (ok, attempts, artifacts) =
            run_job_with_retries(job, variables, executors, cancel, run_id, event_tx).await;
        record_job_result(handle, stage_idx, job_idx, attempts, ok, &artifacts).await;
        if ok {
            append_artifacts(handle, artifacts).await;
        } else {
            return false;
        }
    }
    true
}

#[allow(clippy::too_many_arguments)]
async fn run_parallel_stage(
    handle: &RunHandle,
    run_id: &RunId,
    stage_idx: usize,
    stage: &Stage,
    variables: &HashMap<String, String>,
    executors: &HashMap<String, Arc<dyn JobExecutor>>,
    cancel: &CancelToken,
    event_tx: &broadcast::Sender<PipelineEvent>,
) -> bool {
    // All jobs start before any joins: build every future first, then await
    // them together via `join_all` (§8: "every job in the stage is invoked
    // at least once before any join").
    let futures: Vec<_> = stage
        .jobs
        .iter()
        .map(|job| run_job_with_retries(job, variables, executors, cancel, run_id, event_tx))
        .collect();
    let results = futures::future::join_all(futures).await;

    let mut all_ok = true;
    for (job_idx, (ok, attempts, artifacts)) in results.into_iter().enumerate() {
        record_job_result(handle, stage_idx, job_idx, attempts, ok, &artifacts).await;
        if ok {
            append_artifacts(handle, artifacts).await;
        } else {
            all_ok = false;
        }
    }
    all_ok
}

/// Runs one job for up to `max(1, retries)` attempts. An attempt fails when
/// the executor returns a failure, the run's cancellation fires, or the
/// attempt overruns `job.timeout` (§4.2). Each attempt gets its own child of
/// the run's cancel token so a timed-out attempt doesn't cancel the run.
async fn run_job_with_retries(
    job: &JobSpec,
    variables: &HashMap<String, String>,
    executors: &HashMap<String, Arc<dyn JobExecutor>>,
    cancel: &CancelToken,
    run_id: &RunId,
    event_tx: &broadcast::Sender<PipelineEvent>,
) -> (bool, u32, Vec<String>) {
    let executor = executors
        .get(&job.executor_id)
        .cloned()
        .unwrap_or_else(|| Arc::new(NoOpExecutor));

    let mut attempts = 0;
    for attempt in 1..=job.max_attempts() {
        attempts = attempt;
        if cancel.is_cancelled() {
            let _ = event_tx.send(PipelineEvent::JobAttempt {
                run_id: run_id.clone(),
                job_name: job.name.clone(),
                attempt,
                succeeded: false,
            });
            return (false, attempts, Vec::new());
        }
        let attempt_cancel = cancel.child();
        let ctx = JobContext {
            job_name: &job.name,
            attempt,
            variables,
            cancel: attempt_cancel.clone(),
            timeout: job.timeout,
        };
        let result = match tokio::time::timeout(job.timeout, executor.execute(ctx)).await {
            Ok(result) => result,
            Err(_) => {
                attempt_cancel.cancel();
                Err(format!("job '{}' timed out after {:?}", job.name, job.timeout))
            }
        };
        let succeeded = result.is_ok();
        let _ = event_tx.send(PipelineEvent::JobAttempt {
            run_id: run_id.clone(),
            job_name: job.name.clone(),
            attempt,
            succeeded,
        });
        if let Ok(artifacts) = result {
            return (true, attempts, artifacts);
        }
    }
    (false, attempts, Vec::new())
}

async fn record_job_result(
    handle: &RunHandle,
    stage_idx: usize,
    job_idx: usize,
    attempts: u32,
    succeeded: bool,
    artifacts: &[String],
) {
    let mut data = handle.data.write().await;
    if let Some(stage) = data.stages.get_mut(stage_idx) {
        if let Some(job) = stage.jobs.get_mut(job_idx) {
            job.attempts = attempts;
            job.status = if succeeded {
                RunStatus::Success
            } else {
                RunStatus::Failed
            };
            job.artifacts = artifacts.to_vec();
        }
    }
}

async fn append_artifacts(handle: &RunHandle, artifacts: Vec<String>) {
    if artifacts.is_empty() {
        return;
    }
    let mut data = handle.data.write().await;
    data.artifacts.extend(artifacts);
}
