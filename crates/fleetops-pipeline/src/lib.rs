//! # fleetops-pipeline
//!
//! The Pipeline Engine (§4.2/C3): registers pipelines, triggers them by
//! event + branch filter, and runs their stages/jobs sequentially or in
//! parallel with per-job retries, artifact collection, and cooperative
//! cancellation.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]

pub mod engine;
pub mod error;
pub mod events;
pub mod executor;

pub use engine::{PipelineEngine, RunHandle, RunOptions};
pub use error::{PipelineError, Result};
pub use events::PipelineEvent;
pub use executor::{JobContext, JobExecutor, NoOpExecutor};

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fleetops_types::pipeline::{JobSpec, Pipeline, Stage, TriggerContext, TriggerKind};
    use fleetops_types::RunStatus;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct FlakyExecutor {
        failures_remaining: AtomicU32,
        attempts: Arc<AtomicU32>,
    }

    #[async_trait]
    impl JobExecutor for FlakyExecutor {
        async fn execute(&self, _ctx: JobContext<'_>) -> std::result::Result<Vec<String>, String> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.failures_remaining.fetch_sub(1, Ordering::SeqCst) > 0 {
                Err("simulated failure".to_string())
            } else {
                Ok(vec!["artifact.tar.gz".to_string()])
            }
        }
    }

    fn single_job_pipeline(name: &str, retries: u32) -> Pipeline {
        Pipeline {
            name: name.to_string(),
            trigger: TriggerKind::Manual,
            branch_filter: Default::default(),
            stages: vec![Stage {
                name: "build".to_string(),
                parallel: false,
                jobs: vec![JobSpec {
                    name: "compile".to_string(),
                    executor_id: "flaky".to_string(),
                    retries,
                    timeout: Duration::from_secs(30),
                }],
            }],
        }
    }

    /// End-to-end scenario 1 (§8): retries=3, executor fails twice then
    /// succeeds -> run succeeds and the executor was attempted 3 times.
    #[tokio::test]
    async fn pipeline_retry_success() {
        let engine = PipelineEngine::new();
        engine.register(single_job_pipeline("P", 3)).unwrap();

        let attempts = Arc::new(AtomicU32::new(0));
        engine.register_executor(
            "flaky",
            Arc::new(FlakyExecutor {
                failures_remaining: AtomicU32::new(2),
                attempts: attempts.clone(),
            }),
        );

        let handle = engine
            .run("P", Duration::from_secs(5), RunOptions::default())
            .await
            .unwrap();
        let terminal = handle.supervisor.wait(Duration::from_secs(5)).await;

        assert!(terminal);
        assert_eq!(handle.supervisor.status().await, RunStatus::Success);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    struct SlowExecutor {
        delay: Duration,
    }

    #[async_trait]
    impl JobExecutor for SlowExecutor {
        async fn execute(&self, _ctx: JobContext<'_>) -> std::result::Result<Vec<String>, String> {
            tokio::time::sleep(self.delay).await;
            Ok(Vec::new())
        }
    }

    /// A job whose executor outlives `JobSpec.timeout` is treated as a
    /// failed attempt, exhausting retries without the run itself hanging.
    #[tokio::test]
    async fn job_exceeding_timeout_fails_the_run() {
        let engine = PipelineEngine::new();
        let pipeline = Pipeline {
            name: "slow".to_string(),
            trigger: TriggerKind::Manual,
            branch_filter: Default::default(),
            stages: vec![Stage {
                name: "build".to_string(),
                parallel: false,
                jobs: vec![JobSpec {
                    name: "compile".to_string(),
                    executor_id: "slow".to_string(),
                    retries: 1,
                    timeout: Duration::from_millis(20),
                }],
            }],
        };
        engine.register(pipeline).unwrap();
        engine.register_executor(
            "slow",
            Arc::new(SlowExecutor {
                delay: Duration::from_millis(200),
            }),
        );

        let handle = engine
            .run("slow", Duration::from_secs(5), RunOptions::default())
            .await
            .unwrap();
        handle.supervisor.wait(Duration::from_secs(5)).await;
        assert_eq!(handle.supervisor.status().await, RunStatus::Failed);
    }

    #[tokio::test]
    async fn register_rejects_duplicate_and_empty_stage() {
        let engine = PipelineEngine::new();
        engine.register(single_job_pipeline("dup", 1)).unwrap();
        assert!(engine.register(single_job_pipeline("dup", 1)).is_err());

        let invalid = Pipeline {
            name: "empty".to_string(),
            trigger: TriggerKind::Manual,
            branch_filter: Default::default(),
            stages: vec![],
        };
        assert!(engine.register(invalid).is_err());
    }

    #[tokio::test]
    async fn trigger_by_event_matches_branch_filter() {
        let engine = PipelineEngine::new();
        let mut pipeline = single_job_pipeline("on-main", 1);
        pipeline.trigger = TriggerKind::Push;
        pipeline.branch_filter.insert("main".to_string());
        engine.register(pipeline).unwrap();
        engine.register_executor(
            "flaky",
            Arc::new(FlakyExecutor {
                failures_remaining: AtomicU32::new(0),
                attempts: Arc::new(AtomicU32::new(0)),
            }),
        );

        let ctx_main = TriggerContext {
            branch: Some("main".to_string()),
            ..Default::default()
        };
        let started = engine.trigger_by_event(TriggerKind::Push, ctx_main).await;
        assert_eq!(started.len(), 1);

        let ctx_other = TriggerContext {
            branch: Some("feature/x".to_string()),
            ..Default::default()
        };
        let started_other = engine.trigger_by_event(TriggerKind::Push, ctx_other).await;
        assert!(started_other.is_empty());
    }

    #[tokio::test]
    async fn parallel_stage_fails_if_any_job_fails() {
        let engine = PipelineEngine::new();
        let pipeline = Pipeline {
            name: "parallel".to_string(),
            trigger: TriggerKind::Manual,
            branch_filter: Default::default(),
            stages: vec![Stage {
                name: "fanout".to_string(),
                parallel: true,
                jobs: vec![
                    JobSpec {
                        name: "ok".to_string(),
                        executor_id: "ok".to_string(),
                        retries: 1,
                        timeout: Duration::from_secs(5),
                    },
                    JobSpec {
                        name: "bad".to_string(),
                        executor_id: "bad".to_string(),
                        retries: 1,
                        timeout: Duration::from_secs(5),
                    },
                ],
            }],
        };
        engine.register(pipeline).unwrap();
        engine.register_executor(
            "ok",
            Arc::new(FlakyExecutor {
                failures_remaining: AtomicU32::new(0),
                attempts: Arc::new(AtomicU32::new(0)),
            }),
        );
        engine.register_executor(
            "bad",
            Arc::new(FlakyExecutor {
                failures_remaining: AtomicU32::new(u32::MAX),
                attempts: Arc::new(AtomicU32::new(0)),
            }),
        );

        let handle = engine
            .run("parallel", Duration::from_secs(5), RunOptions::default())
            .await
            .unwrap();
        handle.supervisor.wait(Duration::from_secs(5)).await;
        assert_eq!(handle.supervisor.status().await, RunStatus::Failed);
    }
}
