//! The supervised-run primitive (§4.1).
//!
//! Owns a cancellation token, a mutex guarding status + history, and a
//! terminal signal observable by [`SupervisedRun::wait`]. Status
//! transitions are appended to history under the mutex before any observer
//! is notified, so `status_history()` never races ahead of a concurrent
//! `status()` read.

use crate::cancel::CancelToken;
use fleetops_types::status::{StatusHistoryEntry, Terminal};
use std::time::Duration;
use tokio::sync::{watch, Mutex};

/// Cancellable, supervised execution of one entity carrying status `S`.
pub struct SupervisedRun<S: Terminal + Send + Sync + 'static> {
    cancel: CancelToken,
    state: Mutex<RunState<S>>,
    terminal_tx: watch::Sender<bool>,
    terminal_rx: watch::Receiver<bool>,
}

struct RunState<S: Terminal> {
    status: S,
    history: Vec<StatusHistoryEntry<S>>,
}

impl<S: Terminal + Send + Sync + Clone + 'static> SupervisedRun<S> {
    pub fn new(initial: S, message: impl Into<String>) -> Self {
        let (terminal_tx, terminal_rx) = watch::channel(initial.is_terminal());
        Self {
            cancel: CancelToken::new(),
            state: Mutex::new(RunState {
                status: initial,
                history: vec![StatusHistoryEntry::new(initial, message)],
            }),
            terminal_tx,
            terminal_rx,
        }
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Record a status transition. Never call this after a terminal status
    /// has already been recorded — callers are expected to stop driving the
    /// state machine once `status().is_terminal()`.
    pub async fn transition(&self, status: S, message: impl Into<String>) {
        let is_terminal = status.is_terminal();
        {
            let mut guard = self.state.lock().await;
            guard.status = status;
            guard.history.push(StatusHistoryEntry::new(status, message));
        }
        if is_terminal {
            let _ = self.terminal_tx.send(true);
        }
    }

    pub async fn status(&self) -> S {
        self.state.lock().await.status
    }

    pub async fn status_history(&self) -> Vec<StatusHistoryEntry<S>> {
        self.state.lock().await.history.clone()
    }

    /// Idempotent. A no-op once the run is already terminal.
    pub async fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Resolve when the run reaches a terminal status, or when `deadline`
    /// elapses — whichever comes first.
    pub async fn wait(&self, deadline: Duration) -> bool {
        if *self.terminal_rx.borrow() {
            return true;
        }
        let mut rx = self.terminal_rx.clone();
        tokio::time::timeout(deadline, async {
            while !*rx.borrow() {
                if rx.changed().await.is_err() {
                    break;
                }
            }
        })
        .await
        .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetops_types::status::RunStatus;

    #[tokio::test]
    async fn wait_returns_true_once_terminal() {
        let run = SupervisedRun::new(RunStatus::Pending, "created");
        run.transition(RunStatus::Running, "started").await;
        let run_ref = &run;
        tokio::join!(
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                run_ref.transition(RunStatus::Success, "done").await;
            },
            async {
                let terminal = run_ref.wait(Duration::from_secs(1)).await;
                assert!(terminal);
            }
        );
        assert_eq!(run.status().await, RunStatus::Success);
    }

    #[tokio::test]
    async fn wait_times_out_before_terminal() {
        let run = SupervisedRun::new(RunStatus::Running, "started");
        let terminal = run.wait(Duration::from_millis(20)).await;
        assert!(!terminal);
    }

    #[tokio::test]
    async fn history_is_append_only_and_ordered() {
        let run = SupervisedRun::new(RunStatus::Pending, "created");
        run.transition(RunStatus::Running, "started").await;
        run.transition(RunStatus::Success, "done").await;
        let history = run.status_history().await;
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].status, RunStatus::Pending);
        assert_eq!(history[2].status, RunStatus::Success);
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let run: SupervisedRun<RunStatus> = SupervisedRun::new(RunStatus::Running, "started");
        run.cancel().await;
        run.cancel().await;
        assert!(run.cancel_token().is_cancelled());
    }
}
