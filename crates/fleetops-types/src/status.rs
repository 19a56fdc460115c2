//! Tagged-union status fields shared by supervised runs.

use serde::{Deserialize, Serialize};

/// Status of a supervised pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    Success,
    Failed,
    Canceled,
}

impl RunStatus {
    /// A run stops changing once it reaches one of these.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Success | RunStatus::Failed | RunStatus::Canceled
        )
    }
}

/// Status of a rolling/recreate deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStatus {
    Pending,
    Running,
    Success,
    Failed,
    Canceled,
    Rollback,
}

impl DeploymentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            DeploymentStatus::Success | DeploymentStatus::Failed | DeploymentStatus::Canceled
        )
    }
}

/// Status of a canary sub-state-machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanaryStatus {
    Pending,
    Running,
    Paused,
    Complete,
    RolledBack,
    Aborted,
}

impl CanaryStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CanaryStatus::Complete | CanaryStatus::RolledBack | CanaryStatus::Aborted
        )
    }
}

/// Common capability shared by every run-status sum type: knowing whether a
/// given value is terminal. Lets `fleetops-runtime`'s supervisor stay
/// generic over which engine's status enum it is driving.
pub trait Terminal: Copy {
    fn is_terminal(&self) -> bool;
}

impl Terminal for RunStatus {
    fn is_terminal(&self) -> bool {
        RunStatus::is_terminal(*self)
    }
}

impl Terminal for DeploymentStatus {
    fn is_terminal(&self) -> bool {
        DeploymentStatus::is_terminal(*self)
    }
}

impl Terminal for CanaryStatus {
    fn is_terminal(&self) -> bool {
        CanaryStatus::is_terminal(*self)
    }
}

/// One entry in a status-history sequence. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusHistoryEntry<S> {
    pub status: S,
    pub at: chrono::DateTime<chrono::Utc>,
    pub message: String,
}

impl<S: Clone> StatusHistoryEntry<S> {
    pub fn new(status: S, message: impl Into<String>) -> Self {
        Self {
            status,
            at: chrono::Utc::now(),
            message: message.into(),
        }
    }
}

/// Serializes a [`std::time::Duration`] as integer milliseconds, matching
/// the wire format used across the deployment and canary configuration.
pub mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
