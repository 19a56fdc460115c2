//! Cross-engine event envelope for observability.
//!
//! Each engine defines its own event payload enum and broadcasts it on its
//! own channel (§9: "model as multi-producer/single-consumer channels with
//! bounded capacity and explicit drop counters"). This module supplies the
//! shared envelope wrapping whatever payload an engine chooses.

use crate::environment::EnvironmentKind;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which engine an event originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSource {
    Pipeline,
    Deployment,
    Rollback,
    Ddos,
    Alert,
    ControlPlane,
}

/// Severity assigned to an event for downstream filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

/// Envelope wrapping an engine-specific event payload `T`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope<T> {
    pub id: Uuid,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub source: EventSource,
    pub severity: EventSeverity,
    pub environment: EnvironmentKind,
    pub correlation_id: Option<String>,
    pub event: T,
}

impl<T> EventEnvelope<T> {
    pub fn new(
        event: T,
        source: EventSource,
        severity: EventSeverity,
        environment: EnvironmentKind,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
            source,
            severity,
            environment,
            correlation_id: None,
            event,
        }
    }

    pub fn with_correlation(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }
}
