//! # fleetops-types
//!
//! Shared data model for the FleetOps control plane: identifiers, status
//! sum types, and the entity shapes for the Pipeline Engine, Deployment
//! Strategies, Rollback Manager, DDoS Protection, and Alert Manager.
//!
//! This crate intentionally carries no behavior beyond small invariant
//! helpers (e.g. [`deployment::BlueGreenState::target_slot`]) — the engines
//! that own these entities live in their own crates.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]

pub mod alerts;
pub mod dashboard;
pub mod ddos;
pub mod deployment;
pub mod environment;
pub mod events;
pub mod ids;
pub mod pipeline;
pub mod rollback;
pub mod status;

pub use environment::EnvironmentKind;
pub use events::{EventEnvelope, EventSeverity, EventSource};
pub use ids::{AlertId, AttackEventId, DeploymentId, ReleaseKey, RunId, SilenceId};
pub use status::{CanaryStatus, DeploymentStatus, RunStatus, StatusHistoryEntry};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_status_terminal() {
        assert!(RunStatus::Success.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert!(RunStatus::Canceled.is_terminal());
        assert!(!RunStatus::Pending.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
    }

    #[test]
    fn blue_green_target_slot_starts_blue() {
        let state = deployment::BlueGreenState::default();
        assert_eq!(state.target_slot(), deployment::Slot::Blue);
    }

    #[test]
    fn blue_green_target_slot_flips_on_active() {
        let mut state = deployment::BlueGreenState::default();
        state.active_slot = Some(deployment::Slot::Blue);
        assert_eq!(state.target_slot(), deployment::Slot::Green);
    }

    #[test]
    fn silence_matches_subset_of_labels() {
        use std::collections::HashMap;
        let mut matchers = HashMap::new();
        matchers.insert("env".to_string(), "staging".to_string());
        let silence = alerts::Silence {
            id: SilenceId::generate(),
            matchers,
            starts_at: chrono::Utc::now() - chrono::Duration::minutes(1),
            ends_at: chrono::Utc::now() + chrono::Duration::minutes(1),
            created_by: "op".to_string(),
            comment: String::new(),
        };
        let mut labels = HashMap::new();
        labels.insert("env".to_string(), "staging".to_string());
        labels.insert("service".to_string(), "api".to_string());
        assert!(silence.matches(&labels));
        assert!(silence.is_active_at(chrono::Utc::now()));

        let mut other = HashMap::new();
        other.insert("env".to_string(), "production".to_string());
        assert!(!silence.matches(&other));
    }
}
