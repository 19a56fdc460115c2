//! # fleetops-alerts
//!
//! The Alert Manager (§4.6/C7): rule registration with cooldowns, firing
//! gated by cooldown and active silences, and alert lifecycle tracking.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]

pub mod error;
pub mod manager;

pub use error::{AlertError, Result};
pub use manager::AlertManager;

#[cfg(test)]
mod tests {
    use super::*;
    use fleetops_types::alerts::{AlertRule, Severity, Silence};
    use fleetops_types::SilenceId;
    use std::collections::HashMap;
    use std::time::Duration;

    fn rule(name: &str, cooldown: Duration) -> AlertRule {
        AlertRule {
            name: name.to_string(),
            severity: Severity::Warning,
            condition_descriptor: "value > threshold".to_string(),
            threshold: 0.0,
            duration: Duration::from_secs(0),
            labels: HashMap::new(),
            channels: vec!["slack".to_string()],
            enabled: true,
            cooldown,
            last_fired: None,
        }
    }

    /// End-to-end scenario 4 (§8).
    #[test]
    fn cooldown_suppresses_second_fire() {
        let mgr = AlertManager::new();
        mgr.add_rule(rule("r", Duration::from_secs(3600))).unwrap();

        let first = mgr.fire_alert("r", "a", 1.0, HashMap::new()).unwrap();
        assert!(first.is_some());

        let second = mgr.fire_alert("r", "b", 2.0, HashMap::new()).unwrap();
        assert!(second.is_none());

        assert_eq!(mgr.list_active_alerts().len(), 1);
    }

    /// End-to-end scenario 5 (§8).
    #[test]
    fn silence_suppresses_matching_labels_only() {
        let mgr = AlertManager::new();
        mgr.add_rule(rule("r", Duration::from_secs(0))).unwrap();

        let mut matchers = HashMap::new();
        matchers.insert("env".to_string(), "staging".to_string());
        mgr.add_silence(Silence {
            id: SilenceId::generate(),
            matchers,
            starts_at: chrono::Utc::now() - chrono::Duration::minutes(1),
            ends_at: chrono::Utc::now() + chrono::Duration::minutes(1),
            created_by: "op".to_string(),
            comment: String::new(),
        })
        .unwrap();

        let mut staging = HashMap::new();
        staging.insert("env".to_string(), "staging".to_string());
        let silenced = mgr.fire_alert("r", "x", 1.0, staging).unwrap();
        assert!(silenced.is_none());

        let mut production = HashMap::new();
        production.insert("env".to_string(), "production".to_string());
        let fired = mgr.fire_alert("r", "x", 1.0, production).unwrap();
        assert!(fired.is_some());
    }

    #[test]
    fn add_rule_rejects_empty_name_and_duplicates() {
        let mgr = AlertManager::new();
        assert!(matches!(
            mgr.add_rule(rule("", Duration::from_secs(60))),
            Err(AlertError::InvalidSpec)
        ));
        mgr.add_rule(rule("r", Duration::from_secs(60))).unwrap();
        assert!(matches!(
            mgr.add_rule(rule("r", Duration::from_secs(60))),
            Err(AlertError::AlreadyExists(_))
        ));
    }

    #[test]
    fn add_rule_applies_defaults() {
        let mgr = AlertManager::new();
        let mut r = rule("r", Duration::from_secs(0));
        r.duration = Duration::from_secs(0);
        mgr.add_rule(r).unwrap();
        let stored = mgr.get_rule("r").unwrap();
        assert_eq!(stored.cooldown, Duration::from_secs(15 * 60));
        assert_eq!(stored.duration, Duration::from_secs(5 * 60));
        assert!(stored.enabled);
    }

    #[test]
    fn disabled_rule_does_not_fire() {
        let mgr = AlertManager::new();
        let mut r = rule("r", Duration::from_secs(0));
        r.enabled = false;
        mgr.add_rule(r).unwrap();
        let result = mgr.fire_alert("r", "x", 1.0, HashMap::new()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn resolve_and_acknowledge_update_alert() {
        let mgr = AlertManager::new();
        mgr.add_rule(rule("r", Duration::from_secs(0))).unwrap();
        let alert = mgr
            .fire_alert("r", "x", 1.0, HashMap::new())
            .unwrap()
            .unwrap();

        mgr.acknowledge_alert(alert.id.clone(), "op").unwrap();
        mgr.resolve_alert(alert.id.clone()).unwrap();

        assert_eq!(mgr.list_active_alerts().len(), 0);
        let by_sev = mgr.list_alerts_by_severity(Severity::Warning);
        assert_eq!(by_sev.len(), 1);
        assert_eq!(by_sev[0].acked_by.as_deref(), Some("op"));
    }

    #[test]
    fn add_silence_rejects_inverted_window() {
        let mgr = AlertManager::new();
        let now = chrono::Utc::now();
        let result = mgr.add_silence(Silence {
            id: SilenceId::generate(),
            matchers: HashMap::new(),
            starts_at: now,
            ends_at: now - chrono::Duration::minutes(1),
            created_by: "op".to_string(),
            comment: String::new(),
        });
        assert!(matches!(result, Err(AlertError::InvalidSilence)));
    }

    #[test]
    fn get_stats_counts_states_and_channels() {
        let mgr = AlertManager::new();
        mgr.add_rule(rule("r", Duration::from_secs(0))).unwrap();
        mgr.fire_alert("r", "x", 1.0, HashMap::new()).unwrap();

        let stats = mgr.get_stats();
        assert_eq!(stats.by_state.get("firing"), Some(&1));
        assert_eq!(stats.configured_channels, 1);
    }
}
