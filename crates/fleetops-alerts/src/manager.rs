//! The Alert Manager (§4.6/C7).

use crate::error::{AlertError, Result};
use dashmap::DashMap;
use fleetops_types::alerts::{Alert, AlertRule, AlertState, AlertStats, Severity, Silence};
use fleetops_types::{AlertId, SilenceId};
use std::collections::{HashMap, HashSet};
use tokio::sync::broadcast;
use tracing::{info, instrument};

/// Registers rules, fires alerts subject to cooldown and silences, and
/// tracks silences and fired-alert lifecycle.
pub struct AlertManager {
    rules: DashMap<String, AlertRule>,
    alerts: DashMap<AlertId, Alert>,
    silences: DashMap<SilenceId, Silence>,
    event_tx: broadcast::Sender<Alert>,
    dropped_events: std::sync::atomic::AtomicU64,
}

impl Default for AlertManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertManager {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            rules: DashMap::new(),
            alerts: DashMap::new(),
            silences: DashMap::new(),
            event_tx,
            dropped_events: std::sync::atomic::AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Alert> {
        self.event_tx.subscribe()
    }

    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(std::sync::atomic::Ordering::Relaxed)
    }

    /// Validates a non-empty name, applies `§4.6` defaults, and rejects
    /// duplicate registration.
    pub fn add_rule(&self, rule: AlertRule) -> Result<()> {
        if rule.name.trim().is_empty() {
            return Err(AlertError::InvalidSpec);
        }
        if self.rules.contains_key(&rule.name) {
            return Err(AlertError::AlreadyExists(rule.name));
        }
        self.rules.insert(rule.name.clone(), rule.with_defaults());
        Ok(())
    }

    pub fn enable_rule(&self, name: &str) -> Result<()> {
        let mut rule = self
            .rules
            .get_mut(name)
            .ok_or_else(|| AlertError::RuleNotFound(name.to_string()))?;
        rule.enabled = true;
        Ok(())
    }

    pub fn disable_rule(&self, name: &str) -> Result<()> {
        let mut rule = self
            .rules
            .get_mut(name)
            .ok_or_else(|| AlertError::RuleNotFound(name.to_string()))?;
        rule.enabled = false;
        Ok(())
    }

    pub fn get_rule(&self, name: &str) -> Option<AlertRule> {
        self.rules.get(name).map(|r| r.clone())
    }

    /// Fires an alert, or returns `Ok(None)` for cooldown / silence / a
    /// disabled rule — none of these are errors (§4.6, §7).
    #[instrument(skip(self, labels), fields(rule = %rule_name))]
    pub fn fire_alert(
        &self,
        rule_name: &str,
        message: &str,
        value: f64,
        labels: HashMap<String, String>,
    ) -> Result<Option<Alert>> {
        let mut rule = self
            .rules
            .get_mut(rule_name)
            .ok_or_else(|| AlertError::RuleNotFound(rule_name.to_string()))?;
        if !rule.enabled {
            return Ok(None);
        }

        let now = chrono::Utc::now();
        if let Some(last_fired) = rule.last_fired {
            if last_fired + chrono::Duration::from_std(rule.cooldown).unwrap_or_default() > now {
                return Ok(None);
            }
        }

        let silenced = self
            .silences
            .iter()
            .any(|s| s.is_active_at(now) && s.matches(&labels));
        if silenced {
            return Ok(None);
        }

        let alert = Alert {
            id: AlertId::generate(),
            rule_name: rule_name.to_string(),
            severity: rule.severity,
            state: AlertState::Firing,
            message: message.to_string(),
            value,
            threshold: rule.threshold,
            labels,
            fired_at: now,
            resolved_at: None,
            acked_at: None,
            acked_by: None,
        };
        rule.last_fired = Some(now);

        self.alerts.insert(alert.id.clone(), alert.clone());
        if self.event_tx.send(alert.clone()).is_err() {
            self.dropped_events
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
        info!(alert_id = %alert.id, "alert fired");
        Ok(Some(alert))
    }

    pub fn resolve_alert(&self, id: AlertId) -> Result<()> {
        let mut alert = self
            .alerts
            .get_mut(&id)
            .ok_or_else(|| AlertError::AlertNotFound(id.to_string()))?;
        alert.state = AlertState::Resolved;
        alert.resolved_at = Some(chrono::Utc::now());
        Ok(())
    }

    pub fn acknowledge_alert(&self, id: AlertId, user: &str) -> Result<()> {
        let mut alert = self
            .alerts
            .get_mut(&id)
            .ok_or_else(|| AlertError::AlertNotFound(id.to_string()))?;
        alert.acked_at = Some(chrono::Utc::now());
        alert.acked_by = Some(user.to_string());
        Ok(())
    }

    pub fn add_silence(&self, silence: Silence) -> Result<()> {
        if silence.ends_at < silence.starts_at {
            return Err(AlertError::InvalidSilence);
        }
        self.silences.insert(silence.id.clone(), silence);
        Ok(())
    }

    pub fn remove_silence(&self, id: SilenceId) {
        self.silences.remove(&id);
    }

    pub fn list_active_alerts(&self) -> Vec<Alert> {
        self.alerts
            .iter()
            .filter(|a| a.state == AlertState::Firing)
            .map(|a| a.clone())
            .collect()
    }

    pub fn list_alerts_by_severity(&self, severity: Severity) -> Vec<Alert> {
        self.alerts
            .iter()
            .filter(|a| a.severity == severity)
            .map(|a| a.clone())
            .collect()
    }

    pub fn get_stats(&self) -> AlertStats {
        let mut by_state: HashMap<String, usize> = HashMap::new();
        let mut by_severity: HashMap<String, usize> = HashMap::new();
        for alert in self.alerts.iter() {
            *by_state
                .entry(format!("{:?}", alert.state).to_lowercase())
                .or_insert(0) += 1;
            *by_severity
                .entry(format!("{:?}", alert.severity).to_lowercase())
                .or_insert(0) += 1;
        }
        let now = chrono::Utc::now();
        let active_silences = self
            .silences
            .iter()
            .filter(|s| s.is_active_at(now))
            .count();
        let configured_channels: HashSet<String> = self
            .rules
            .iter()
            .flat_map(|r| r.channels.clone())
            .collect();

        AlertStats {
            by_state,
            by_severity,
            active_silences,
            configured_channels: configured_channels.len(),
        }
    }
}
