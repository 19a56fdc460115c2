//! Alert Manager data model (§3, §4.6).

use crate::ids::{AlertId, SilenceId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Alert severity, ordered from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
    Fatal,
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Warning
    }
}

/// A registered alert rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRule {
    pub name: String,
    pub severity: Severity,
    pub condition_descriptor: String,
    pub threshold: f64,
    #[serde(with = "crate::status::duration_millis")]
    pub duration: Duration,
    pub labels: HashMap<String, String>,
    pub channels: Vec<String>,
    pub enabled: bool,
    #[serde(with = "crate::status::duration_millis")]
    pub cooldown: Duration,
    pub last_fired: Option<chrono::DateTime<chrono::Utc>>,
}

impl AlertRule {
    /// Apply the `§4.6` defaults for any field the caller left unspecified.
    pub fn with_defaults(mut self) -> Self {
        if self.cooldown.is_zero() {
            self.cooldown = Duration::from_secs(15 * 60);
        }
        if self.duration.is_zero() {
            self.duration = Duration::from_secs(5 * 60);
        }
        self
    }
}

/// Lifecycle state of a fired [`Alert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertState {
    Pending,
    Firing,
    Resolved,
    Silenced,
}

/// A single fired alert instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    pub rule_name: String,
    pub severity: Severity,
    pub state: AlertState,
    pub message: String,
    pub value: f64,
    pub threshold: f64,
    pub labels: HashMap<String, String>,
    pub fired_at: chrono::DateTime<chrono::Utc>,
    pub resolved_at: Option<chrono::DateTime<chrono::Utc>>,
    pub acked_at: Option<chrono::DateTime<chrono::Utc>>,
    pub acked_by: Option<String>,
}

/// A labelled suppression window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Silence {
    pub id: SilenceId,
    pub matchers: HashMap<String, String>,
    pub starts_at: chrono::DateTime<chrono::Utc>,
    pub ends_at: chrono::DateTime<chrono::Utc>,
    pub created_by: String,
    pub comment: String,
}

impl Silence {
    /// Active when `now` is in `[starts_at, ends_at)`.
    pub fn is_active_at(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        now >= self.starts_at && now < self.ends_at
    }

    /// Subset-match: every matcher key must equal the corresponding label.
    pub fn matches(&self, labels: &HashMap<String, String>) -> bool {
        self.matchers
            .iter()
            .all(|(k, v)| labels.get(k).map(|got| got == v).unwrap_or(false))
    }
}

/// Aggregate counts returned by `GetStats`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertStats {
    pub by_state: HashMap<String, usize>,
    pub by_severity: HashMap<String, usize>,
    pub active_silences: usize,
    pub configured_channels: usize,
}
