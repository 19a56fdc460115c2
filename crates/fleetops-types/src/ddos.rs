//! DDoS Protection data model (§3, §4.5).

use crate::ids::AttackEventId;
use serde::{Deserialize, Serialize};

/// Per-IP reputation and ban bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpReputation {
    pub ip: String,
    pub request_count: u64,
    pub blocked_count: u64,
    pub first_seen: chrono::DateTime<chrono::Utc>,
    pub last_seen: chrono::DateTime<chrono::Utc>,
    pub threat_score: u64,
    pub banned: bool,
    pub banned_at: Option<chrono::DateTime<chrono::Utc>>,
    pub ban_expires: Option<chrono::DateTime<chrono::Utc>>,
    pub ban_reason: Option<String>,
    pub whitelisted: bool,
}

impl IpReputation {
    pub fn new(ip: impl Into<String>) -> Self {
        let now = chrono::Utc::now();
        Self {
            ip: ip.into(),
            request_count: 0,
            blocked_count: 0,
            first_seen: now,
            last_seen: now,
            threat_score: 0,
            banned: false,
            banned_at: None,
            ban_expires: None,
            ban_reason: None,
            whitelisted: false,
        }
    }
}

/// Kind of attack an [`AttackEvent`] records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackType {
    VolumetricFlood,
    SlowLoris,
    CredentialStuffing,
    Other(String),
}

/// Relative severity of an individual attack event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatLevel {
    None,
    Low,
    Medium,
    High,
    Critical,
}

/// A single detected attack, appended to the bounded ring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttackEvent {
    pub id: AttackEventId,
    pub attack_type: AttackType,
    pub source_ip: String,
    pub threat_level: ThreatLevel,
    pub detected_at: chrono::DateTime<chrono::Utc>,
    pub mitigated: bool,
    pub details: String,
}

/// Outcome of an admission check, with the denial reason when refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionDecision {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl AdmissionDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}
