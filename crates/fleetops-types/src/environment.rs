//! Process-wide environment selection.
//!
//! Threaded through at engine construction so collaborators can vary
//! defaults (thresholds, auto-rollback) by deployment tier.

use serde::{Deserialize, Serialize};

/// The environment kind a control plane instance is running under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentKind {
    Development,
    Staging,
    Production,
    Testing,
}

impl Default for EnvironmentKind {
    fn default() -> Self {
        EnvironmentKind::Development
    }
}

impl std::str::FromStr for EnvironmentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(EnvironmentKind::Development),
            "staging" => Ok(EnvironmentKind::Staging),
            "production" | "prod" => Ok(EnvironmentKind::Production),
            "testing" | "test" => Ok(EnvironmentKind::Testing),
            other => Err(format!("unknown environment kind: {other}")),
        }
    }
}
