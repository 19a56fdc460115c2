//! Alert Manager error taxonomy (§7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("alert rule name must not be empty")]
    InvalidSpec,

    #[error("alert rule '{0}' already registered")]
    AlreadyExists(String),

    #[error("alert rule '{0}' not found")]
    RuleNotFound(String),

    #[error("alert '{0}' not found")]
    AlertNotFound(String),

    #[error("silence ends_at must be >= starts_at")]
    InvalidSilence,
}

pub type Result<T> = std::result::Result<T, AlertError>;
