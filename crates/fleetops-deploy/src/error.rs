//! Deployment Strategies error taxonomy (§7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("invalid deployment config: {0}")]
    InvalidSpec(String),

    #[error("deployment '{0}' not found")]
    NotFound(String),

    #[error("operation not valid in current state: {0}")]
    Conflict(String),

    #[error("target adapter failed: {0}")]
    Unavailable(String),

    #[error("cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, DeployError>;
