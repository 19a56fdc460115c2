//! Pipeline Engine error taxonomy (§7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid pipeline spec: {0}")]
    InvalidSpec(String),

    #[error("pipeline '{0}' already exists")]
    AlreadyExists(String),

    #[error("pipeline '{0}' not found")]
    NotFound(String),

    #[error("run '{0}' not found")]
    RunNotFound(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
