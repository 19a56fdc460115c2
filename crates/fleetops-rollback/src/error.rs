//! Rollback Manager error taxonomy (§7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RollbackError {
    #[error("not enough release history to roll back")]
    Exhausted,

    #[error("version '{0}' not found in release ledger")]
    VersionNotFound(String),

    #[error("rollback target adapter failed: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, RollbackError>;
