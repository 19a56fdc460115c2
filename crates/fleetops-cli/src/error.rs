//! Daemon-level errors and the `§6` exit-code mapping.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("server error: {0}")]
    Server(String),
}

pub type DaemonResult<T> = std::result::Result<T, DaemonError>;

/// Exit codes `main` reports to the shell on startup/serve failure (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    InvalidSpec = 1,
    NotFound = 2,
    Cancelled = 3,
    Internal = 4,
}

impl DaemonError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            DaemonError::Config(_) => ExitCode::InvalidSpec,
            DaemonError::Server(_) => ExitCode::Internal,
        }
    }
}
