//! DDoS Protection error taxonomy (§7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DdosError {
    #[error("'{0}' is not a parseable IP address or CIDR")]
    InvalidEntry(String),
}

pub type Result<T> = std::result::Result<T, DdosError>;
