//! Broker error types

use thiserror::Error;

/// Errors reported by a broker operation
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BrokerError {
    #[error("Broker rejected {path}: {reason}")]
    Rejected { path: String, reason: String },

    #[error("Broker unavailable: {0}")]
    Unavailable(String),
}

impl BrokerError {
    pub fn rejected(path: &str, reason: impl Into<String>) -> Self {
        BrokerError::Rejected {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}
