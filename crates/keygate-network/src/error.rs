//! Error types for the network layer.

use thiserror::Error;

/// Errors that can occur while talking to the decryption network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    /// The network could not be reached.
    #[error("network unavailable: {0}")]
    Unavailable(String),

    /// No response within the deadline.
    #[error("timed out after {0}ms")]
    Timeout(u64),

    /// Too few participants answered.
    #[error("insufficient shares: need {needed}, got {got}")]
    InsufficientShares { needed: u16, got: u16 },

    /// The ritual does not exist or cannot serve requests.
    #[error("policy rejected: {0}")]
    PolicyRejected(String),

    /// The identity assertion was not accepted.
    #[error("assertion rejected: {0}")]
    AssertionRejected(String),

    /// A message could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl NetworkError {
    /// Transient failures are worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            NetworkError::Unavailable(_)
                | NetworkError::Timeout(_)
                | NetworkError::InsufficientShares { .. }
        )
    }
}

/// Result type for network operations.
pub type Result<T> = std::result::Result<T, NetworkError>;
