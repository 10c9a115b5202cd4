//! Error types for sealing and unsealing content.

use thiserror::Error;

/// Errors that can occur while sealing or opening an asset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SealError {
    /// Encryption error.
    #[error("encryption error: {0}")]
    Encryption(String),

    /// Authenticated decryption failed: wrong key, or tampered bytes.
    #[error("authentication failed")]
    Authentication,

    /// The asset header could not be parsed.
    #[error("corrupt header: {0}")]
    CorruptHeader(String),

    /// The asset envelope could not be parsed.
    #[error("corrupt asset: {0}")]
    CorruptAsset(String),

    /// Fewer shares than the ritual threshold.
    #[error("insufficient shares: need {needed}, got {got}")]
    InsufficientShares { needed: u16, got: u16 },

    /// Shares that cannot belong to one split.
    #[error("invalid share set: {0}")]
    InvalidShares(String),
}

/// Result type for seal operations.
pub type Result<T> = std::result::Result<T, SealError>;
