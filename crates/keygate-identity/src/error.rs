//! Error types for identity assertions.

use thiserror::Error;

/// Errors produced while obtaining or checking an identity assertion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// The wallet owner rejected or cancelled the signature prompt.
    #[error("signing denied: {0}")]
    SigningDenied(String),

    /// No wallet signer is attached, or it went away mid-request.
    #[error("no wallet signer available")]
    Unavailable,

    /// The statement template cannot produce a valid statement.
    #[error("invalid statement template: {0}")]
    InvalidTemplate(String),

    /// The signer's reported address does not belong to its signing key.
    #[error("signer address {claimed} does not match signing key address {derived}")]
    AddressMismatch { claimed: String, derived: String },

    /// The signed statement does not match the assertion's fields.
    #[error("statement does not match assertion fields")]
    StatementMismatch,

    /// Signature verification failed.
    #[error("invalid signature")]
    InvalidSignature,

    /// The assertion's validity window has closed.
    #[error("assertion expired at {expires_at} (now {now})")]
    Expired { expires_at: i64, now: i64 },

    /// The assertion was issued in the future.
    #[error("assertion not valid until {issued_at} (now {now})")]
    NotYetValid { issued_at: i64, now: i64 },
}

/// Result type for identity operations.
pub type Result<T> = std::result::Result<T, IdentityError>;
