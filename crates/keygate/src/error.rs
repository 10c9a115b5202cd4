//! Error types for the engine.
//!
//! Every failure maps to one [`ErrorCategory`], and each category carries a
//! different recommended user action. A presentation layer should branch on
//! the category rather than on individual variants.

use keygate_core::ValidationError;
use keygate_identity::IdentityError;
use keygate_network::NetworkError;
use keygate_seal::SealError;
use thiserror::Error;

use crate::playback::TrackId;
use crate::store::ContentId;

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The condition failed validation.
    #[error("invalid condition: {0}")]
    InvalidCondition(#[from] ValidationError),

    /// The engine configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Ritual parameters could not be fetched.
    #[error("encryption network unavailable: {0}")]
    EncryptionNetworkUnavailable(NetworkError),

    /// The configured ritual cannot accept new ciphertexts.
    #[error("encryption policy rejected: {0}")]
    EncryptionPolicyRejected(String),

    /// The wallet refused or the operator cancelled the signature.
    #[error("identity signing denied: {0}")]
    IdentitySigningDenied(String),

    /// No wallet signer is attached.
    #[error("no identity signer available")]
    IdentityUnavailable,

    /// The identity assertion has passed its expiry.
    #[error("identity assertion expired")]
    AssertionExpired,

    /// The network refused the identity assertion.
    #[error("identity assertion rejected: {0}")]
    AssertionRejected(String),

    /// Any other identity failure.
    #[error("identity error: {0}")]
    Identity(IdentityError),

    /// The condition evaluated false for the asserted address.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// Transient network failures persisted through every retry.
    #[error("decryption unavailable after {attempts} attempts: {last}")]
    DecryptionUnavailable { attempts: u32, last: NetworkError },

    /// A non-transient network failure during decryption.
    #[error("network error: {0}")]
    Network(NetworkError),

    /// The asset header could not be parsed.
    #[error("corrupt header: {0}")]
    CorruptHeader(String),

    /// The ciphertext or key material failed authentication.
    #[error("corrupt data: {0}")]
    CorruptData(String),

    /// A decrypt for this track is already running.
    #[error("decrypt already in progress for track {0}")]
    AlreadyInProgress(TrackId),

    /// The operation was cancelled or superseded.
    #[error("cancelled")]
    Cancelled,

    /// No asset is registered or stored under this identifier.
    #[error("content not found: {0}")]
    ContentNotFound(String),

    /// The content store failed.
    #[error("content store error: {0}")]
    Store(#[source] anyhow::Error),

    /// A background task ended abnormally.
    #[error("task failed: {0}")]
    TaskFailed(String),
}

impl Error {
    /// The category this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidCondition(_) | Error::InvalidConfig(_) => ErrorCategory::Validation,

            Error::IdentitySigningDenied(_)
            | Error::IdentityUnavailable
            | Error::AssertionExpired
            | Error::AssertionRejected(_)
            | Error::Identity(_) => ErrorCategory::Identity,

            Error::EncryptionNetworkUnavailable(_)
            | Error::EncryptionPolicyRejected(_)
            | Error::DecryptionUnavailable { .. }
            | Error::Network(_)
            | Error::Store(_) => ErrorCategory::Network,

            Error::AccessDenied(_) => ErrorCategory::AccessDenied,

            Error::CorruptHeader(_)
            | Error::CorruptData(_)
            | Error::ContentNotFound(_)
            | Error::TaskFailed(_) => ErrorCategory::CorruptData,

            Error::AlreadyInProgress(_) | Error::Cancelled => ErrorCategory::Cancelled,
        }
    }

    /// Check if this is the terminal "not eligible" outcome.
    pub fn is_access_denied(&self) -> bool {
        matches!(self, Error::AccessDenied(_))
    }

    pub(crate) fn content_not_found(cid: &ContentId) -> Self {
        Error::ContentNotFound(cid.to_string())
    }
}

impl From<IdentityError> for Error {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::SigningDenied(reason) => Error::IdentitySigningDenied(reason),
            IdentityError::Unavailable => Error::IdentityUnavailable,
            IdentityError::Expired { .. } => Error::AssertionExpired,
            other => Error::Identity(other),
        }
    }
}

impl From<SealError> for Error {
    fn from(err: SealError) -> Self {
        match err {
            SealError::CorruptHeader(msg) => Error::CorruptHeader(msg),
            SealError::Authentication => {
                Error::CorruptData("ciphertext failed authentication".into())
            }
            other => Error::CorruptData(other.to_string()),
        }
    }
}

/// Coarse classification of failures, one per recommended user action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Caller input is malformed.
    Validation,
    /// The signer refused, is missing, or the proof expired.
    Identity,
    /// The service is temporarily unavailable.
    Network,
    /// The identity is not eligible.
    AccessDenied,
    /// Stored data is malformed.
    CorruptData,
    /// The request was cancelled or superseded.
    Cancelled,
}

impl ErrorCategory {
    /// What the user should do next.
    pub const fn user_action(&self) -> &'static str {
        match self {
            ErrorCategory::Validation => "Correct the highlighted input and try again.",
            ErrorCategory::Identity => "Reconnect your wallet and sign the request again.",
            ErrorCategory::Network => {
                "The decryption service is temporarily unavailable. Try again shortly."
            }
            ErrorCategory::AccessDenied => {
                "Your wallet does not meet the access condition for this content."
            }
            ErrorCategory::CorruptData => {
                "This content is damaged and cannot be played. Report it to the uploader."
            }
            ErrorCategory::Cancelled => "No action needed.",
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_errors_map_to_engine_variants() {
        assert!(matches!(
            Error::from(IdentityError::SigningDenied("closed".into())),
            Error::IdentitySigningDenied(_)
        ));
        assert!(matches!(
            Error::from(IdentityError::Unavailable),
            Error::IdentityUnavailable
        ));
        assert!(matches!(
            Error::from(IdentityError::Expired {
                expires_at: 1,
                now: 2
            }),
            Error::AssertionExpired
        ));
    }

    #[test]
    fn test_authentication_failure_is_corrupt_data() {
        let err = Error::from(SealError::Authentication);
        assert!(matches!(err, Error::CorruptData(_)));
        assert_eq!(err.category(), ErrorCategory::CorruptData);

        let err = Error::from(SealError::CorruptHeader("truncated".into()));
        assert!(matches!(err, Error::CorruptHeader(_)));
    }

    #[test]
    fn test_categories_distinguish_user_actions() {
        let denied = Error::AccessDenied("condition not met".into());
        let unavailable = Error::DecryptionUnavailable {
            attempts: 3,
            last: NetworkError::Timeout(30_000),
        };
        let corrupt = Error::CorruptHeader("bad".into());

        assert_eq!(denied.category(), ErrorCategory::AccessDenied);
        assert_eq!(unavailable.category(), ErrorCategory::Network);
        assert_eq!(corrupt.category(), ErrorCategory::CorruptData);

        let actions = [
            denied.category().user_action(),
            unavailable.category().user_action(),
            corrupt.category().user_action(),
        ];
        assert_ne!(actions[0], actions[1]);
        assert_ne!(actions[1], actions[2]);
        assert_ne!(actions[0], actions[2]);
    }

    #[test]
    fn test_validation_error_converts() {
        let err: Error = ValidationError::ZeroAddress.into();
        assert_eq!(err.category(), ErrorCategory::Validation);
    }
}
