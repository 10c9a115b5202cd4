//! Error types for the Keygate Core.

use thiserror::Error;

use crate::amount::{Amount, Comparator};

/// Errors produced when decoding a condition from its wire form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The kind tag is not one this version of the wire format defines.
    #[error("unknown condition kind: {0}")]
    UnknownKind(String),

    /// Structurally invalid input.
    #[error("malformed condition: {0}")]
    Malformed(String),
}

/// Errors found by validating caller input before any I/O.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unsupported condition kind: {0}")]
    UnsupportedKind(String),

    #[error("chain {0} is not recognized by the decryption network")]
    UnsupportedChain(u64),

    #[error("unknown chain name: {0}")]
    UnknownChainName(String),

    #[error("invalid contract address: {0}")]
    InvalidAddress(String),

    #[error("contract address must not be the zero address")]
    ZeroAddress,

    #[error("invalid threshold: {0}")]
    InvalidThreshold(String),

    #[error("threshold {0} exceeds the uint256 range")]
    ThresholdOutOfRange(String),

    #[error("invalid comparator: {0}")]
    InvalidComparator(String),

    #[error("no balance can satisfy {comparator} {threshold}")]
    Unsatisfiable {
        comparator: Comparator,
        threshold: Amount,
    },
}
