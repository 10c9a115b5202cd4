//! # Keygate Core
//!
//! Pure primitives for keygate: eligibility conditions, their canonical wire
//! form, and the strong types they are built from.
//!
//! This crate contains no I/O, no networking, no cryptography beyond hashing.
//! Everything here is deterministic computation over values.
//!
//! ## Key Types
//!
//! - [`Condition`] - An on-chain eligibility predicate (closed tagged enum)
//! - [`BalanceCondition`] - "holds `comparator` `threshold` units of `contract` on `chain`"
//! - [`Amount`] - Arbitrary-precision non-negative integer amount
//! - [`Address`] / [`ChainId`] - Where the asset contract lives
//! - [`Clock`] - Injectable millisecond clock
//!
//! ## Canonicalization
//!
//! Conditions are encoded as deterministic CBOR with integer map keys. See
//! the [`canonical`] module.

pub mod amount;
pub mod canonical;
pub mod condition;
pub mod error;
pub mod fixed_bytes;
pub mod form;
pub mod time;
pub mod types;

pub use amount::{Amount, Comparator};
pub use condition::{
    BalanceCondition, Condition, ConditionKind, UnsupportedCondition, CONDITION_VERSION,
};
pub use error::{DecodeError, ValidationError};
pub use form::ConditionForm;
pub use time::{Clock, ManualClock, SystemClock};
pub use types::{Address, ChainId, ChainRegistry, Domain, RitualId};
