//! # Keygate Identity
//!
//! Wallet-signed identity assertions.
//!
//! A consumer proves control of an address by signing a short-lived
//! statement. The statement binds the address, a freshness nonce, an explicit
//! expiry, and (optionally) the digest of the condition being evaluated, so
//! it cannot be replayed against another condition.
//!
//! ## Key Types
//!
//! - [`WalletSigner`] - External signer seam (address + sign message)
//! - [`LocalWallet`] - In-process ed25519 signer
//! - [`StatementTemplate`] - Fixed parts of the signed statement
//! - [`IdentityProvider`] - Produces [`IdentityAssertion`]s
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use keygate_identity::{IdentityProvider, LocalWallet, StatementTemplate};
//!
//! async fn example() {
//!     let provider = IdentityProvider::with_signer(Arc::new(LocalWallet::generate()));
//!     let assertion = provider.assert(&StatementTemplate::default()).await.unwrap();
//!     assert!(assertion.verify(assertion.issued_at).is_ok());
//! }
//! ```

pub mod assertion;
pub mod error;
pub mod provider;
pub mod signer;
pub mod statement;

pub use assertion::{IdentityAssertion, Nonce};
pub use error::{IdentityError, Result};
pub use provider::{assert_with, IdentityProvider};
pub use signer::{LocalWallet, SignerError, WalletKey, WalletSignature, WalletSigner};
pub use statement::{
    condition_resource, StatementTemplate, CONDITION_RESOURCE_PREFIX, MAX_ASSERTION_TTL,
};
