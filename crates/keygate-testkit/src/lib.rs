//! # Keygate Testkit
//!
//! Testing utilities for keygate.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Condition encodings every implementation must reproduce
//! - **Generators**: Proptest strategies for conditions, amounts and forms
//! - **Fixtures**: A wallet, in-memory network and engine sharing a manual clock
//! - **Signers**: Wallet signers that hold prompts open or lag past expiry
//!
//! ## Golden Vectors
//!
//! ```rust
//! use keygate_testkit::vectors::{all_vectors, condition_from_vector};
//!
//! for vector in all_vectors() {
//!     let condition = condition_from_vector(&vector);
//!     assert_eq!(hex::encode(condition.encode()), vector.expected_hex);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use keygate_testkit::generators::valid_condition;
//!
//! proptest! {
//!     #[test]
//!     fn condition_roundtrips(condition in valid_condition()) {
//!         let bytes = condition.encode();
//!         prop_assert_eq!(keygate::Condition::decode(&bytes).unwrap(), condition);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use keygate_testkit::fixtures::{min_balance, plaintext, TestFixture};
//!
//! async fn example() {
//!     let fixture = TestFixture::new();
//!     fixture.fund(1u64);
//!     let asset = fixture.engine.encrypt(&plaintext(1024), &min_balance(1u64)).await.unwrap();
//!     let opened = fixture.engine.decrypt(&asset).await.unwrap();
//!     assert_eq!(opened.as_slice(), plaintext(1024).as_slice());
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod signers;
pub mod vectors;

pub use fixtures::{
    fast_config, init_tracing, min_balance, plaintext, tamper_condition, token, wallets,
    TestFixture, TOKEN,
};
pub use signers::{GatedSigner, LaggingSigner, RefusingSigner};
pub use vectors::{all_vectors, condition_from_vector, verify_all_vectors, GoldenVector};
