//! # Keygate
//!
//! Condition-gated content access: publish encrypted media that only
//! identities satisfying an on-chain predicate can play back.
//!
//! ## Overview
//!
//! - **Encrypt**: validate a [`Condition`], fetch the ritual's public
//!   parameters from the threshold network, and seal the content.
//! - **Decrypt**: sign a short-lived identity assertion, petition the
//!   network to evaluate the condition for that address, and open the asset
//!   with the released key shares.
//! - **Play back**: keep at most one decrypted buffer resident, owned by the
//!   active [`PlaybackSession`] and revoked on teardown.
//!
//! Progress is reported as [`EngineEvent`]s; failures carry an
//! [`ErrorCategory`] that tells "not eligible" apart from "temporarily
//! unavailable" and "something is broken".
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use keygate::{Engine, EngineConfig, MemoryContentStore, StoreResolver, TrackId};
//! use keygate::core::{Address, Amount, ChainId, Comparator, Condition};
//! use keygate::identity::{IdentityProvider, LocalWallet};
//! use keygate::network::MemoryNetwork;
//!
//! async fn example() {
//!     let network = MemoryNetwork::new();
//!     network.create_ritual(keygate::core::Domain::Devnet, keygate::core::RitualId(27), 3, 5);
//!
//!     let identity = IdentityProvider::with_signer(Arc::new(LocalWallet::generate()));
//!     let engine = Engine::new(EngineConfig::default(), Arc::new(network), identity).unwrap();
//!
//!     let condition = Condition::fungible_balance(
//!         ChainId::SEPOLIA,
//!         "0x46abDF5aD1726ba700794539C3dB8fE591854729".parse::<Address>().unwrap(),
//!         Comparator::Gte,
//!         Amount::from(1u64),
//!     );
//!
//!     let store = Arc::new(MemoryContentStore::new());
//!     let cid = engine.publish(b"audio", &condition, store.as_ref()).await.unwrap();
//!
//!     let resolver = Arc::new(StoreResolver::new(store));
//!     resolver.register(TrackId::new("intro"), cid);
//!     let session = engine.activate(TrackId::new("intro"), resolver).unwrap();
//!     session.settled().await;
//!     engine.teardown(&session);
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `keygate::core` - Conditions, amounts, addresses, clocks
//! - `keygate::identity` - Wallet signers and identity assertions
//! - `keygate::seal` - Encrypted asset format and key material
//! - `keygate::network` - Network protocol and in-memory network

pub mod config;
pub mod decrypt;
pub mod encrypt;
pub mod engine;
pub mod error;
pub mod events;
pub mod handle;
pub mod playback;
pub mod retry;
pub mod store;

// Re-export component crates
pub use keygate_core as core;
pub use keygate_identity as identity;
pub use keygate_network as network;
pub use keygate_seal as seal;

pub use config::{EngineConfig, JoinPolicy};
pub use decrypt::{AttemptState, DecryptAttempt, DecryptionGate};
pub use encrypt::Encryptor;
pub use engine::Engine;
pub use error::{Error, ErrorCategory, Result};
pub use events::{EngineEvent, EventBus};
pub use handle::{PlaintextHandle, PlaintextLease, Revoked};
pub use playback::{AssetResolver, PlaybackManager, PlaybackSession, TrackId};
pub use retry::{RetryExhausted, RetryPolicy};
pub use store::{ContentId, ContentStore, MemoryContentStore, StoreResolver};

pub use keygate_core::{Condition, ConditionForm};
pub use keygate_seal::EncryptedAsset;
