//! # Keygate Seal
//!
//! Sealing content so that only a threshold network can release its key.
//!
//! ## Encryption Model
//!
//! Content is sealed with a two-layer key model:
//!
//! 1. **Content Key**: A fresh ChaCha20-Poly1305 key encrypts the plaintext.
//! 2. **Key Capsule**: The content key is wrapped for the ritual's X25519
//!    public key with an ephemeral key agreement.
//!
//! The wrap key is scoped to a [`BindingDigest`] over the domain, ritual and
//! encoded condition, and the same digest authenticates the ciphertext. The
//! network releases the wrap key as a [`ShareSet`]; a consumer combines the
//! shares and opens the capsule.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use keygate_core::{Condition, Domain, RitualId};
//! use keygate_seal::{EncryptedAsset, RitualParameters, X25519StaticSecret};
//!
//! fn example(condition: &Condition) {
//!     let ritual_secret = X25519StaticSecret::generate();
//!     let params = RitualParameters {
//!         domain: Domain::Devnet,
//!         ritual: RitualId::DEFAULT,
//!         threshold: 3,
//!         public_key: ritual_secret.public_key(),
//!     };
//!     let asset = EncryptedAsset::seal(b"audio", condition, params).unwrap();
//!     let bytes = asset.to_bytes();
//! }
//! ```

pub mod asset;
pub mod capsule;
pub mod crypto;
pub mod error;
pub mod shares;

pub use asset::{AssetHeader, EncryptedAsset, RitualParameters, HEADER_VERSION};
pub use capsule::KeyCapsule;
pub use crypto::{
    BindingDigest, EncryptionKey, EncryptionNonce, EphemeralKeyPair, SharedKey, X25519PublicKey,
    X25519StaticSecret,
};
pub use error::{Result, SealError};
pub use shares::{DecryptionShare, ShareSet};
