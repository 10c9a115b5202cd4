//! Key capsules.
//!
//! The content key of an asset is wrapped for the ritual's public key. Only
//! the decryption network, holding the ritual secret, can derive the wrap
//! key, and it releases it only as a set of shares after the condition has
//! been evaluated.

use serde::{Deserialize, Serialize};

use crate::crypto::{
    BindingDigest, EncryptionKey, EncryptionNonce, EphemeralKeyPair, X25519PublicKey,
    X25519StaticSecret,
};
use crate::error::{Result, SealError};

/// A content key encrypted to a ritual public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyCapsule {
    /// Ephemeral X25519 public key (sender's side of ECDH).
    pub ephemeral_public: X25519PublicKey,

    /// Nonce used to wrap the content key.
    pub nonce: EncryptionNonce,

    /// The content key, encrypted under the wrap key.
    pub wrapped_key: Vec<u8>,
}

impl KeyCapsule {
    /// Wrap `content_key` for `ritual_public`, scoped to `binding`.
    pub fn seal(
        content_key: &EncryptionKey,
        ritual_public: &X25519PublicKey,
        binding: &BindingDigest,
    ) -> Result<Self> {
        let ephemeral = EphemeralKeyPair::generate();
        let ephemeral_public = ephemeral.public_key();

        let wrap_key = ephemeral
            .diffie_hellman(ritual_public)
            .derive_wrap_key(binding);

        let nonce = EncryptionNonce::generate();
        let wrapped_key = wrap_key.encrypt(content_key.as_bytes(), &nonce, binding.as_bytes())?;

        Ok(Self {
            ephemeral_public,
            nonce,
            wrapped_key,
        })
    }

    /// Derive the wrap key from the ritual secret. Network side.
    pub fn derive_wrap_key(
        ephemeral_public: &X25519PublicKey,
        ritual_secret: &X25519StaticSecret,
        binding: &BindingDigest,
    ) -> EncryptionKey {
        ritual_secret
            .diffie_hellman(ephemeral_public)
            .derive_wrap_key(binding)
    }

    /// Recover the content key given the combined wrap key.
    pub fn open(&self, wrap_key: &EncryptionKey, binding: &BindingDigest) -> Result<EncryptionKey> {
        let key_bytes = wrap_key.decrypt(&self.wrapped_key, &self.nonce, binding.as_bytes())?;

        let arr: [u8; 32] = key_bytes
            .as_slice()
            .try_into()
            .map_err(|_| SealError::Authentication)?;
        Ok(EncryptionKey::from_bytes(arr))
    }
}
