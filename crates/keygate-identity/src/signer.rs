//! Wallet signer seam and a local ed25519 implementation.
//!
//! The engine never sees key material. It asks a [`WalletSigner`] for an
//! address and a signature over a text message, and the signer may fail or
//! be cancelled by its human operator at any time.

use async_trait::async_trait;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use keygate_core::Address;

use crate::error::{IdentityError, Result};

/// Errors a wallet signer can report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignerError {
    /// The operator declined or cancelled the prompt.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The wallet is not connected.
    #[error("wallet disconnected")]
    Disconnected,
}

impl From<SignerError> for IdentityError {
    fn from(e: SignerError) -> Self {
        match e {
            SignerError::Rejected(reason) => IdentityError::SigningDenied(reason),
            SignerError::Disconnected => IdentityError::Unavailable,
        }
    }
}

/// A 32-byte Ed25519 public key belonging to a wallet.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WalletKey(#[serde(with = "keygate_core::fixed_bytes")] pub [u8; 32]);

impl WalletKey {
    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// The account address controlled by this key.
    pub fn address(&self) -> Address {
        let digest = blake3::derive_key("keygate-address-v1", &self.0);
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[..20]);
        Address::from_bytes(bytes)
    }

    /// Verify a signature over a message.
    pub fn verify(&self, message: &[u8], signature: &[u8; 64]) -> Result<()> {
        let key = VerifyingKey::from_bytes(&self.0).map_err(|_| IdentityError::InvalidSignature)?;
        key.verify(message, &Signature::from_bytes(signature))
            .map_err(|_| IdentityError::InvalidSignature)
    }
}

impl fmt::Debug for WalletKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WalletKey({})", &hex::encode(self.0)[..16])
    }
}

/// A message signature together with the key that produced it.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSignature {
    pub key: WalletKey,
    #[serde(with = "keygate_core::fixed_bytes")]
    pub bytes: [u8; 64],
}

impl WalletSignature {
    /// Verify this signature over `message`.
    pub fn verify(&self, message: &[u8]) -> Result<()> {
        self.key.verify(message, &self.bytes)
    }

    /// The address of the signing key.
    pub fn signer_address(&self) -> Address {
        self.key.address()
    }
}

impl fmt::Debug for WalletSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WalletSignature({:?}, {}...)", self.key, &hex::encode(self.bytes)[..16])
    }
}

/// An external wallet that can report its address and sign text messages.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// The address of the connected account.
    async fn address(&self) -> std::result::Result<Address, SignerError>;

    /// Sign a human-readable message. May suspend on a human prompt.
    async fn sign_message(&self, message: &str) -> std::result::Result<WalletSignature, SignerError>;
}

/// A wallet backed by an in-process ed25519 key.
#[derive(Clone)]
pub struct LocalWallet {
    signing_key: SigningKey,
}

impl LocalWallet {
    /// Generate a new random wallet.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            signing_key: SigningKey::generate(&mut rng),
        }
    }

    /// Create from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    pub fn key(&self) -> WalletKey {
        WalletKey(self.signing_key.verifying_key().to_bytes())
    }

    pub fn account(&self) -> Address {
        self.key().address()
    }

    /// Sign synchronously.
    pub fn sign(&self, message: &[u8]) -> WalletSignature {
        WalletSignature {
            key: self.key(),
            bytes: self.signing_key.sign(message).to_bytes(),
        }
    }
}

impl fmt::Debug for LocalWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LocalWallet({})", self.account())
    }
}

#[async_trait]
impl WalletSigner for LocalWallet {
    async fn address(&self) -> std::result::Result<Address, SignerError> {
        Ok(self.account())
    }

    async fn sign_message(&self, message: &str) -> std::result::Result<WalletSignature, SignerError> {
        Ok(self.sign(message.as_bytes()))
    }
}
