//! Request and response types exchanged with the decryption network.

use serde::{Deserialize, Serialize};

use keygate_core::{Address, Domain, RitualId};
use keygate_identity::IdentityAssertion;
use keygate_seal::{EncryptedAsset, RitualParameters, ShareSet, X25519PublicKey};

use crate::error::{NetworkError, Result};

/// Context parameter naming the requester's address.
pub const USER_ADDRESS_PARAM: &str = ":userAddress";

/// Current ritual parameters, as published by the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicParameters {
    pub domain: Domain,
    pub ritual: RitualId,
    pub public_key: X25519PublicKey,
    /// Shares needed to release a key.
    pub threshold: u16,
    /// Participants holding key shares.
    pub participants: u16,
    /// Whether the ritual is accepting new ciphertexts and petitions.
    pub active: bool,
}

impl PublicParameters {
    /// Check the ritual can release keys.
    pub fn is_serviceable(&self) -> bool {
        self.active && self.threshold >= 1 && self.threshold <= self.participants
    }

    /// The subset embedded in an asset header.
    pub fn ritual_parameters(&self) -> RitualParameters {
        RitualParameters {
            domain: self.domain,
            ritual: self.ritual,
            threshold: self.threshold,
            public_key: self.public_key,
        }
    }
}

/// What the network needs to know about a ciphertext to release its key.
///
/// The ciphertext itself never leaves the consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiphertextRef {
    pub domain: Domain,
    pub ritual: RitualId,
    pub ephemeral_public: X25519PublicKey,
    #[serde(with = "keygate_core::fixed_bytes")]
    pub content_digest: [u8; 32],
}

impl CiphertextRef {
    pub fn for_asset(asset: &EncryptedAsset) -> Self {
        Self {
            domain: asset.header.domain(),
            ritual: asset.header.ritual(),
            ephemeral_public: asset.header.capsule().ephemeral_public,
            content_digest: asset.content_digest(),
        }
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        to_cbor(self)
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        from_cbor(bytes)
    }
}

/// A condition bound to the identity it should be evaluated for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionContext {
    /// The condition exactly as encoded in the asset header.
    pub condition: Vec<u8>,
    /// Named parameters substituted into the condition.
    pub parameters: Vec<(String, String)>,
    pub assertion: IdentityAssertion,
}

impl ConditionContext {
    /// Bind `condition` to the assertion's address.
    pub fn new(condition: impl Into<Vec<u8>>, assertion: IdentityAssertion) -> Self {
        Self {
            condition: condition.into(),
            parameters: vec![(USER_ADDRESS_PARAM.to_string(), assertion.address.to_hex())],
            assertion,
        }
    }

    /// Look up a named parameter.
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// The address the condition is evaluated for.
    pub fn user_address(&self) -> Option<Address> {
        self.parameter(USER_ADDRESS_PARAM)?.parse().ok()
    }

    /// Hex blake3 digest of the encoded condition.
    pub fn condition_digest_hex(&self) -> String {
        hex::encode(blake3::hash(&self.condition).as_bytes())
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        to_cbor(self)
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        from_cbor(bytes)
    }
}

/// The network's answer to a decryption petition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PetitionOutcome {
    /// The condition holds; here are the shares.
    Granted(ShareSet),
    /// The condition was evaluated and does not hold.
    Denied { reason: String },
}

fn to_cbor<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf)
        .map_err(|e| NetworkError::Serialization(e.to_string()))?;
    Ok(buf)
}

fn from_cbor<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    ciborium::from_reader(bytes).map_err(|e| NetworkError::Serialization(e.to_string()))
}
