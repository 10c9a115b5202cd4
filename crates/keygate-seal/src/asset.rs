//! The encrypted asset envelope.
//!
//! An [`EncryptedAsset`] is self-describing: its header names the network
//! domain and ritual, carries the encoded condition and the ritual's public
//! parameters, and holds the key capsule. Everything in the header except
//! the capsule itself feeds the [`BindingDigest`], which authenticates the
//! ciphertext and scopes the wrap key.
//!
//! ## Wire format
//!
//! The asset is a canonical CBOR array `[header_bytes, ciphertext]`. The
//! header is a canonical CBOR map:
//!
//! | key | field             | type      |
//! |-----|-------------------|-----------|
//! | 0   | version           | uint      |
//! | 1   | domain            | text      |
//! | 2   | ritual            | uint      |
//! | 3   | threshold         | uint      |
//! | 4   | ritual public key | bytes(32) |
//! | 5   | condition         | bytes     |
//! | 6   | capsule ephemeral | bytes(32) |
//! | 7   | capsule nonce     | bytes(12) |
//! | 8   | capsule wrapped   | bytes     |
//! | 9   | content nonce     | bytes(12) |

use bytes::Bytes;
use ciborium::value::Value;
use zeroize::Zeroizing;

use keygate_core::canonical::{self, CanonicalValue, CborMap};
use keygate_core::{Condition, Domain, RitualId};

use crate::capsule::KeyCapsule;
use crate::crypto::{BindingDigest, EncryptionKey, EncryptionNonce, X25519PublicKey};
use crate::error::{Result, SealError};

/// Current header format version.
pub const HEADER_VERSION: u64 = 1;

/// Public parameters of a ritual, as issued by the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RitualParameters {
    pub domain: Domain,
    pub ritual: RitualId,
    /// Number of shares needed to recover a wrap key.
    pub threshold: u16,
    pub public_key: X25519PublicKey,
}

/// Self-describing header of an encrypted asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetHeader {
    params: RitualParameters,
    condition: Condition,
    condition_bytes: Vec<u8>,
    capsule: KeyCapsule,
    content_nonce: EncryptionNonce,
}

impl AssetHeader {
    pub fn domain(&self) -> Domain {
        self.params.domain
    }

    pub fn ritual(&self) -> RitualId {
        self.params.ritual
    }

    pub fn params(&self) -> &RitualParameters {
        &self.params
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    /// The condition exactly as it was encoded at encrypt time.
    pub fn condition_bytes(&self) -> &[u8] {
        &self.condition_bytes
    }

    pub fn capsule(&self) -> &KeyCapsule {
        &self.capsule
    }

    pub fn binding(&self) -> BindingDigest {
        BindingDigest::compute(self.params.domain, self.params.ritual, &self.condition_bytes)
    }

    /// Encode to canonical bytes.
    pub fn encode(&self) -> Vec<u8> {
        canonical::encode(&CanonicalValue::Map(vec![
            (0, CanonicalValue::Uint(HEADER_VERSION)),
            (1, CanonicalValue::Text(self.params.domain.as_str().into())),
            (2, CanonicalValue::Uint(self.params.ritual.0.into())),
            (3, CanonicalValue::Uint(self.params.threshold.into())),
            (4, CanonicalValue::Bytes(self.params.public_key.0.to_vec())),
            (5, CanonicalValue::Bytes(self.condition_bytes.clone())),
            (6, CanonicalValue::Bytes(self.capsule.ephemeral_public.0.to_vec())),
            (7, CanonicalValue::Bytes(self.capsule.nonce.0.to_vec())),
            (8, CanonicalValue::Bytes(self.capsule.wrapped_key.clone())),
            (9, CanonicalValue::Bytes(self.content_nonce.0.to_vec())),
        ]))
    }

    /// Decode a header. Any failure, including an undecodable condition,
    /// is [`SealError::CorruptHeader`].
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let corrupt = |e: keygate_core::DecodeError| SealError::CorruptHeader(e.to_string());

        let (value, used) = canonical::read_value(bytes).map_err(corrupt)?;
        if used != bytes.len() {
            return Err(SealError::CorruptHeader("trailing bytes".into()));
        }
        let map = CborMap::from_value(value).map_err(corrupt)?;

        let version = map.uint(0, "version").map_err(corrupt)?;
        if version != HEADER_VERSION {
            return Err(SealError::CorruptHeader(format!(
                "unsupported header version {version}"
            )));
        }

        let domain_tag = map.text(1, "domain").map_err(corrupt)?;
        let domain = Domain::from_tag(domain_tag)
            .ok_or_else(|| SealError::CorruptHeader(format!("unknown domain {domain_tag}")))?;
        let ritual = u32::try_from(map.uint(2, "ritual").map_err(corrupt)?)
            .map_err(|_| SealError::CorruptHeader("ritual out of range".into()))?;
        let threshold = u16::try_from(map.uint(3, "threshold").map_err(corrupt)?)
            .map_err(|_| SealError::CorruptHeader("threshold out of range".into()))?;
        let public_key = X25519PublicKey(map.fixed::<32>(4, "public key").map_err(corrupt)?);

        let condition_bytes = map.bytes(5, "condition").map_err(corrupt)?.to_vec();
        let condition = Condition::decode(&condition_bytes).map_err(corrupt)?;

        let capsule = KeyCapsule {
            ephemeral_public: X25519PublicKey(map.fixed::<32>(6, "capsule ephemeral").map_err(corrupt)?),
            nonce: EncryptionNonce(map.fixed::<12>(7, "capsule nonce").map_err(corrupt)?),
            wrapped_key: map.bytes(8, "capsule key").map_err(corrupt)?.to_vec(),
        };
        let content_nonce = EncryptionNonce(map.fixed::<12>(9, "content nonce").map_err(corrupt)?);

        let unknown = map.unknown_keys(&[0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
        if !unknown.is_empty() {
            return Err(SealError::CorruptHeader(format!("unknown keys {unknown:?}")));
        }

        Ok(Self {
            params: RitualParameters {
                domain,
                ritual: RitualId(ritual),
                threshold,
                public_key,
            },
            condition,
            condition_bytes,
            capsule,
            content_nonce,
        })
    }
}

/// Ciphertext plus the header needed to petition for its key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedAsset {
    pub header: AssetHeader,
    pub ciphertext: Bytes,
}

impl EncryptedAsset {
    /// Encrypt `plaintext` so that only the ritual can release its key, and
    /// only for `condition`.
    pub fn seal(plaintext: &[u8], condition: &Condition, params: RitualParameters) -> Result<Self> {
        let condition_bytes = condition.encode();
        let binding = BindingDigest::compute(params.domain, params.ritual, &condition_bytes);

        let content_key = EncryptionKey::generate();
        let content_nonce = EncryptionNonce::generate();
        let ciphertext = content_key.encrypt(plaintext, &content_nonce, binding.as_bytes())?;
        let capsule = KeyCapsule::seal(&content_key, &params.public_key, &binding)?;

        Ok(Self {
            header: AssetHeader {
                params,
                condition: condition.clone(),
                condition_bytes,
                capsule,
                content_nonce,
            },
            ciphertext: Bytes::from(ciphertext),
        })
    }

    /// Decrypt with a combined wrap key.
    ///
    /// Returns plaintext only if every authenticated byte checks out.
    pub fn open(&self, wrap_key: &EncryptionKey) -> Result<Zeroizing<Vec<u8>>> {
        let binding = self.header.binding();
        let content_key = self.header.capsule.open(wrap_key, &binding)?;
        let plaintext =
            content_key.decrypt(&self.ciphertext, &self.header.content_nonce, binding.as_bytes())?;
        Ok(Zeroizing::new(plaintext))
    }

    /// Blake3 digest of the ciphertext.
    pub fn content_digest(&self) -> [u8; 32] {
        *blake3::hash(&self.ciphertext).as_bytes()
    }

    /// Serialize to bytes for a content store.
    pub fn to_bytes(&self) -> Vec<u8> {
        canonical::encode(&CanonicalValue::Array(vec![
            CanonicalValue::Bytes(self.header.encode()),
            CanonicalValue::Bytes(self.ciphertext.to_vec()),
        ]))
    }

    /// Parse bytes produced by [`EncryptedAsset::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (value, used) =
            canonical::read_value(bytes).map_err(|e| SealError::CorruptAsset(e.to_string()))?;
        if used != bytes.len() {
            return Err(SealError::CorruptAsset("trailing bytes".into()));
        }

        let mut items = match value {
            Value::Array(items) if items.len() == 2 => items.into_iter(),
            _ => return Err(SealError::CorruptAsset("expected [header, ciphertext]".into())),
        };
        let (header, ciphertext) = match (items.next(), items.next()) {
            (Some(Value::Bytes(h)), Some(Value::Bytes(c))) => (h, c),
            _ => return Err(SealError::CorruptAsset("expected byte strings".into())),
        };

        Ok(Self {
            header: AssetHeader::decode(&header)?,
            ciphertext: Bytes::from(ciphertext),
        })
    }
}
