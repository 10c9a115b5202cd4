//! Eligibility conditions and their canonical wire form.
//!
//! A [`Condition`] is an immutable predicate over on-chain state, such as
//! "holds at least 1 unit of token T on Sepolia". Conditions are created by
//! the uploader before encryption and embedded in the encrypted asset header,
//! so their encoding must be deterministic and versioned.
//!
//! ## Wire format (version 1)
//!
//! A canonical CBOR map with integer keys:
//!
//! | key | field      | type                      |
//! |-----|------------|---------------------------|
//! | 0   | version    | uint                      |
//! | 1   | kind       | text (`erc20`, `erc721`)  |
//! | 2   | chain      | uint                      |
//! | 3   | contract   | bytes(20)                 |
//! | 4   | comparator | text (`>=`, `<=`, ...)    |
//! | 5   | threshold  | text (decimal digits)     |
//!
//! Writers newer than version 1 may add kinds and keys. A version 1 reader
//! decodes such blobs into [`Condition::Unsupported`], keeping the raw bytes
//! so they can be forwarded untouched.

use crate::amount::{Amount, Comparator};
use crate::canonical::{self, CanonicalValue, CborMap};
use crate::error::{DecodeError, ValidationError};
use crate::types::{Address, ChainId, ChainRegistry};

/// Current wire format version.
pub const CONDITION_VERSION: u8 = 1;

mod keys {
    pub const VERSION: u64 = 0;
    pub const KIND: u64 = 1;
    pub const CHAIN: u64 = 2;
    pub const CONTRACT: u64 = 3;
    pub const COMPARATOR: u64 = 4;
    pub const THRESHOLD: u64 = 5;

    pub const ALL: [u64; 6] = [VERSION, KIND, CHAIN, CONTRACT, COMPARATOR, THRESHOLD];
}

/// Discriminator for condition variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionKind {
    /// Balance of a fungible token contract (ERC-20 style).
    FungibleBalance,
    /// Number of tokens held from a non-fungible contract (ERC-721 style).
    NonFungibleBalance,
    /// A kind introduced by a newer writer.
    Unsupported,
}

impl ConditionKind {
    /// Wire tag for known kinds.
    pub const fn tag(&self) -> Option<&'static str> {
        match self {
            ConditionKind::FungibleBalance => Some("erc20"),
            ConditionKind::NonFungibleBalance => Some("erc721"),
            ConditionKind::Unsupported => None,
        }
    }
}

/// "The holder's balance of `contract` on `chain`, compared to `threshold`."
///
/// Fields are private: a condition is never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BalanceCondition {
    chain: ChainId,
    contract: Address,
    comparator: Comparator,
    threshold: Amount,
}

impl BalanceCondition {
    pub fn new(chain: ChainId, contract: Address, comparator: Comparator, threshold: Amount) -> Self {
        Self {
            chain,
            contract,
            comparator,
            threshold,
        }
    }

    pub fn chain(&self) -> ChainId {
        self.chain
    }

    pub fn contract(&self) -> &Address {
        &self.contract
    }

    pub fn comparator(&self) -> Comparator {
        self.comparator
    }

    pub fn threshold(&self) -> &Amount {
        &self.threshold
    }

    /// Evaluate the predicate against an observed balance.
    pub fn is_satisfied_by(&self, balance: &Amount) -> bool {
        self.comparator.apply(balance, &self.threshold)
    }
}

/// A condition written by a newer encoder that this version cannot interpret.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnsupportedCondition {
    version: u8,
    tag: String,
    raw: Vec<u8>,
}

impl UnsupportedCondition {
    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The original encoded bytes.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }
}

/// An on-chain eligibility predicate gating decryption.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Condition {
    FungibleBalance(BalanceCondition),
    NonFungibleBalance(BalanceCondition),
    Unsupported(UnsupportedCondition),
}

impl Condition {
    /// A fungible-token balance condition.
    pub fn fungible_balance(
        chain: ChainId,
        contract: Address,
        comparator: Comparator,
        threshold: Amount,
    ) -> Self {
        Condition::FungibleBalance(BalanceCondition::new(chain, contract, comparator, threshold))
    }

    /// A non-fungible-token balance condition.
    pub fn non_fungible_balance(
        chain: ChainId,
        contract: Address,
        comparator: Comparator,
        threshold: Amount,
    ) -> Self {
        Condition::NonFungibleBalance(BalanceCondition::new(chain, contract, comparator, threshold))
    }

    pub fn kind(&self) -> ConditionKind {
        match self {
            Condition::FungibleBalance(_) => ConditionKind::FungibleBalance,
            Condition::NonFungibleBalance(_) => ConditionKind::NonFungibleBalance,
            Condition::Unsupported(_) => ConditionKind::Unsupported,
        }
    }

    /// Wire tag, including tags of unsupported kinds.
    pub fn tag(&self) -> &str {
        match self {
            Condition::FungibleBalance(_) => "erc20",
            Condition::NonFungibleBalance(_) => "erc721",
            Condition::Unsupported(u) => &u.tag,
        }
    }

    /// The balance predicate, for kinds that have one.
    pub fn balance(&self) -> Option<&BalanceCondition> {
        match self {
            Condition::FungibleBalance(b) | Condition::NonFungibleBalance(b) => Some(b),
            Condition::Unsupported(_) => None,
        }
    }

    /// Blake3 digest of the canonical encoding.
    pub fn digest(&self) -> [u8; 32] {
        *blake3::hash(&self.encode()).as_bytes()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Encoding
    // ─────────────────────────────────────────────────────────────────────────

    /// Encode to canonical bytes.
    pub fn encode(&self) -> Vec<u8> {
        let (tag, b) = match self {
            Condition::FungibleBalance(b) => ("erc20", b),
            Condition::NonFungibleBalance(b) => ("erc721", b),
            Condition::Unsupported(u) => return u.raw.clone(),
        };

        canonical::encode(&CanonicalValue::Map(vec![
            (keys::VERSION, CanonicalValue::Uint(CONDITION_VERSION.into())),
            (keys::KIND, CanonicalValue::Text(tag.into())),
            (keys::CHAIN, CanonicalValue::Uint(b.chain.0)),
            (keys::CONTRACT, CanonicalValue::Bytes(b.contract.0.to_vec())),
            (keys::COMPARATOR, CanonicalValue::Text(b.comparator.as_str().into())),
            (keys::THRESHOLD, CanonicalValue::Text(b.threshold.to_string())),
        ]))
    }

    /// Decode from bytes produced by [`Condition::encode`] or a newer writer.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let (value, used) = canonical::read_value(bytes)?;
        if used != bytes.len() {
            return Err(DecodeError::Malformed("trailing bytes".into()));
        }
        let map = CborMap::from_value(value)?;

        let version = map.uint(keys::VERSION, "version")?;
        let version = u8::try_from(version)
            .map_err(|_| DecodeError::Malformed(format!("version {version} out of range")))?;
        if version == 0 {
            return Err(DecodeError::Malformed("version 0 is not defined".into()));
        }

        let tag = map.text(keys::KIND, "kind")?;
        let make: fn(BalanceCondition) -> Condition = match tag {
            "erc20" => Condition::FungibleBalance,
            "erc721" => Condition::NonFungibleBalance,
            _ if version > CONDITION_VERSION => {
                return Ok(Condition::Unsupported(UnsupportedCondition {
                    version,
                    tag: tag.to_string(),
                    raw: bytes.to_vec(),
                }));
            }
            _ => return Err(DecodeError::UnknownKind(tag.to_string())),
        };

        if version == CONDITION_VERSION {
            let unknown = map.unknown_keys(&keys::ALL);
            if !unknown.is_empty() {
                return Err(DecodeError::Malformed(format!("unknown keys {unknown:?}")));
            }
        }

        let chain = ChainId(map.uint(keys::CHAIN, "chain")?);
        let contract = Address(map.fixed::<20>(keys::CONTRACT, "contract")?);
        let comparator = map
            .text(keys::COMPARATOR, "comparator")?
            .parse::<Comparator>()
            .map_err(|e| DecodeError::Malformed(e.to_string()))?;
        let threshold_text = map.text(keys::THRESHOLD, "threshold")?;
        let threshold =
            Amount::parse(threshold_text).map_err(|e| DecodeError::Malformed(e.to_string()))?;

        let condition = make(BalanceCondition::new(chain, contract, comparator, threshold));

        // Current-version blobs must be byte-identical to our own encoding.
        if version == CONDITION_VERSION && condition.encode() != bytes {
            return Err(DecodeError::Malformed("non-canonical encoding".into()));
        }

        Ok(condition)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Validation
    // ─────────────────────────────────────────────────────────────────────────

    /// Validate against the default chain registry. Never performs I/O.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.validate_with(&ChainRegistry::default())
    }

    /// Validate against a specific chain registry. Never performs I/O.
    pub fn validate_with(&self, registry: &ChainRegistry) -> Result<(), ValidationError> {
        let b = match self {
            Condition::FungibleBalance(b) | Condition::NonFungibleBalance(b) => b,
            Condition::Unsupported(u) => {
                return Err(ValidationError::UnsupportedKind(u.tag.clone()))
            }
        };

        if !registry.contains(b.chain) {
            return Err(ValidationError::UnsupportedChain(b.chain.0));
        }
        if b.contract.is_zero() {
            return Err(ValidationError::ZeroAddress);
        }
        if b.comparator == Comparator::Lt && b.threshold.is_zero() {
            return Err(ValidationError::Unsatisfiable {
                comparator: b.comparator,
                threshold: b.threshold,
            });
        }

        Ok(())
    }
}
