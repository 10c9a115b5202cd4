//! Strong type definitions for keygate.
//!
//! All identifiers are newtypes to prevent misuse at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// A 20-byte account or contract address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The zero address.
    pub const ZERO: Self = Self([0u8; 20]);

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Check if this is the zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Lowercase `0x`-prefixed hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse a `0x`-prefixed hex address (any letter case).
    pub fn from_hex(s: &str) -> Result<Self, ValidationError> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| ValidationError::InvalidAddress(format!("{s}: missing 0x prefix")))?;

        if digits.len() != 40 {
            return Err(ValidationError::InvalidAddress(format!(
                "{s}: expected 40 hex digits, got {}",
                digits.len()
            )));
        }

        let bytes =
            hex::decode(digits).map_err(|e| ValidationError::InvalidAddress(format!("{s}: {e}")))?;
        let mut arr = [0u8; 20];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Address {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl TryFrom<&[u8]> for Address {
    type Error = std::array::TryFromSliceError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 20] = slice.try_into()?;
        Ok(Self(arr))
    }
}

/// Numeric identifier of a chain/network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChainId(pub u64);

impl ChainId {
    pub const ETHEREUM: Self = Self(1);
    pub const POLYGON: Self = Self(137);
    pub const SEPOLIA: Self = Self(11_155_111);
    pub const POLYGON_AMOY: Self = Self(80_002);
    pub const POLYGON_MUMBAI: Self = Self(80_001);

    /// Get the numeric value.
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The set of chains the decryption network can evaluate conditions on.
///
/// Validation consults this table without performing any I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainRegistry {
    chains: Vec<(ChainId, String)>,
}

impl ChainRegistry {
    /// An empty registry.
    pub fn empty() -> Self {
        Self { chains: Vec::new() }
    }

    /// Add a chain under a human-readable name.
    pub fn with_chain(mut self, id: ChainId, name: impl Into<String>) -> Self {
        self.chains.retain(|(existing, _)| *existing != id);
        self.chains.push((id, name.into()));
        self
    }

    /// Check if a chain is recognized.
    pub fn contains(&self, id: ChainId) -> bool {
        self.chains.iter().any(|(c, _)| *c == id)
    }

    /// Resolve a chain name (e.g. `"sepolia"`) to its id.
    pub fn resolve(&self, name: &str) -> Option<ChainId> {
        let name = name.trim().to_ascii_lowercase();
        self.chains
            .iter()
            .find(|(_, n)| *n == name)
            .map(|(id, _)| *id)
    }

    /// Name of a recognized chain.
    pub fn name_of(&self, id: ChainId) -> Option<&str> {
        self.chains
            .iter()
            .find(|(c, _)| *c == id)
            .map(|(_, n)| n.as_str())
    }
}

impl Default for ChainRegistry {
    fn default() -> Self {
        Self::empty()
            .with_chain(ChainId::ETHEREUM, "ethereum")
            .with_chain(ChainId::POLYGON, "polygon")
            .with_chain(ChainId::SEPOLIA, "sepolia")
            .with_chain(ChainId::POLYGON_AMOY, "polygon_amoy")
            .with_chain(ChainId::POLYGON_MUMBAI, "polygon_mumbai")
    }
}

/// A decryption network deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Domain {
    Devnet,
    Testnet,
    Mainnet,
}

impl Domain {
    /// Wire tag.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Domain::Devnet => "devnet",
            Domain::Testnet => "testnet",
            Domain::Mainnet => "mainnet",
        }
    }

    /// Parse a wire tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "devnet" => Some(Domain::Devnet),
            "testnet" => Some(Domain::Testnet),
            "mainnet" => Some(Domain::Mainnet),
            _ => None,
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of a threshold-encryption ritual (policy) on the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RitualId(pub u32);

impl RitualId {
    /// The ritual used when none is configured.
    pub const DEFAULT: Self = Self(27);
}

impl fmt::Display for RitualId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
