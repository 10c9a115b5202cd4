//! Golden test vectors for condition encoding.
//!
//! A condition's encoding is authenticated into every asset sealed under
//! it, so any drift in these bytes makes existing content undecryptable.
//! Other implementations can check themselves against the same table.

use serde::Serialize;

use keygate_core::{Address, Amount, ChainId, Comparator, Condition, DecodeError};

/// A golden test vector.
#[derive(Debug, Clone, Serialize)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// `erc20` or `erc721`.
    pub kind: &'static str,
    pub chain: u64,
    /// `0x`-prefixed contract address.
    pub contract: &'static str,
    pub comparator: &'static str,
    pub threshold: &'static str,
    /// Expected canonical encoding (hex).
    pub expected_hex: &'static str,
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "erc20 holder of at least one unit on sepolia",
            kind: "erc20",
            chain: 11_155_111,
            contract: "0x46abDF5aD1726ba700794539C3dB8fE591854729",
            comparator: ">=",
            threshold: "1",
            expected_hex: "a6000101656572633230021a00aa36a7035446abdf5ad1726ba700794539c3db8fe59185472904623e3d056131",
        },
        GoldenVector {
            name: "erc721 holder on polygon",
            kind: "erc721",
            chain: 137,
            contract: "0x1111111111111111111111111111111111111111",
            comparator: ">=",
            threshold: "1",
            expected_hex: "a6000101666572633732310218890354111111111111111111111111111111111111111104623e3d056131",
        },
        GoldenVector {
            name: "one ether worth of an 18-decimal token on mainnet",
            kind: "erc20",
            chain: 1,
            contract: "0x2222222222222222222222222222222222222222",
            comparator: ">=",
            threshold: "1000000000000000000",
            expected_hex: "a600010165657263323002010354222222222222222222222222222222222222222204623e3d057331303030303030303030303030303030303030",
        },
        GoldenVector {
            name: "exact zero balance on amoy",
            kind: "erc20",
            chain: 80_002,
            contract: "0x46abDF5aD1726ba700794539C3dB8fE591854729",
            comparator: "==",
            threshold: "0",
            expected_hex: "a6000101656572633230021a00013882035446abdf5ad1726ba700794539c3db8fe59185472904623d3d056130",
        },
    ]
}

/// A version 2 blob with a kind this build does not know.
///
/// Must decode to an unsupported condition that re-encodes byte for byte.
pub const FUTURE_KIND_HEX: &str =
    "a60002016765726331313535021a00aa36a7035446abdf5ad1726ba700794539c3db8fe59185472904623e3d056131";

/// Build the condition a vector describes.
pub fn condition_from_vector(vector: &GoldenVector) -> Condition {
    let contract = Address::from_hex(vector.contract).expect("vector contract is valid");
    let comparator: Comparator = vector.comparator.parse().expect("vector comparator is valid");
    let threshold = Amount::parse(vector.threshold).expect("vector threshold is valid");
    let chain = ChainId(vector.chain);

    match vector.kind {
        "erc20" => Condition::fungible_balance(chain, contract, comparator, threshold),
        "erc721" => Condition::non_fungible_balance(chain, contract, comparator, threshold),
        other => panic!("vector kind {other} is not a balance kind"),
    }
}

/// Result of checking one vector.
#[derive(Debug)]
pub struct VectorResult {
    pub name: &'static str,
    pub expected: &'static str,
    pub actual: String,
    pub decoded: Result<Condition, DecodeError>,
}

impl VectorResult {
    pub fn passed(&self, condition: &Condition) -> bool {
        self.actual == self.expected && self.decoded.as_ref() == Ok(condition)
    }
}

/// Check every vector: encoding matches and decoding returns the same value.
pub fn verify_all_vectors() -> Vec<VectorResult> {
    all_vectors()
        .into_iter()
        .map(|vector| {
            let condition = condition_from_vector(&vector);
            let bytes = condition.encode();
            VectorResult {
                name: vector.name,
                expected: vector.expected_hex,
                actual: hex::encode(&bytes),
                decoded: Condition::decode(&bytes),
            }
        })
        .collect()
}

/// Export the vectors as JSON for other implementations.
pub fn vectors_json() -> String {
    serde_json::to_string_pretty(&all_vectors()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vectors_encode_exactly() {
        for vector in all_vectors() {
            let condition = condition_from_vector(&vector);
            assert_eq!(
                hex::encode(condition.encode()),
                vector.expected_hex,
                "vector '{}' drifted",
                vector.name
            );
            assert!(condition.validate().is_ok(), "vector '{}' is invalid", vector.name);
        }
    }

    #[test]
    fn test_vectors_decode_to_same_condition() {
        for result in verify_all_vectors() {
            let condition = result.decoded.as_ref().unwrap().clone();
            assert!(result.passed(&condition), "vector '{}' failed", result.name);
        }
    }

    #[test]
    fn test_future_kind_is_preserved() {
        let bytes = hex::decode(FUTURE_KIND_HEX).unwrap();
        let condition = Condition::decode(&bytes).unwrap();
        assert!(matches!(condition, Condition::Unsupported(_)));
        assert_eq!(condition.tag(), "erc1155");
        assert_eq!(condition.encode(), bytes);
        assert!(condition.validate().is_err());
    }

    #[test]
    fn test_vectors_export_as_json() {
        let json = vectors_json();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), all_vectors().len());
    }
}
