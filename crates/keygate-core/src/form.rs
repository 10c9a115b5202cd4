//! Uploader-facing condition input.
//!
//! An upload form collects a handful of strings. [`ConditionForm`] turns them
//! into a typed [`Condition`] with a `>=` comparator, reporting the first
//! field that does not parse.

use serde::{Deserialize, Serialize};

use crate::amount::{Amount, Comparator};
use crate::condition::Condition;
use crate::error::ValidationError;
use crate::types::{Address, ChainRegistry};

/// Contract used when the uploader does not supply one.
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x46abDF5aD1726ba700794539C3dB8fE591854729";

/// Raw form fields for a minimum-balance condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionForm {
    /// `erc20` or `erc721`.
    pub kind: String,
    /// Chain name, e.g. `sepolia`.
    pub chain: String,
    /// `0x`-prefixed contract address.
    pub contract: String,
    /// Minimum balance as a decimal string.
    pub min_balance: String,
}

impl Default for ConditionForm {
    fn default() -> Self {
        Self {
            kind: "erc20".into(),
            chain: "sepolia".into(),
            contract: DEFAULT_CONTRACT_ADDRESS.into(),
            min_balance: "1".into(),
        }
    }
}

impl ConditionForm {
    /// Build and validate a condition using the default chain registry.
    pub fn build(&self) -> Result<Condition, ValidationError> {
        self.build_with(&ChainRegistry::default())
    }

    /// Build and validate a condition against `registry`.
    pub fn build_with(&self, registry: &ChainRegistry) -> Result<Condition, ValidationError> {
        let chain = registry
            .resolve(&self.chain)
            .ok_or_else(|| ValidationError::UnknownChainName(self.chain.clone()))?;
        let contract = Address::from_hex(self.contract.trim())?;
        let threshold = Amount::parse(self.min_balance.trim())?;

        let condition = match self.kind.trim() {
            "erc20" => Condition::fungible_balance(chain, contract, Comparator::Gte, threshold),
            "erc721" => Condition::non_fungible_balance(chain, contract, Comparator::Gte, threshold),
            other => return Err(ValidationError::UnsupportedKind(other.to_string())),
        };

        condition.validate_with(registry)?;
        Ok(condition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::ConditionKind;
    use crate::types::ChainId;

    #[test]
    fn test_default_form_builds() {
        let condition = ConditionForm::default().build().unwrap();
        assert_eq!(condition.kind(), ConditionKind::FungibleBalance);

        let balance = condition.balance().unwrap();
        assert_eq!(balance.chain(), ChainId::SEPOLIA);
        assert_eq!(balance.comparator(), Comparator::Gte);
        assert_eq!(balance.threshold(), &Amount::from(1u64));
    }

    #[test]
    fn test_nft_form() {
        let form = ConditionForm {
            kind: "erc721".into(),
            chain: "polygon_amoy".into(),
            ..ConditionForm::default()
        };
        let condition = form.build().unwrap();
        assert_eq!(condition.kind(), ConditionKind::NonFungibleBalance);
        assert_eq!(condition.balance().unwrap().chain(), ChainId::POLYGON_AMOY);
    }

    #[test]
    fn test_form_errors() {
        let bad_chain = ConditionForm {
            chain: "moonbase".into(),
            ..ConditionForm::default()
        };
        assert_eq!(
            bad_chain.build(),
            Err(ValidationError::UnknownChainName("moonbase".into()))
        );

        let bad_balance = ConditionForm {
            min_balance: "1.5".into(),
            ..ConditionForm::default()
        };
        assert!(matches!(
            bad_balance.build(),
            Err(ValidationError::InvalidThreshold(_))
        ));

        let huge_balance = ConditionForm {
            min_balance: "9".repeat(80),
            ..ConditionForm::default()
        };
        assert!(matches!(
            huge_balance.build(),
            Err(ValidationError::ThresholdOutOfRange(_))
        ));

        let bad_contract = ConditionForm {
            contract: "0x1234".into(),
            ..ConditionForm::default()
        };
        assert!(matches!(
            bad_contract.build(),
            Err(ValidationError::InvalidAddress(_))
        ));

        let bad_kind = ConditionForm {
            kind: "erc1155".into(),
            ..ConditionForm::default()
        };
        assert_eq!(
            bad_kind.build(),
            Err(ValidationError::UnsupportedKind("erc1155".into()))
        );
    }
}
