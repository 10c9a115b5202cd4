//! Proptest generators for property-based testing.

use proptest::prelude::*;

use keygate_core::{Address, Amount, ChainId, Comparator, Condition, ConditionForm};

/// Chains known to the default registry.
pub fn chain_id() -> impl Strategy<Value = ChainId> {
    prop_oneof![
        Just(ChainId::ETHEREUM),
        Just(ChainId::POLYGON),
        Just(ChainId::SEPOLIA),
        Just(ChainId::POLYGON_AMOY),
        Just(ChainId::POLYGON_MUMBAI),
    ]
}

/// Registry names for [`chain_id`].
pub fn chain_name() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("ethereum"),
        Just("polygon"),
        Just("sepolia"),
        Just("polygon_amoy"),
        Just("polygon_mumbai"),
    ]
}

/// A non-zero contract address.
pub fn address() -> impl Strategy<Value = Address> {
    any::<[u8; 20]>()
        .prop_filter("zero address", |bytes| bytes.iter().any(|b| *b != 0))
        .prop_map(Address::from_bytes)
}

/// An amount anywhere in the uint256 range.
pub fn amount() -> impl Strategy<Value = Amount> {
    prop_oneof![
        any::<u64>().prop_map(Amount::from),
        any::<u128>().prop_map(Amount::from),
        "[1-9][0-9]{0,77}".prop_filter_map("fits uint256", |s| Amount::parse(&s).ok()),
        Just(Amount::MAX),
    ]
}

/// Any comparator.
pub fn comparator() -> impl Strategy<Value = Comparator> {
    proptest::sample::select(Comparator::ALL.to_vec())
}

/// A condition that passes validation against the default registry.
pub fn valid_condition() -> impl Strategy<Value = Condition> {
    (any::<bool>(), chain_id(), address(), comparator(), amount())
        .prop_filter("x < 0 is unsatisfiable", |(_, _, _, cmp, threshold)| {
            !(*cmp == Comparator::Lt && threshold.is_zero())
        })
        .prop_map(|(fungible, chain, contract, cmp, threshold)| {
            if fungible {
                Condition::fungible_balance(chain, contract, cmp, threshold)
            } else {
                Condition::non_fungible_balance(chain, contract, cmp, threshold)
            }
        })
}

/// A well-formed upload form.
pub fn condition_form() -> impl Strategy<Value = ConditionForm> {
    (
        prop_oneof![Just("erc20"), Just("erc721")],
        chain_name(),
        address(),
        any::<u64>(),
    )
        .prop_map(|(kind, chain, contract, min)| ConditionForm {
            kind: kind.to_string(),
            chain: chain.to_string(),
            contract: contract.to_hex(),
            min_balance: min.to_string(),
        })
}

/// Payload sizes worth exercising: empty, tiny, around block edges, larger.
pub fn payload() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        Just(Vec::new()),
        proptest::collection::vec(any::<u8>(), 1..64),
        proptest::collection::vec(any::<u8>(), 63..66),
        proptest::collection::vec(any::<u8>(), 1024..4096),
    ]
}
