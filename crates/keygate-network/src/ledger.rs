//! On-chain balance state for the in-memory network.

use std::collections::HashMap;

use parking_lot::RwLock;

use keygate_core::{Address, Amount, ChainId, Condition};

/// Token balances keyed by (chain, contract, holder).
///
/// Unknown entries read as zero.
#[derive(Debug, Default)]
pub struct BalanceLedger {
    balances: RwLock<HashMap<(ChainId, Address, Address), Amount>>,
}

impl BalanceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `holder`'s balance of `contract` on `chain`.
    pub fn set_balance(&self, chain: ChainId, contract: Address, holder: Address, amount: Amount) {
        self.balances.write().insert((chain, contract, holder), amount);
    }

    pub fn balance_of(&self, chain: ChainId, contract: &Address, holder: &Address) -> Amount {
        self.balances
            .read()
            .get(&(chain, *contract, *holder))
            .cloned()
            .unwrap_or_else(Amount::zero)
    }

    /// Evaluate `condition` for `holder`.
    ///
    /// Returns `None` for kinds without a balance predicate.
    pub fn evaluate(&self, condition: &Condition, holder: &Address) -> Option<bool> {
        let b = condition.balance()?;
        let observed = self.balance_of(b.chain(), b.contract(), holder);
        Some(b.is_satisfied_by(&observed))
    }
}
