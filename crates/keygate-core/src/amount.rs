//! Token amounts and comparison operators.
//!
//! Balances on EVM chains are uint256 values, far beyond what `u64` can hold.
//! An [`Amount`] wraps a [`U256`] and travels as its canonical decimal text:
//! digits only, no sign, no leading zeros.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// A non-negative integer amount in the uint256 range.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Amount(U256);

impl Amount {
    /// The largest representable amount, `2^256 - 1`.
    pub const MAX: Amount = Amount(U256::MAX);

    /// The zero amount.
    pub fn zero() -> Self {
        Self(U256::ZERO)
    }

    /// Parse a decimal digit string. Values above the uint256 range are
    /// rejected, so every `Amount` is a valid on-chain balance.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        if s.is_empty() {
            return Err(ValidationError::InvalidThreshold("empty amount".into()));
        }
        // U256's own parser also takes radix prefixes and underscores.
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::InvalidThreshold(format!(
                "{s:?} is not a non-negative integer"
            )));
        }

        let digits = s.trim_start_matches('0');
        if digits.is_empty() {
            return Ok(Self::zero());
        }
        U256::from_str_radix(digits, 10)
            .map(Self)
            .map_err(|_| ValidationError::ThresholdOutOfRange(digits.to_string()))
    }

    pub fn as_u256(&self) -> &U256 {
        &self.0
    }

    /// Check if this amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl FromStr for Amount {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Amount {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Amount> for String {
    fn from(amount: Amount) -> Self {
        amount.to_string()
    }
}

impl From<U256> for Amount {
    fn from(n: U256) -> Self {
        Self(n)
    }
}

impl From<u64> for Amount {
    fn from(n: u64) -> Self {
        Self(U256::from(n))
    }
}

impl From<u128> for Amount {
    fn from(n: u128) -> Self {
        Self(U256::from(n))
    }
}

impl fmt::Debug for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Amount({})", self.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Comparison applied between an observed balance and a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparator {
    /// `>=`
    Gte,
    /// `<=`
    Lte,
    /// `>`
    Gt,
    /// `<`
    Lt,
    /// `==`
    Eq,
    /// `!=`
    Ne,
}

impl Comparator {
    /// All comparators, in wire-tag order.
    pub const ALL: [Comparator; 6] = [
        Comparator::Gte,
        Comparator::Lte,
        Comparator::Gt,
        Comparator::Lt,
        Comparator::Eq,
        Comparator::Ne,
    ];

    /// The canonical wire symbol.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Comparator::Gte => ">=",
            Comparator::Lte => "<=",
            Comparator::Gt => ">",
            Comparator::Lt => "<",
            Comparator::Eq => "==",
            Comparator::Ne => "!=",
        }
    }

    /// Evaluate `observed <comparator> threshold`.
    pub fn apply(&self, observed: &Amount, threshold: &Amount) -> bool {
        let ord = observed.cmp(threshold);
        match self {
            Comparator::Gte => ord != Ordering::Less,
            Comparator::Lte => ord != Ordering::Greater,
            Comparator::Gt => ord == Ordering::Greater,
            Comparator::Lt => ord == Ordering::Less,
            Comparator::Eq => ord == Ordering::Equal,
            Comparator::Ne => ord != Ordering::Equal,
        }
    }
}

impl FromStr for Comparator {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ">=" | "≥" => Ok(Comparator::Gte),
            "<=" | "≤" => Ok(Comparator::Lte),
            ">" => Ok(Comparator::Gt),
            "<" => Ok(Comparator::Lt),
            "==" | "=" => Ok(Comparator::Eq),
            "!=" | "≠" => Ok(Comparator::Ne),
            other => Err(ValidationError::InvalidComparator(other.to_string())),
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const UINT256_MAX: &str =
        "115792089237316195423570985008687907853269984665640564039457584007913129639935";

    #[test]
    fn test_amount_normalizes_leading_zeros() {
        assert_eq!(Amount::parse("000123").unwrap().to_string(), "123");
        assert_eq!(Amount::parse("0000").unwrap(), Amount::zero());
        assert_eq!(Amount::zero().to_string(), "0");
    }

    #[test]
    fn test_amount_rejects_non_digits() {
        assert!(Amount::parse("").is_err());
        assert!(Amount::parse("-1").is_err());
        assert!(Amount::parse("1.5").is_err());
        assert!(Amount::parse(" 1").is_err());
        assert!(Amount::parse("1e18").is_err());
        assert!(Amount::parse("0x10").is_err());
        assert!(Amount::parse("1_000").is_err());
    }

    #[test]
    fn test_amount_beyond_u64() {
        let big = Amount::parse("18446744073709551616").unwrap(); // u64::MAX + 1
        let max = Amount::from(u64::MAX);
        assert!(big > max);
        assert_eq!(big.to_string(), "18446744073709551616");
    }

    #[test]
    fn test_uint256_bound() {
        let max = Amount::parse(UINT256_MAX).unwrap();
        assert_eq!(max, Amount::MAX);
        assert_eq!(max.to_string(), UINT256_MAX);

        let over = Amount::parse(
            "115792089237316195423570985008687907853269984665640564039457584007913129639936",
        );
        assert!(matches!(over, Err(ValidationError::ThresholdOutOfRange(_))));
        assert!(matches!(
            Amount::parse(&"9".repeat(80)),
            Err(ValidationError::ThresholdOutOfRange(_))
        ));
        // Leading zeros do not count against the range.
        assert_eq!(Amount::parse(&format!("000{UINT256_MAX}")).unwrap(), Amount::MAX);
    }

    #[test]
    fn test_comparator_symbols() {
        for c in Comparator::ALL {
            assert_eq!(c.as_str().parse::<Comparator>().unwrap(), c);
        }
        assert_eq!("=".parse::<Comparator>().unwrap(), Comparator::Eq);
        assert_eq!("≠".parse::<Comparator>().unwrap(), Comparator::Ne);
        assert!("=>".parse::<Comparator>().is_err());
    }

    #[test]
    fn test_comparator_apply() {
        let one = Amount::from(1u64);
        let zero = Amount::zero();
        let hundred = Amount::from(100u64);

        assert!(Comparator::Gte.apply(&one, &one));
        assert!(!Comparator::Gte.apply(&zero, &one));
        assert!(!Comparator::Gte.apply(&zero, &hundred));
        assert!(Comparator::Lt.apply(&zero, &one));
        assert!(Comparator::Ne.apply(&zero, &one));
        assert!(Comparator::Eq.apply(&hundred, &Amount::parse("0100").unwrap()));
    }

    #[test]
    fn test_amount_serde_as_string() {
        let amount = Amount::from(42u64);
        let json = serde_json::to_string(&amount).unwrap();
        assert_eq!(json, "\"42\"");

        let back: Amount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, amount);
        assert!(serde_json::from_str::<Amount>("\"-3\"").is_err());
    }

    proptest! {
        #[test]
        fn test_amount_order_matches_u128(a: u128, b: u128) {
            prop_assert_eq!(Amount::from(a).cmp(&Amount::from(b)), a.cmp(&b));
        }
    }
}
