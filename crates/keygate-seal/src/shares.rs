//! Decryption shares.
//!
//! The network releases a wrap key as `threshold` shares, one per
//! cooperating participant. Every share is required: the key is the XOR of
//! all of them, so any strict subset reveals nothing about it.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::EncryptionKey;
use crate::error::{Result, SealError};

/// One participant's contribution to a wrap key.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct DecryptionShare {
    /// Participant index, `0..threshold`.
    pub index: u16,
    #[serde(with = "keygate_core::fixed_bytes")]
    pub bytes: [u8; 32],
}

impl fmt::Debug for DecryptionShare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DecryptionShare({})", self.index)
    }
}

/// Shares returned for one petition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareSet {
    /// Number of shares required to combine.
    pub threshold: u16,
    pub shares: Vec<DecryptionShare>,
}

impl ShareSet {
    /// Split `secret` into `threshold` shares.
    pub fn split(secret: &EncryptionKey, threshold: u16) -> Result<Self> {
        if threshold == 0 {
            return Err(SealError::InvalidShares("threshold must be at least 1".into()));
        }

        let mut rng = rand::thread_rng();
        let mut last = *secret.as_bytes();
        let mut shares = Vec::with_capacity(threshold as usize);

        for index in 0..threshold - 1 {
            let mut bytes = [0u8; 32];
            rng.fill_bytes(&mut bytes);
            xor_into(&mut last, &bytes);
            shares.push(DecryptionShare { index, bytes });
        }
        shares.push(DecryptionShare {
            index: threshold - 1,
            bytes: last,
        });
        last.zeroize();

        Ok(Self { threshold, shares })
    }

    /// Number of shares present.
    pub fn len(&self) -> usize {
        self.shares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }

    /// Keep only the first `count` shares.
    pub fn truncate(&mut self, count: usize) {
        self.shares.truncate(count);
    }

    /// Recombine the wrap key.
    pub fn combine(&self) -> Result<EncryptionKey> {
        if self.threshold == 0 {
            return Err(SealError::InvalidShares("threshold must be at least 1".into()));
        }

        let mut seen = vec![false; self.threshold as usize];
        for share in &self.shares {
            let slot = seen.get_mut(share.index as usize).ok_or_else(|| {
                SealError::InvalidShares(format!(
                    "share index {} outside threshold {}",
                    share.index, self.threshold
                ))
            })?;
            if *slot {
                return Err(SealError::InvalidShares(format!(
                    "duplicate share index {}",
                    share.index
                )));
            }
            *slot = true;
        }

        let got = seen.iter().filter(|s| **s).count() as u16;
        if got < self.threshold {
            return Err(SealError::InsufficientShares {
                needed: self.threshold,
                got,
            });
        }

        let mut key = [0u8; 32];
        for share in &self.shares {
            xor_into(&mut key, &share.bytes);
        }
        let combined = EncryptionKey::from_bytes(key);
        key.zeroize();
        Ok(combined)
    }
}

fn xor_into(acc: &mut [u8; 32], other: &[u8; 32]) {
    for (a, b) in acc.iter_mut().zip(other) {
        *a ^= b;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_split_combine() {
        let secret = EncryptionKey::generate();
        let set = ShareSet::split(&secret, 5).unwrap();
        assert_eq!(set.len(), 5);
        assert_eq!(set.combine().unwrap().as_bytes(), secret.as_bytes());
    }

    #[test]
    fn test_single_share_is_the_secret() {
        let secret = EncryptionKey::from_bytes([7; 32]);
        let set = ShareSet::split(&secret, 1).unwrap();
        assert_eq!(set.shares[0].bytes, [7; 32]);
    }

    #[test]
    fn test_missing_share_is_insufficient() {
        let mut set = ShareSet::split(&EncryptionKey::generate(), 4).unwrap();
        set.truncate(3);
        assert_eq!(
            set.combine().err(),
            Some(SealError::InsufficientShares { needed: 4, got: 3 })
        );
    }

    #[test]
    fn test_duplicate_and_out_of_range_rejected() {
        let mut set = ShareSet::split(&EncryptionKey::generate(), 3).unwrap();
        set.shares[1].index = 0;
        assert!(matches!(set.combine(), Err(SealError::InvalidShares(_))));

        let mut set = ShareSet::split(&EncryptionKey::generate(), 3).unwrap();
        set.shares[2].index = 9;
        assert!(matches!(set.combine(), Err(SealError::InvalidShares(_))));
    }

    #[test]
    fn test_zero_threshold_rejected() {
        assert!(ShareSet::split(&EncryptionKey::generate(), 0).is_err());
    }

    proptest! {
        #[test]
        fn test_combine_inverts_split(secret: [u8; 32], threshold in 1u16..40) {
            let set = ShareSet::split(&EncryptionKey::from_bytes(secret), threshold).unwrap();
            let combined = set.combine().unwrap();
            prop_assert_eq!(combined.as_bytes(), &secret);
        }
    }
}
