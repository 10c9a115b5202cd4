//! Identity assertions.

use rand::RngCore;
use serde::{Deserialize, Serialize};

use keygate_core::{Address, Clock};

use crate::error::{IdentityError, Result};
use crate::signer::WalletSignature;
use crate::statement::StatementTemplate;

/// Random freshness value embedded in each statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Nonce(pub [u8; 16]);

impl Nonce {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// A short-lived, wallet-signed proof of control over `address`.
///
/// Produced fresh for every decrypt attempt. The network rejects a nonce it
/// has already honoured, so an assertion cannot be replayed once it has been
/// used to obtain shares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityAssertion {
    pub address: Address,
    /// The template the statement was rendered from.
    pub template: StatementTemplate,
    /// The exact text that was signed.
    pub signed_statement: String,
    pub signature: WalletSignature,
    pub nonce: Nonce,
    /// Unix millis.
    pub issued_at: i64,
    /// Unix millis.
    pub expires_at: i64,
}

impl IdentityAssertion {
    /// Check if the assertion has expired at `now`.
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self, clock: &dyn Clock) -> bool {
        self.is_expired_at(clock.now_millis())
    }

    /// Milliseconds of validity left at `now`.
    pub fn remaining_millis(&self, now: i64) -> i64 {
        (self.expires_at - now).max(0)
    }

    /// Hex digest of the condition this assertion is scoped to.
    pub fn condition_scope(&self) -> Option<&str> {
        self.template.condition_scope()
    }

    /// Fully verify the assertion at `now`.
    ///
    /// Checks, in order: the statement re-renders from the fields, the
    /// signature covers it, the signing key controls `address`, and the
    /// validity window contains `now`.
    pub fn verify(&self, now: i64) -> Result<()> {
        let expected = self.template.render(
            &self.address,
            &self.nonce.to_hex(),
            self.issued_at,
            self.expires_at,
        );
        if expected != self.signed_statement {
            return Err(IdentityError::StatementMismatch);
        }

        self.signature.verify(self.signed_statement.as_bytes())?;

        let derived = self.signature.signer_address();
        if derived != self.address {
            return Err(IdentityError::AddressMismatch {
                claimed: self.address.to_hex(),
                derived: derived.to_hex(),
            });
        }

        if now < self.issued_at {
            return Err(IdentityError::NotYetValid {
                issued_at: self.issued_at,
                now,
            });
        }
        if self.is_expired_at(now) {
            return Err(IdentityError::Expired {
                expires_at: self.expires_at,
                now,
            });
        }
        Ok(())
    }
}
