//! The decryption network seam.
//!
//! The engine treats the threshold network as an opaque remote service. An
//! implementation may speak HTTP to real nodes or, as [`crate::MemoryNetwork`]
//! does, evaluate everything in process.

use async_trait::async_trait;

use keygate_core::{Domain, RitualId};

use crate::error::Result;
use crate::messages::{CiphertextRef, ConditionContext, PetitionOutcome, PublicParameters};

/// A handle to a decentralized threshold-decryption network.
///
/// Implementations must be thread-safe (Send + Sync). Dropping a returned
/// future must abandon the request without further side effects.
#[async_trait]
pub trait NetworkHandle: Send + Sync {
    /// Fetch the current public parameters of a ritual.
    async fn fetch_parameters(&self, ritual: RitualId, domain: Domain) -> Result<PublicParameters>;

    /// Ask the network to evaluate `context` and, if it holds, release the
    /// key shares for `ciphertext`.
    async fn petition_decrypt(
        &self,
        ciphertext: &CiphertextRef,
        context: &ConditionContext,
    ) -> Result<PetitionOutcome>;
}
