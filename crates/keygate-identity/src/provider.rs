//! The signature identity provider.
//!
//! Wraps an injected wallet signer and produces [`IdentityAssertion`]s. The
//! signer is the only suspension point that waits on a human; dropping the
//! returned future abandons the prompt without side effects.

use std::sync::Arc;

use tracing::debug;

use keygate_core::{Clock, SystemClock};

use crate::assertion::{IdentityAssertion, Nonce};
use crate::error::{IdentityError, Result};
use crate::signer::WalletSigner;
use crate::statement::StatementTemplate;

/// Produces identity assertions from an attached wallet signer.
#[derive(Clone)]
pub struct IdentityProvider {
    signer: Option<Arc<dyn WalletSigner>>,
    clock: Arc<dyn Clock>,
}

impl IdentityProvider {
    /// A provider with no signer attached.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            signer: None,
            clock,
        }
    }

    /// A provider with `signer` attached, using wall-clock time.
    pub fn with_signer(signer: Arc<dyn WalletSigner>) -> Self {
        Self {
            signer: Some(signer),
            clock: Arc::new(SystemClock),
        }
    }

    /// Attach or replace the wallet signer.
    pub fn attach(&mut self, signer: Arc<dyn WalletSigner>) {
        self.signer = Some(signer);
    }

    /// Detach the wallet signer.
    pub fn detach(&mut self) {
        self.signer = None;
    }

    pub fn is_attached(&self) -> bool {
        self.signer.is_some()
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Produce a fresh assertion using the attached signer.
    pub async fn assert(&self, template: &StatementTemplate) -> Result<IdentityAssertion> {
        let signer = self.signer.as_deref().ok_or(IdentityError::Unavailable)?;
        assert_with(template, signer, self.clock.as_ref()).await
    }
}

impl std::fmt::Debug for IdentityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityProvider")
            .field("attached", &self.signer.is_some())
            .finish()
    }
}

/// Produce a fresh assertion from `signer`.
///
/// The statement binds the signer's address, a random nonce, and an explicit
/// expiry `template.ttl` after issuance.
pub async fn assert_with(
    template: &StatementTemplate,
    signer: &dyn WalletSigner,
    clock: &dyn Clock,
) -> Result<IdentityAssertion> {
    template.validate()?;

    let address = signer.address().await?;
    let nonce = Nonce::generate();
    let issued_at = clock.now_millis();
    let expires_at = issued_at.saturating_add(template.ttl.as_millis() as i64);
    let signed_statement = template.render(&address, &nonce.to_hex(), issued_at, expires_at);

    debug!(address = %address, expires_at, "requesting wallet signature");
    let signature = signer.sign_message(&signed_statement).await?;

    let derived = signature.signer_address();
    if derived != address {
        return Err(IdentityError::AddressMismatch {
            claimed: address.to_hex(),
            derived: derived.to_hex(),
        });
    }

    Ok(IdentityAssertion {
        address,
        template: template.clone(),
        signed_statement,
        signature,
        nonce,
        issued_at,
        expires_at,
    })
}
