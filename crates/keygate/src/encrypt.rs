//! The encryption orchestrator.
//!
//! Validates the condition, fetches the configured ritual's public
//! parameters, and seals the plaintext under them. The only external side
//! effect is the parameter fetch; nothing is retained on failure.

use std::sync::Arc;

use tracing::{debug, info, warn};

use keygate_core::Condition;
use keygate_network::{NetworkError, NetworkHandle, PublicParameters};
use keygate_seal::EncryptedAsset;

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::events::{EngineEvent, EventBus};
use crate::retry::{with_timeout, RetryExhausted};

/// Seals content for the configured ritual.
#[derive(Debug, Clone)]
pub struct Encryptor {
    config: Arc<EngineConfig>,
    events: EventBus,
}

impl Encryptor {
    pub fn new(config: Arc<EngineConfig>, events: EventBus) -> Self {
        Self { config, events }
    }

    /// Encrypt `plaintext` so that it can only be released to identities
    /// satisfying `condition`.
    ///
    /// The condition is validated before any network call. Output is not
    /// deterministic: keys, nonces and ritual parameters may all differ
    /// between calls.
    pub async fn encrypt(
        &self,
        plaintext: &[u8],
        condition: &Condition,
        network: &dyn NetworkHandle,
    ) -> Result<EncryptedAsset> {
        condition.validate_with(&self.config.chains)?;
        self.events.emit(EngineEvent::ConditionValidated {
            kind: condition.tag().to_string(),
        });

        let params = self.fetch_parameters(network).await?;

        self.events.emit(EngineEvent::Encrypting {
            bytes: plaintext.len(),
        });
        let asset = EncryptedAsset::seal(plaintext, condition, params.ritual_parameters())?;

        info!(
            ritual = %params.ritual,
            bytes = plaintext.len(),
            ciphertext = asset.ciphertext.len(),
            "content encrypted"
        );
        self.events.emit(EngineEvent::Encrypted {
            bytes: asset.ciphertext.len(),
        });
        Ok(asset)
    }

    async fn fetch_parameters(&self, network: &dyn NetworkHandle) -> Result<PublicParameters> {
        let domain = self.config.domain;
        let ritual = self.config.ritual_id;
        self.events
            .emit(EngineEvent::FetchingParameters { domain, ritual });

        let fetched = self
            .config
            .retry
            .run(
                |attempt| {
                    debug!(%ritual, %domain, attempt, "fetching ritual parameters");
                    with_timeout(self.config.fetch_timeout, network.fetch_parameters(ritual, domain))
                },
                |attempt, delay, error| {
                    warn!(%ritual, attempt, error = %error, "parameter fetch failed, retrying");
                    self.events.emit(EngineEvent::RetryScheduled {
                        attempt,
                        delay_ms: delay.as_millis() as u64,
                        reason: error.to_string(),
                    });
                },
            )
            .await;

        let params = match fetched {
            Ok(params) => params,
            Err(RetryExhausted { error, .. }) => {
                let err = match error {
                    NetworkError::PolicyRejected(reason) => Error::EncryptionPolicyRejected(reason),
                    other => Error::EncryptionNetworkUnavailable(other),
                };
                self.events.emit(EngineEvent::Failed {
                    category: err.category(),
                });
                return Err(err);
            }
        };

        if params.domain != domain || params.ritual != ritual {
            return Err(self.rejected(format!(
                "network answered for ritual {} on {}",
                params.ritual, params.domain
            )));
        }
        if !params.is_serviceable() {
            return Err(self.rejected(format!(
                "ritual {ritual} cannot serve threshold {} of {} (active: {})",
                params.threshold, params.participants, params.active
            )));
        }

        self.events.emit(EngineEvent::ParametersFetched {
            ritual,
            threshold: params.threshold,
        });
        Ok(params)
    }

    fn rejected(&self, reason: String) -> Error {
        warn!(reason = %reason, "encryption policy rejected");
        let err = Error::EncryptionPolicyRejected(reason);
        self.events.emit(EngineEvent::Failed {
            category: err.category(),
        });
        err
    }
}
