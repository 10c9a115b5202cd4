//! The decryption gate.
//!
//! [`DecryptionGate::decrypt`] turns an asset plus a fresh identity
//! assertion into plaintext, or into a precise failure:
//!
//! - expired assertion: [`Error::AssertionExpired`], before any petition
//! - assertion scoped to another condition, or to none:
//!   [`Error::AssertionRejected`], before any petition
//! - predicate false: [`Error::AccessDenied`], never retried
//! - unavailable / timed out / short share sets: retried with backoff, then
//!   [`Error::DecryptionUnavailable`]
//! - header or ciphertext that fails to parse or authenticate:
//!   [`Error::CorruptHeader`] / [`Error::CorruptData`], never retried
//!
//! ## Attempt lifecycle
//!
//! ```text
//! Idle -> RequestingIdentity -> PetitioningNetwork -> Granted
//!                                                  -> Denied
//!                                                  -> Failed
//! ```
//!
//! A [`DecryptAttempt`] runs that lifecycle on a background task.
//! Cancelling it drops the task at its current suspension point: while the
//! wallet prompt is open that means no petition is ever sent, and while
//! petitioning it means the in-flight request future is dropped.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use keygate_core::Clock;
use keygate_identity::{IdentityAssertion, IdentityProvider, StatementTemplate};
use keygate_network::{
    CiphertextRef, ConditionContext, NetworkError, NetworkHandle, PetitionOutcome,
};
use keygate_seal::{EncryptedAsset, ShareSet};

use crate::config::EngineConfig;
use crate::error::{Error, ErrorCategory, Result};
use crate::events::{EngineEvent, EventBus};
use crate::retry::{with_timeout, RetryExhausted};

/// Where a decrypt attempt stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptState {
    Idle,
    /// Waiting on the wallet signature prompt.
    RequestingIdentity,
    /// Waiting on the network.
    PetitioningNetwork,
    Granted,
    Denied(String),
    Failed(ErrorCategory),
}

impl AttemptState {
    /// Granted, denied and failed are final.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AttemptState::Granted | AttemptState::Denied(_) | AttemptState::Failed(_)
        )
    }

    /// The final state for a finished attempt.
    pub fn settled<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => AttemptState::Granted,
            Err(Error::AccessDenied(reason)) => AttemptState::Denied(reason.clone()),
            Err(Error::Cancelled) => AttemptState::Idle,
            Err(e) => AttemptState::Failed(e.category()),
        }
    }
}

/// Petitions the network and opens assets.
#[derive(Clone)]
pub struct DecryptionGate {
    config: Arc<EngineConfig>,
    events: EventBus,
    clock: Arc<dyn Clock>,
}

impl DecryptionGate {
    pub fn new(config: Arc<EngineConfig>, events: EventBus, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            events,
            clock,
        }
    }

    /// Parse a stored asset and decrypt it.
    pub async fn decrypt_bytes(
        &self,
        asset_bytes: &[u8],
        identity: IdentityAssertion,
        network: &dyn NetworkHandle,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let asset = EncryptedAsset::from_bytes(asset_bytes).map_err(|e| self.fail(e.into()))?;
        self.decrypt(&asset, identity, network).await
    }

    /// Petition the network with `identity` and decrypt `asset`.
    pub async fn decrypt(
        &self,
        asset: &EncryptedAsset,
        identity: IdentityAssertion,
        network: &dyn NetworkHandle,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let now = self.clock.now_millis();
        if identity.is_expired_at(now) {
            warn!(
                address = %identity.address,
                expired_at = identity.expires_at,
                "assertion expired before petition"
            );
            return Err(self.fail(Error::AssertionExpired));
        }

        let header = &asset.header;
        let scope = hex::encode(blake3::hash(header.condition_bytes()).as_bytes());
        if identity.condition_scope() != Some(scope.as_str()) {
            warn!(address = %identity.address, "assertion not scoped to this condition");
            return Err(self.fail(Error::AssertionRejected(
                "assertion is not scoped to this condition".into(),
            )));
        }

        let needed = header.params().threshold;
        let ciphertext = CiphertextRef::for_asset(asset);
        let context = ConditionContext::new(header.condition_bytes(), identity);

        let petitioned = self
            .config
            .retry
            .run(
                |attempt| {
                    let (ciphertext, context) = (&ciphertext, &context);
                    self.events
                        .emit(EngineEvent::PetitioningNetwork { attempt });
                    debug!(ritual = %ciphertext.ritual, attempt, "petitioning network");
                    async move {
                        with_timeout(
                            self.config.petition_timeout,
                            network.petition_decrypt(ciphertext, context),
                        )
                        .await
                        .and_then(|outcome| check_share_count(outcome, needed))
                    }
                },
                |attempt, delay, error| {
                    warn!(attempt, error = %error, "petition failed, retrying");
                    self.events.emit(EngineEvent::RetryScheduled {
                        attempt,
                        delay_ms: delay.as_millis() as u64,
                        reason: error.to_string(),
                    });
                },
            )
            .await;

        let shares = match petitioned {
            Ok(PetitionOutcome::Granted(shares)) => shares,
            Ok(PetitionOutcome::Denied { reason }) => {
                info!(address = %context.assertion.address, reason = %reason, "access denied");
                self.events.emit(EngineEvent::Denied {
                    reason: reason.clone(),
                });
                return Err(Error::AccessDenied(reason));
            }
            Err(exhausted) => return Err(self.fail(petition_error(exhausted))),
        };

        let wrap_key = shares.combine().map_err(|e| self.fail(e.into()))?;
        let plaintext = asset.open(&wrap_key).map_err(|e| self.fail(e.into()))?;

        info!(
            address = %context.assertion.address,
            bytes = plaintext.len(),
            "decryption granted"
        );
        self.events.emit(EngineEvent::Granted);
        Ok(plaintext)
    }

    /// Drive one attempt: obtain an assertion scoped to the asset's
    /// condition, then decrypt. An assertion that expires before the
    /// petition is refreshed once.
    ///
    /// `progress` observes every non-terminal transition. The caller
    /// decides how to publish the terminal state.
    pub async fn run_attempt(
        &self,
        asset: &EncryptedAsset,
        identity: &IdentityProvider,
        network: &dyn NetworkHandle,
        progress: &(dyn Fn(AttemptState) + Send + Sync),
    ) -> Result<Zeroizing<Vec<u8>>> {
        let template = self.scoped_template(asset);
        let mut refreshed = false;

        loop {
            progress(AttemptState::RequestingIdentity);
            self.events.emit(EngineEvent::RequestingIdentity);
            let assertion = identity.assert(&template).await.map_err(|e| self.fail(e.into()))?;
            self.events.emit(EngineEvent::IdentityAsserted {
                address: assertion.address,
            });

            progress(AttemptState::PetitioningNetwork);
            match self.decrypt(asset, assertion, network).await {
                Err(Error::AssertionExpired) if !refreshed => {
                    refreshed = true;
                    warn!("assertion expired, requesting a fresh one");
                }
                other => return other,
            }
        }
    }

    /// Start an attempt on a background task.
    pub fn begin(
        &self,
        asset: EncryptedAsset,
        identity: IdentityProvider,
        network: Arc<dyn NetworkHandle>,
    ) -> DecryptAttempt {
        let state = Arc::new(watch::channel(AttemptState::Idle).0);
        let gate = self.clone();
        let task_state = Arc::clone(&state);

        let task = tokio::spawn(async move {
            let progress = |s: AttemptState| {
                task_state.send_replace(s);
            };
            let result = gate
                .run_attempt(&asset, &identity, network.as_ref(), &progress)
                .await;
            task_state.send_replace(AttemptState::settled(&result));
            result
        });

        DecryptAttempt {
            state,
            task: Some(task),
            finished: None,
        }
    }

    fn scoped_template(&self, asset: &EncryptedAsset) -> StatementTemplate {
        let digest = blake3::hash(asset.header.condition_bytes());
        self.config.statement.for_condition(digest.as_bytes())
    }

    fn fail(&self, err: Error) -> Error {
        self.events.emit(EngineEvent::Failed {
            category: err.category(),
        });
        err
    }
}

impl std::fmt::Debug for DecryptionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecryptionGate")
            .field("ritual", &self.config.ritual_id)
            .finish()
    }
}

/// A grant with fewer shares than the threshold is a partial answer from
/// the network, and is retried like any transient failure.
fn check_share_count(
    outcome: PetitionOutcome,
    header_threshold: u16,
) -> keygate_network::Result<PetitionOutcome> {
    if let PetitionOutcome::Granted(shares) = &outcome {
        let needed = header_threshold.max(shares.threshold);
        let got = share_count(shares);
        if got < needed {
            return Err(NetworkError::InsufficientShares { needed, got });
        }
    }
    Ok(outcome)
}

fn share_count(shares: &ShareSet) -> u16 {
    u16::try_from(shares.len()).unwrap_or(u16::MAX)
}

fn petition_error(exhausted: RetryExhausted) -> Error {
    let RetryExhausted { attempts, error } = exhausted;
    match error {
        e if e.is_transient() => Error::DecryptionUnavailable { attempts, last: e },
        NetworkError::AssertionRejected(reason) if reason == "expired" => Error::AssertionExpired,
        NetworkError::AssertionRejected(reason) => Error::AssertionRejected(reason),
        other => Error::Network(other),
    }
}

/// A decrypt running on a background task.
pub struct DecryptAttempt {
    state: Arc<watch::Sender<AttemptState>>,
    // Taken once a cancel has joined the task.
    task: Option<JoinHandle<Result<Zeroizing<Vec<u8>>>>>,
    // Result of a task that finished before a cancel could stop it.
    finished: Option<Result<Zeroizing<Vec<u8>>>>,
}

impl DecryptAttempt {
    pub fn state(&self) -> AttemptState {
        self.state.borrow().clone()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<AttemptState> {
        self.state.subscribe()
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for the attempt to finish.
    pub async fn wait(self) -> Result<Zeroizing<Vec<u8>>> {
        let task = match (self.task, self.finished) {
            (Some(task), _) => task,
            (None, Some(result)) => return result,
            (None, None) => return Err(Error::Cancelled),
        };
        match task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(Error::Cancelled),
            Err(e) => Err(Error::TaskFailed(e.to_string())),
        }
    }

    /// Abort the attempt and return it to [`AttemptState::Idle`].
    ///
    /// Returns once the task has stopped, so no transition can follow.
    /// Cancelling a finished attempt leaves its terminal state in place.
    pub async fn cancel(&mut self) {
        if self.is_finished() {
            return;
        }
        self.abort_and_join().await;
    }

    async fn abort_and_join(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        task.abort();
        match task.await {
            // Finished before the abort landed: the state is already terminal
            // and `wait` must report the same outcome.
            Ok(result) => self.finished = Some(result),
            Err(_) => {
                self.state.send_if_modified(|s| {
                    if s.is_terminal() {
                        false
                    } else {
                        *s = AttemptState::Idle;
                        true
                    }
                });
                debug!("decrypt attempt cancelled");
            }
        }
    }
}

impl std::fmt::Debug for DecryptAttempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecryptAttempt")
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keygate_seal::EncryptionKey;

    fn shares(threshold: u16, keep: usize) -> ShareSet {
        let mut set = ShareSet::split(&EncryptionKey::generate(), threshold).unwrap();
        set.truncate(keep);
        set
    }

    fn attempt<F>(fut: F) -> DecryptAttempt
    where
        F: std::future::Future<Output = Result<Zeroizing<Vec<u8>>>> + Send + 'static,
    {
        let state = Arc::new(watch::channel(AttemptState::PetitioningNetwork).0);
        let task_state = Arc::clone(&state);
        let task = tokio::spawn(async move {
            let result = fut.await;
            task_state.send_replace(AttemptState::settled(&result));
            result
        });
        DecryptAttempt {
            state,
            task: Some(task),
            finished: None,
        }
    }

    #[tokio::test]
    async fn test_abort_after_completion_keeps_result() {
        let mut a = attempt(async { Ok(Zeroizing::new(vec![7u8])) });
        while !a.task.as_ref().unwrap().is_finished() {
            tokio::task::yield_now().await;
        }

        // Joins a task that already completed, as when it finishes between
        // the finished check and the abort.
        a.abort_and_join().await;
        assert_eq!(a.state(), AttemptState::Granted);
        assert_eq!(a.wait().await.unwrap().as_slice(), &[7u8]);
    }

    #[tokio::test]
    async fn test_abort_of_pending_attempt_goes_idle() {
        let mut a = attempt(std::future::pending());
        a.abort_and_join().await;
        assert_eq!(a.state(), AttemptState::Idle);
        assert!(a.is_finished());
        assert!(matches!(a.wait().await, Err(Error::Cancelled)));
    }

    #[test]
    fn test_settled_states() {
        assert_eq!(AttemptState::settled(&Ok(())), AttemptState::Granted);
        assert_eq!(
            AttemptState::settled::<()>(&Err(Error::AccessDenied("no".into()))),
            AttemptState::Denied("no".into())
        );
        assert_eq!(
            AttemptState::settled::<()>(&Err(Error::CorruptHeader("x".into()))),
            AttemptState::Failed(ErrorCategory::CorruptData)
        );
        assert_eq!(
            AttemptState::settled::<()>(&Err(Error::Cancelled)),
            AttemptState::Idle
        );
        assert!(!AttemptState::PetitioningNetwork.is_terminal());
    }

    #[test]
    fn test_short_share_set_is_transient() {
        let err = check_share_count(PetitionOutcome::Granted(shares(3, 2)), 3).unwrap_err();
        assert_eq!(err, NetworkError::InsufficientShares { needed: 3, got: 2 });
        assert!(err.is_transient());

        assert!(check_share_count(PetitionOutcome::Granted(shares(3, 3)), 3).is_ok());
        assert!(check_share_count(
            PetitionOutcome::Denied {
                reason: "condition not met".into()
            },
            3
        )
        .is_ok());
    }

    #[test]
    fn test_petition_error_mapping() {
        let unavailable = petition_error(RetryExhausted {
            attempts: 3,
            error: NetworkError::Unavailable("down".into()),
        });
        assert!(matches!(
            unavailable,
            Error::DecryptionUnavailable { attempts: 3, .. }
        ));

        let expired = petition_error(RetryExhausted {
            attempts: 1,
            error: NetworkError::AssertionRejected("expired".into()),
        });
        assert!(matches!(expired, Error::AssertionExpired));

        let replayed = petition_error(RetryExhausted {
            attempts: 1,
            error: NetworkError::AssertionRejected("nonce already used".into()),
        });
        assert_eq!(replayed.category(), ErrorCategory::Identity);
    }
}
