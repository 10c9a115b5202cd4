//! An in-process decryption network.
//!
//! Holds ritual secrets and a balance ledger, and answers petitions the way
//! a real network would: verify the assertion, evaluate the condition for
//! the asserted address, and release the wrap key as shares. Test controls
//! allow injecting faults, holding petitions in flight, and adding latency.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info};

use keygate_core::{ChainRegistry, Clock, Condition, Domain, RitualId, SystemClock};
use keygate_identity::{IdentityAssertion, IdentityError, Nonce};
use keygate_seal::{BindingDigest, KeyCapsule, ShareSet, X25519StaticSecret};

use crate::error::{NetworkError, Result};
use crate::ledger::BalanceLedger;
use crate::messages::{CiphertextRef, ConditionContext, PetitionOutcome, PublicParameters};
use crate::network::NetworkHandle;

/// A scripted failure for the next request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Fail with [`NetworkError::Unavailable`].
    Unavailable,
    /// Grant, but return only this many shares.
    ShortShares(u16),
}

struct Ritual {
    params: PublicParameters,
    secret: X25519StaticSecret,
}

struct Inner {
    rituals: Mutex<HashMap<(Domain, RitualId), Ritual>>,
    ledger: BalanceLedger,
    chains: ChainRegistry,
    clock: Arc<dyn Clock>,
    fetch_faults: Mutex<VecDeque<Fault>>,
    petition_faults: Mutex<VecDeque<Fault>>,
    // Nonce -> expiry of the assertion that spent it.
    honoured: Mutex<HashMap<Nonce, i64>>,
    latency: Mutex<Duration>,
    held: watch::Sender<bool>,
    in_flight: watch::Sender<usize>,
    fetches: AtomicUsize,
    petitions: AtomicUsize,
}

/// In-memory [`NetworkHandle`]. Clones share state.
#[derive(Clone)]
pub struct MemoryNetwork {
    inner: Arc<Inner>,
}

impl MemoryNetwork {
    /// Create a network using wall-clock time and the default chain registry.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a network that checks assertion expiry against `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::with_clock_and_chains(clock, ChainRegistry::default())
    }

    pub fn with_clock_and_chains(clock: Arc<dyn Clock>, chains: ChainRegistry) -> Self {
        Self {
            inner: Arc::new(Inner {
                rituals: Mutex::new(HashMap::new()),
                ledger: BalanceLedger::new(),
                chains,
                clock,
                fetch_faults: Mutex::new(VecDeque::new()),
                petition_faults: Mutex::new(VecDeque::new()),
                honoured: Mutex::new(HashMap::new()),
                latency: Mutex::new(Duration::ZERO),
                held: watch::channel(false).0,
                in_flight: watch::channel(0).0,
                fetches: AtomicUsize::new(0),
                petitions: AtomicUsize::new(0),
            }),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Rituals and balances
    // ─────────────────────────────────────────────────────────────────────────

    /// Create (or replace) a ritual with a fresh key.
    pub fn create_ritual(
        &self,
        domain: Domain,
        ritual: RitualId,
        threshold: u16,
        participants: u16,
    ) -> PublicParameters {
        let secret = X25519StaticSecret::generate();
        let params = PublicParameters {
            domain,
            ritual,
            public_key: secret.public_key(),
            threshold,
            participants,
            active: true,
        };
        self.inner
            .rituals
            .lock()
            .insert((domain, ritual), Ritual { params, secret });
        info!(%domain, %ritual, threshold, participants, "ritual created");
        params
    }

    /// Mark a ritual inactive. Returns false if it does not exist.
    pub fn deactivate_ritual(&self, domain: Domain, ritual: RitualId) -> bool {
        match self.inner.rituals.lock().get_mut(&(domain, ritual)) {
            Some(r) => {
                r.params.active = false;
                true
            }
            None => false,
        }
    }

    pub fn ledger(&self) -> &BalanceLedger {
        &self.inner.ledger
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Test controls
    // ─────────────────────────────────────────────────────────────────────────

    /// Queue a fault for an upcoming parameter fetch.
    pub fn fail_next_fetch(&self, fault: Fault) {
        self.inner.fetch_faults.lock().push_back(fault);
    }

    /// Queue a fault for an upcoming petition.
    pub fn fail_next_petition(&self, fault: Fault) {
        self.inner.petition_faults.lock().push_back(fault);
    }

    /// Delay every request by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *self.inner.latency.lock() = latency;
    }

    /// Hold petitions in flight until [`MemoryNetwork::release_petitions`].
    pub fn hold_petitions(&self) {
        self.inner.held.send_replace(true);
    }

    pub fn release_petitions(&self) {
        self.inner.held.send_replace(false);
    }

    /// Petitions currently being processed.
    pub fn in_flight(&self) -> usize {
        *self.inner.in_flight.borrow()
    }

    /// Wait until at least `n` petitions are in flight.
    pub async fn wait_for_in_flight(&self, n: usize) {
        let mut rx = self.inner.in_flight.subscribe();
        let _ = rx.wait_for(|count| *count >= n).await;
    }

    /// Wait until no petition is in flight.
    pub async fn wait_until_idle(&self) {
        let mut rx = self.inner.in_flight.subscribe();
        let _ = rx.wait_for(|count| *count == 0).await;
    }

    /// Total parameter fetches received.
    pub fn fetch_count(&self) -> usize {
        self.inner.fetches.load(Ordering::SeqCst)
    }

    /// Total petitions received.
    pub fn petition_count(&self) -> usize {
        self.inner.petitions.load(Ordering::SeqCst)
    }

    /// Nonces still remembered as spent.
    pub fn honoured_count(&self) -> usize {
        self.inner.honoured.lock().len()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Request handling
    // ─────────────────────────────────────────────────────────────────────────

    async fn simulate_latency(&self) {
        let latency = *self.inner.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }

    async fn wait_while_held(&self) {
        let mut rx = self.inner.held.subscribe();
        let _ = rx.wait_for(|held| !*held).await;
    }

    fn check_assertion(&self, context: &ConditionContext) -> Result<()> {
        let assertion = &context.assertion;
        let now = self.inner.clock.now_millis();

        assertion.verify(now).map_err(|e| match e {
            IdentityError::Expired { .. } => NetworkError::AssertionRejected("expired".into()),
            other => NetworkError::AssertionRejected(other.to_string()),
        })?;

        if context.user_address() != Some(assertion.address) {
            return Err(NetworkError::AssertionRejected(
                "user address parameter does not match assertion".into(),
            ));
        }

        match assertion.condition_scope() {
            Some(scope) if scope == context.condition_digest_hex() => {}
            Some(_) => {
                return Err(NetworkError::AssertionRejected(
                    "assertion is scoped to a different condition".into(),
                ))
            }
            None => {
                return Err(NetworkError::AssertionRejected(
                    "assertion is not scoped to a condition".into(),
                ))
            }
        }

        if self.inner.honoured.lock().contains_key(&assertion.nonce) {
            return Err(NetworkError::AssertionRejected("nonce already used".into()));
        }
        Ok(())
    }

    /// Remember a spent nonce. Nonces of expired assertions are dropped:
    /// those assertions fail verification before the nonce is consulted.
    fn honour(&self, assertion: &IdentityAssertion) {
        let now = self.inner.clock.now_millis();
        let mut honoured = self.inner.honoured.lock();
        honoured.retain(|_, expires_at| *expires_at > now);
        honoured.insert(assertion.nonce, assertion.expires_at);
    }

    async fn process_petition(
        &self,
        ciphertext: &CiphertextRef,
        context: &ConditionContext,
    ) -> Result<PetitionOutcome> {
        self.wait_while_held().await;
        self.simulate_latency().await;

        let fault = self.inner.petition_faults.lock().pop_front();
        if fault == Some(Fault::Unavailable) {
            return Err(NetworkError::Unavailable("injected fault".into()));
        }

        self.check_assertion(context)?;

        let condition = match Condition::decode(&context.condition) {
            Ok(c) => c,
            Err(e) => {
                return Ok(PetitionOutcome::Denied {
                    reason: format!("undecodable condition: {e}"),
                })
            }
        };
        if let Some(b) = condition.balance() {
            if !self.inner.chains.contains(b.chain()) {
                return Ok(PetitionOutcome::Denied {
                    reason: format!("chain {} not supported", b.chain()),
                });
            }
        }

        let holder = context.assertion.address;
        match self.inner.ledger.evaluate(&condition, &holder) {
            Some(true) => {}
            Some(false) => {
                debug!(holder = %holder, "condition not met");
                return Ok(PetitionOutcome::Denied {
                    reason: "condition not met".into(),
                });
            }
            None => {
                return Ok(PetitionOutcome::Denied {
                    reason: format!("unsupported condition kind {}", condition.tag()),
                })
            }
        }

        let mut shares = {
            let rituals = self.inner.rituals.lock();
            let ritual = rituals
                .get(&(ciphertext.domain, ciphertext.ritual))
                .ok_or_else(|| {
                    NetworkError::PolicyRejected(format!("unknown ritual {}", ciphertext.ritual))
                })?;
            if !ritual.params.is_serviceable() {
                return Err(NetworkError::PolicyRejected(format!(
                    "ritual {} is not serviceable",
                    ciphertext.ritual
                )));
            }

            let binding =
                BindingDigest::compute(ciphertext.domain, ciphertext.ritual, &context.condition);
            let wrap_key =
                KeyCapsule::derive_wrap_key(&ciphertext.ephemeral_public, &ritual.secret, &binding);
            ShareSet::split(&wrap_key, ritual.params.threshold)
                .map_err(|e| NetworkError::PolicyRejected(e.to_string()))?
        };

        match fault {
            Some(Fault::ShortShares(n)) => shares.truncate(n as usize),
            _ => {
                self.honour(&context.assertion);
            }
        }

        debug!(holder = %holder, shares = shares.len(), "petition granted");
        Ok(PetitionOutcome::Granted(shares))
    }
}

impl Default for MemoryNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryNetwork")
            .field("rituals", &self.inner.rituals.lock().len())
            .field("petitions", &self.petition_count())
            .finish()
    }
}

/// Counts a petition as in flight until dropped, including on cancellation.
struct InFlight<'a>(&'a watch::Sender<usize>);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a watch::Sender<usize>) -> Self {
        counter.send_modify(|c| *c += 1);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.send_modify(|c| *c = c.saturating_sub(1));
    }
}

#[async_trait]
impl NetworkHandle for MemoryNetwork {
    async fn fetch_parameters(&self, ritual: RitualId, domain: Domain) -> Result<PublicParameters> {
        self.inner.fetches.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        if self.inner.fetch_faults.lock().pop_front() == Some(Fault::Unavailable) {
            return Err(NetworkError::Unavailable("injected fault".into()));
        }

        self.inner
            .rituals
            .lock()
            .get(&(domain, ritual))
            .map(|r| r.params)
            .ok_or_else(|| NetworkError::PolicyRejected(format!("unknown ritual {ritual} on {domain}")))
    }

    async fn petition_decrypt(
        &self,
        ciphertext: &CiphertextRef,
        context: &ConditionContext,
    ) -> Result<PetitionOutcome> {
        self.inner.petitions.fetch_add(1, Ordering::SeqCst);
        let _guard = InFlight::enter(&self.inner.in_flight);
        self.process_petition(ciphertext, context).await
    }
}
