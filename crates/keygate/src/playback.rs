//! Playback sessions.
//!
//! The [`PlaybackManager`] keeps at most one decrypted plaintext resident.
//! Activating a track tears down whatever session was active (revoking its
//! handle and aborting any decrypt still running) before the new track starts
//! decrypting.
//!
//! ## Ordering
//!
//! Every activation gets a fresh generation number. A decrypt result is
//! applied only if its generation is still the active one when it arrives;
//! the check and the install happen under the same lock that activation and
//! teardown take, so a superseded result can never surface.
//!
//! ## Plaintext lifetime
//!
//! The granted buffer lives in a [`PlaintextHandle`] owned by the session.
//! It is revoked on teardown, on activation of another track, when the
//! manager is closed or dropped, and after `plaintext_lifetime` at the latest.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use zeroize::Zeroizing;

use keygate_core::Clock;
use keygate_identity::IdentityProvider;
use keygate_network::NetworkHandle;
use keygate_seal::EncryptedAsset;

use crate::config::{EngineConfig, JoinPolicy};
use crate::decrypt::{AttemptState, DecryptionGate};
use crate::error::{Error, Result};
use crate::events::{EngineEvent, EventBus};
use crate::handle::{PlaintextHandle, PlaintextLease};

/// Identifier of a playable track.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Loads the encrypted asset behind a track.
#[async_trait]
pub trait AssetResolver: Send + Sync {
    async fn resolve(&self, track: &TrackId) -> Result<EncryptedAsset>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Sessions
// ─────────────────────────────────────────────────────────────────────────────

struct SessionInner {
    track: TrackId,
    generation: u64,
    state: watch::Sender<AttemptState>,
    torn_down: AtomicBool,
    playing: AtomicBool,
    handle: Mutex<Option<PlaintextHandle>>,
    expires_at: Mutex<Option<i64>>,
}

/// Runtime record for one activated track. Clones refer to the same session.
#[derive(Clone)]
pub struct PlaybackSession {
    inner: Arc<SessionInner>,
}

impl PlaybackSession {
    fn new(track: TrackId, generation: u64) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                track,
                generation,
                state: watch::channel(AttemptState::Idle).0,
                torn_down: AtomicBool::new(false),
                playing: AtomicBool::new(false),
                handle: Mutex::new(None),
                expires_at: Mutex::new(None),
            }),
        }
    }

    pub fn track(&self) -> &TrackId {
        &self.inner.track
    }

    /// Activation sequence number; later activations have higher numbers.
    pub fn generation(&self) -> u64 {
        self.inner.generation
    }

    pub fn state(&self) -> AttemptState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AttemptState> {
        self.inner.state.subscribe()
    }

    pub fn is_torn_down(&self) -> bool {
        self.inner.torn_down.load(Ordering::SeqCst)
    }

    pub fn is_playing(&self) -> bool {
        self.inner.playing.load(Ordering::SeqCst)
    }

    /// Whether a decrypted buffer is currently resident.
    pub fn is_live(&self) -> bool {
        self.inner
            .handle
            .lock()
            .as_ref()
            .map(PlaintextHandle::is_live)
            .unwrap_or(false)
    }

    /// A reader for the plaintext, once granted.
    pub fn lease(&self) -> Option<PlaintextLease> {
        self.inner.handle.lock().as_ref().map(PlaintextHandle::lease)
    }

    /// When the plaintext will be revoked at the latest (unix millis).
    pub fn expires_at(&self) -> Option<i64> {
        *self.inner.expires_at.lock()
    }

    /// Wait until the attempt settles or the session is torn down.
    pub async fn settled(&self) -> AttemptState {
        let mut rx = self.inner.state.subscribe();
        let torn_down = &self.inner.torn_down;
        let result = rx
            .wait_for(|s| s.is_terminal() || torn_down.load(Ordering::SeqCst))
            .await
            .map(|s| s.clone());
        match result {
            Ok(state) => state,
            Err(_) => self.state(),
        }
    }

    /// Record a transition unless the session is already torn down.
    fn advance(&self, next: AttemptState) {
        let torn_down = &self.inner.torn_down;
        self.inner.state.send_if_modified(|s| {
            if torn_down.load(Ordering::SeqCst) || *s == next {
                false
            } else {
                *s = next.clone();
                true
            }
        });
    }

    fn install(&self, handle: PlaintextHandle, expires_at: i64) {
        *self.inner.handle.lock() = Some(handle);
        *self.inner.expires_at.lock() = Some(expires_at);
        self.inner.playing.store(true, Ordering::SeqCst);
    }

    fn toggle(&self) -> bool {
        !self.inner.playing.fetch_xor(true, Ordering::SeqCst)
    }

    /// Revoke the plaintext and mark the session finished.
    /// Returns false if it was already torn down.
    fn shut_down(&self) -> bool {
        if self.inner.torn_down.swap(true, Ordering::SeqCst) {
            return false;
        }
        if let Some(handle) = self.inner.handle.lock().take() {
            handle.revoke();
        }
        self.inner.playing.store(false, Ordering::SeqCst);
        self.inner.state.send_modify(|s| {
            if !s.is_terminal() {
                *s = AttemptState::Idle;
            }
        });
        true
    }
}

impl fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("track", self.track())
            .field("generation", &self.generation())
            .field("state", &self.state())
            .field("live", &self.is_live())
            .field("torn_down", &self.is_torn_down())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Manager
// ─────────────────────────────────────────────────────────────────────────────

struct Active {
    session: PlaybackSession,
    attempt: JoinHandle<()>,
    expiry: Option<JoinHandle<()>>,
}

struct ManagerInner {
    gate: DecryptionGate,
    identity: IdentityProvider,
    network: Arc<dyn NetworkHandle>,
    events: EventBus,
    config: Arc<EngineConfig>,
    clock: Arc<dyn Clock>,
    active: Mutex<Option<Active>>,
    generation: AtomicU64,
}

impl ManagerInner {
    fn is_current(active: &Option<Active>, session: &PlaybackSession) -> bool {
        matches!(active, Some(a) if a.session.generation() == session.generation())
    }

    /// Stop the attempt, cancel the expiry timer, and revoke the plaintext.
    fn retire(&self, active: Active, reason: &'static str) {
        active.attempt.abort();
        if let Some(expiry) = active.expiry {
            expiry.abort();
        }

        let session = active.session;
        if session.shut_down() {
            info!(
                track = %session.track(),
                generation = session.generation(),
                reason,
                "session torn down"
            );
            self.events.emit(EngineEvent::SessionTornDown {
                track: session.track().clone(),
                generation: session.generation(),
            });
        }
    }

    /// Apply a finished decrypt, unless it has been superseded.
    fn settle(self: &Arc<Self>, session: &PlaybackSession, result: Result<Zeroizing<Vec<u8>>>) {
        let mut active = self.active.lock();
        if !Self::is_current(&active, session) {
            debug!(
                track = %session.track(),
                generation = session.generation(),
                "discarding stale decrypt result"
            );
            return;
        }

        let state = AttemptState::settled(&result);
        if let Ok(plaintext) = result {
            let lifetime = self.config.plaintext_lifetime;
            let expires_at = self
                .clock
                .now_millis()
                .saturating_add(lifetime.as_millis().min(i64::MAX as u128) as i64);
            session.install(PlaintextHandle::new(plaintext), expires_at);

            let inner = Arc::clone(self);
            let expired = session.clone();
            let timer = tokio::spawn(async move {
                tokio::time::sleep(lifetime).await;
                inner.expire(&expired);
            });
            if let Some(a) = active.as_mut() {
                a.expiry = Some(timer);
            }
        }
        session.advance(state);
    }

    fn expire(&self, session: &PlaybackSession) {
        let mut active = self.active.lock();
        if Self::is_current(&active, session) {
            if let Some(current) = active.take() {
                self.retire(current, "plaintext lifetime elapsed");
            }
        }
    }
}

async fn run_session(
    inner: Arc<ManagerInner>,
    session: PlaybackSession,
    resolver: Arc<dyn AssetResolver>,
) {
    let asset = match resolver.resolve(session.track()).await {
        Ok(asset) => asset,
        Err(e) => {
            inner.events.emit(EngineEvent::Failed {
                category: e.category(),
            });
            inner.settle(&session, Err(e));
            return;
        }
    };

    let progress = |state: AttemptState| session.advance(state);
    let result = inner
        .gate
        .run_attempt(&asset, &inner.identity, inner.network.as_ref(), &progress)
        .await;
    inner.settle(&session, result);
}

/// Owns the single active playback session.
///
/// Dropping the manager tears down the active session.
pub struct PlaybackManager {
    inner: Arc<ManagerInner>,
}

impl PlaybackManager {
    pub fn new(
        gate: DecryptionGate,
        identity: IdentityProvider,
        network: Arc<dyn NetworkHandle>,
        events: EventBus,
        config: Arc<EngineConfig>,
    ) -> Self {
        let clock = Arc::clone(identity.clock());
        Self {
            inner: Arc::new(ManagerInner {
                gate,
                identity,
                network,
                events,
                config,
                clock,
                active: Mutex::new(None),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Make `track` the active session.
    ///
    /// - Same track, granted and live: toggles play/pause.
    /// - Same track, decrypt still running: joins it, or fails with
    ///   [`Error::AlreadyInProgress`] under [`JoinPolicy::Reject`].
    /// - Otherwise: tears down the active session, then starts decrypting.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn activate(
        &self,
        track: TrackId,
        resolver: Arc<dyn AssetResolver>,
    ) -> Result<PlaybackSession> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::TaskFailed(e.to_string()))?;

        let mut active = self.inner.active.lock();

        if let Some(current) = active.as_ref() {
            if current.session.track() == &track {
                if current.session.is_live() {
                    let playing = current.session.toggle();
                    debug!(%track, playing, "playback toggled");
                    self.inner.events.emit(EngineEvent::PlaybackToggled {
                        track,
                        playing,
                    });
                    return Ok(current.session.clone());
                }

                let in_flight =
                    !current.attempt.is_finished() && !current.session.state().is_terminal();
                if in_flight {
                    return match self.inner.config.join_policy {
                        JoinPolicy::Join => {
                            debug!(%track, "joining decrypt in progress");
                            Ok(current.session.clone())
                        }
                        JoinPolicy::Reject => Err(Error::AlreadyInProgress(track)),
                    };
                }
            }
        }

        if let Some(previous) = active.take() {
            self.inner.retire(previous, "superseded");
        }

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let session = PlaybackSession::new(track.clone(), generation);
        let attempt = runtime.spawn(run_session(
            Arc::clone(&self.inner),
            session.clone(),
            resolver,
        ));
        *active = Some(Active {
            session: session.clone(),
            attempt,
            expiry: None,
        });

        info!(%track, generation, "session activated");
        self.inner
            .events
            .emit(EngineEvent::SessionActivated { track, generation });
        Ok(session)
    }

    /// Revoke a session's plaintext. Safe to call any number of times.
    pub fn teardown(&self, session: &PlaybackSession) {
        let mut active = self.inner.active.lock();
        if ManagerInner::is_current(&active, session) {
            if let Some(current) = active.take() {
                self.inner.retire(current, "teardown");
            }
        } else {
            // Superseded sessions were already shut down on retirement.
            session.shut_down();
        }
    }

    /// Flip play/pause on the active session. Returns the new playing flag,
    /// or `None` if no live session is active.
    pub fn toggle(&self) -> Option<bool> {
        let active = self.inner.active.lock();
        let current = active.as_ref()?;
        if !current.session.is_live() {
            return None;
        }
        let playing = current.session.toggle();
        self.inner.events.emit(EngineEvent::PlaybackToggled {
            track: current.session.track().clone(),
            playing,
        });
        Some(playing)
    }

    /// The active session, if any.
    pub fn active(&self) -> Option<PlaybackSession> {
        self.inner
            .active
            .lock()
            .as_ref()
            .map(|a| a.session.clone())
    }

    /// Tear down the active session, as when the consuming view closes.
    pub fn close(&self) {
        let mut active = self.inner.active.lock();
        if let Some(current) = active.take() {
            self.inner.retire(current, "closed");
        }
    }
}

impl Drop for PlaybackManager {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for PlaybackManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackManager")
            .field("active", &self.active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_id_display() {
        let track = TrackId::from("track-7");
        assert_eq!(track.to_string(), "track-7");
        assert_eq!(track.as_str(), "track-7");
    }

    #[test]
    fn test_session_shut_down_once() {
        let session = PlaybackSession::new(TrackId::new("a"), 1);
        session.install(PlaintextHandle::new(Zeroizing::new(vec![1, 2, 3])), 0);
        let lease = session.lease().unwrap();
        assert!(session.is_live());

        assert!(session.shut_down());
        assert!(!session.shut_down());
        assert!(!session.is_live());
        assert!(lease.read(|b| b.len()).is_err());
        assert_eq!(session.state(), AttemptState::Idle);
    }

    #[test]
    fn test_no_transitions_after_shut_down() {
        let session = PlaybackSession::new(TrackId::new("a"), 1);
        session.advance(AttemptState::RequestingIdentity);
        assert_eq!(session.state(), AttemptState::RequestingIdentity);

        session.shut_down();
        assert_eq!(session.state(), AttemptState::Idle);

        session.advance(AttemptState::PetitioningNetwork);
        assert_eq!(session.state(), AttemptState::Idle);
    }

    #[test]
    fn test_toggle_flips_playing() {
        let session = PlaybackSession::new(TrackId::new("a"), 1);
        session.install(PlaintextHandle::new(Zeroizing::new(vec![0])), 0);
        assert!(session.is_playing());
        assert!(!session.toggle());
        assert!(session.toggle());
    }

    #[tokio::test]
    async fn test_settled_returns_on_teardown() {
        let session = PlaybackSession::new(TrackId::new("a"), 1);
        let waiter = {
            let session = session.clone();
            tokio::spawn(async move { session.settled().await })
        };
        tokio::task::yield_now().await;
        session.shut_down();
        assert_eq!(waiter.await.unwrap(), AttemptState::Idle);
    }
}
