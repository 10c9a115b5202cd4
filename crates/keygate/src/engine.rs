//! The Engine: one entry point over encryption, decryption and playback.
//!
//! The network handle and identity provider are injected at construction;
//! nothing is read from ambient state.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::broadcast;
use tracing::info;
use zeroize::Zeroizing;

use keygate_core::Condition;
use keygate_identity::IdentityProvider;
use keygate_network::NetworkHandle;
use keygate_seal::EncryptedAsset;

use crate::config::EngineConfig;
use crate::decrypt::{AttemptState, DecryptAttempt, DecryptionGate};
use crate::encrypt::Encryptor;
use crate::error::{Error, Result};
use crate::events::{EngineEvent, EventBus};
use crate::playback::{AssetResolver, PlaybackManager, PlaybackSession, TrackId};
use crate::store::{ContentId, ContentStore};

/// The condition-gated content engine.
pub struct Engine {
    config: Arc<EngineConfig>,
    network: Arc<dyn NetworkHandle>,
    identity: IdentityProvider,
    events: EventBus,
    encryptor: Encryptor,
    gate: DecryptionGate,
    playback: PlaybackManager,
}

impl Engine {
    /// Create an engine. Fails if the configuration is unusable.
    pub fn new(
        config: EngineConfig,
        network: Arc<dyn NetworkHandle>,
        identity: IdentityProvider,
    ) -> Result<Self> {
        config.validate()?;

        let config = Arc::new(config);
        let events = EventBus::new(config.event_capacity);
        let clock = Arc::clone(identity.clock());

        let encryptor = Encryptor::new(Arc::clone(&config), events.clone());
        let gate = DecryptionGate::new(Arc::clone(&config), events.clone(), clock);
        let playback = PlaybackManager::new(
            gate.clone(),
            identity.clone(),
            Arc::clone(&network),
            events.clone(),
            Arc::clone(&config),
        );

        Ok(Self {
            config,
            network,
            identity,
            events,
            encryptor,
            gate,
            playback,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn identity(&self) -> &IdentityProvider {
        &self.identity
    }

    pub fn gate(&self) -> &DecryptionGate {
        &self.gate
    }

    pub fn playback(&self) -> &PlaybackManager {
        &self.playback
    }

    /// Subscribe to progress events.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Upload
    // ─────────────────────────────────────────────────────────────────────────

    /// Encrypt `plaintext` under `condition`.
    pub async fn encrypt(&self, plaintext: &[u8], condition: &Condition) -> Result<EncryptedAsset> {
        self.encryptor
            .encrypt(plaintext, condition, self.network.as_ref())
            .await
    }

    /// Encrypt and hand the asset to `store`.
    ///
    /// The caller owns persisting the returned identifier alongside the
    /// condition; the engine keeps no copy of either.
    pub async fn publish(
        &self,
        plaintext: &[u8],
        condition: &Condition,
        store: &dyn ContentStore,
    ) -> Result<ContentId> {
        let asset = self.encrypt(plaintext, condition).await?;
        let bytes = Bytes::from(asset.to_bytes());
        let size = bytes.len();

        let cid = store.put(bytes).await.map_err(|e| {
            let err = Error::Store(e);
            self.events.emit(EngineEvent::Failed {
                category: err.category(),
            });
            err
        })?;

        info!(%cid, bytes = size, "asset published");
        self.events.emit(EngineEvent::Uploaded { cid: cid.clone() });
        Ok(cid)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Access
    // ─────────────────────────────────────────────────────────────────────────

    /// Assert identity and decrypt `asset`, waiting for the result.
    pub async fn decrypt(&self, asset: &EncryptedAsset) -> Result<Zeroizing<Vec<u8>>> {
        self.gate
            .run_attempt(asset, &self.identity, self.network.as_ref(), &|_: AttemptState| {})
            .await
    }

    /// Start a cancellable decrypt on a background task.
    pub fn begin_decrypt(&self, asset: EncryptedAsset) -> DecryptAttempt {
        self.gate
            .begin(asset, self.identity.clone(), Arc::clone(&self.network))
    }

    /// See [`PlaybackManager::activate`].
    pub fn activate(
        &self,
        track: TrackId,
        resolver: Arc<dyn AssetResolver>,
    ) -> Result<PlaybackSession> {
        self.playback.activate(track, resolver)
    }

    /// See [`PlaybackManager::teardown`].
    pub fn teardown(&self, session: &PlaybackSession) {
        self.playback.teardown(session)
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("domain", &self.config.domain)
            .field("ritual", &self.config.ritual_id)
            .field("identity_attached", &self.identity.is_attached())
            .finish()
    }
}
