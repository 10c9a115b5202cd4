//! The content-addressed store seam.
//!
//! The engine hands encrypted bytes to a [`ContentStore`] and gets back an
//! identifier; transport, chunking and pinning belong to the store. A
//! [`StoreResolver`] closes the loop for playback by mapping track ids to
//! content ids and loading assets on demand.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use tracing::debug;

use keygate_seal::EncryptedAsset;

use crate::error::{Error, Result};
use crate::playback::{AssetResolver, TrackId};

/// Identifier of a stored blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentId(String);

impl ContentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Content-derived identifier: `b3` followed by the BLAKE3 hex digest.
    pub fn for_bytes(bytes: &[u8]) -> Self {
        Self(format!("b3{}", blake3::hash(bytes).to_hex()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// External content-addressed storage.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store bytes and return their identifier.
    async fn put(&self, bytes: Bytes) -> anyhow::Result<ContentId>;

    /// Load bytes by identifier, or `None` if unknown.
    async fn get(&self, cid: &ContentId) -> anyhow::Result<Option<Bytes>>;
}

/// In-memory [`ContentStore`] keyed by content hash.
#[derive(Default)]
pub struct MemoryContentStore {
    blobs: RwLock<HashMap<ContentId, Bytes>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }

    /// Overwrite a stored blob in place.
    pub fn replace(&self, cid: &ContentId, bytes: Bytes) {
        self.blobs.write().insert(cid.clone(), bytes);
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn put(&self, bytes: Bytes) -> anyhow::Result<ContentId> {
        let cid = ContentId::for_bytes(&bytes);
        self.blobs.write().insert(cid.clone(), bytes);
        Ok(cid)
    }

    async fn get(&self, cid: &ContentId) -> anyhow::Result<Option<Bytes>> {
        Ok(self.blobs.read().get(cid).cloned())
    }
}

/// Resolves tracks to assets held in a [`ContentStore`].
pub struct StoreResolver {
    store: Arc<dyn ContentStore>,
    tracks: RwLock<HashMap<TrackId, ContentId>>,
}

impl StoreResolver {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self {
            store,
            tracks: RwLock::new(HashMap::new()),
        }
    }

    /// Map a track to the content holding its encrypted asset.
    pub fn register(&self, track: TrackId, cid: ContentId) {
        self.tracks.write().insert(track, cid);
    }

    pub fn content_id(&self, track: &TrackId) -> Option<ContentId> {
        self.tracks.read().get(track).cloned()
    }
}

#[async_trait]
impl AssetResolver for StoreResolver {
    async fn resolve(&self, track: &TrackId) -> Result<EncryptedAsset> {
        let cid = self
            .content_id(track)
            .ok_or_else(|| Error::ContentNotFound(format!("track {track}")))?;

        let bytes = self
            .store
            .get(&cid)
            .await
            .map_err(Error::Store)?
            .ok_or_else(|| Error::content_not_found(&cid))?;

        debug!(%track, %cid, bytes = bytes.len(), "asset loaded");
        Ok(EncryptedAsset::from_bytes(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_is_content_addressed() {
        let store = MemoryContentStore::new();
        let a = store.put(Bytes::from_static(b"one")).await.unwrap();
        let b = store.put(Bytes::from_static(b"one")).await.unwrap();
        let c = store.put(Bytes::from_static(b"two")).await.unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(store.len(), 2);
        assert!(a.as_str().starts_with("b3"));
        assert_eq!(store.get(&a).await.unwrap().unwrap(), Bytes::from_static(b"one"));
    }

    #[tokio::test]
    async fn test_missing_content() {
        let store = MemoryContentStore::new();
        assert!(store.get(&ContentId::new("nope")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resolver_unknown_track() {
        let resolver = StoreResolver::new(Arc::new(MemoryContentStore::new()));
        let err = resolver.resolve(&TrackId::new("missing")).await.unwrap_err();
        assert!(matches!(err, Error::ContentNotFound(_)));
    }

    #[tokio::test]
    async fn test_resolver_reports_corrupt_bytes() {
        let store = Arc::new(MemoryContentStore::new());
        let cid = store.put(Bytes::from_static(b"not an asset")).await.unwrap();

        let resolver = StoreResolver::new(store);
        resolver.register(TrackId::new("t"), cid);

        let err = resolver.resolve(&TrackId::new("t")).await.unwrap_err();
        assert_eq!(err.category(), crate::error::ErrorCategory::CorruptData);
    }
}
