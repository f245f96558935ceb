//! In-process, lock-free blob store backed by [`dashmap`]

use super::BlobStore;
use async_trait::async_trait;
use dashmap::DashMap;
use glyph_core::error::Result;
use glyph_core::fingerprint::Fingerprint;
use glyph_core::json::Json;

/// A [`BlobStore`] held entirely in memory. Never persists; useful for
/// tests and for a process-local cache layered in front of a slower
/// backend via [`super::MultiBlobStore`].
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: DashMap<Fingerprint, Json>,
}

impl MemoryBlobStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            blobs: DashMap::new(),
        }
    }

    /// Number of blobs currently stored.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Whether the store holds no blobs.
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn has(&self, fingerprint: &Fingerprint) -> Result<bool> {
        Ok(self.blobs.contains_key(fingerprint))
    }

    async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<Json>> {
        Ok(self.blobs.get(fingerprint).map(|entry| entry.value().clone()))
    }

    async fn put(&self, fingerprint: Fingerprint, value: Json) -> Result<()> {
        self.blobs.entry(fingerprint).or_insert(value);
        Ok(())
    }

    async fn delete(&self, fingerprint: &Fingerprint) -> Result<bool> {
        Ok(self.blobs.remove(fingerprint).is_some())
    }
}
