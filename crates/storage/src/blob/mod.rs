//! Immutable content-addressed blob storage (spec.md §5)

mod file;
mod memory;
mod redb_store;
mod remote;

pub use file::FileBlobStore;
pub use memory::MemoryBlobStore;
pub use redb_store::RedbBlobStore;
pub use remote::RemoteBlobStore;

use async_trait::async_trait;
use glyph_core::error::{Error, Result};
use glyph_core::fingerprint::Fingerprint;
use glyph_core::json::Json;
use glyph_normalize::FragmentSource;
use std::sync::Arc;
use tracing::warn;

/// Stores immutable JSON blobs addressed by their [`Fingerprint`].
///
/// A `put` for a fingerprint that already exists is a no-op: the
/// fingerprint is the content hash, so there is nothing to reconcile
/// (spec.md §5, invariant "puts are idempotent").
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Whether a blob with this fingerprint is present.
    async fn has(&self, fingerprint: &Fingerprint) -> Result<bool>;

    /// Fetches a single blob.
    async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<Json>>;

    /// Fetches several blobs, preserving the order of `fingerprints`.
    /// The default implementation calls [`BlobStore::get`] in a loop;
    /// backends that can batch a round trip should override it.
    async fn get_many(&self, fingerprints: &[Fingerprint]) -> Result<Vec<Option<Json>>> {
        let mut out = Vec::with_capacity(fingerprints.len());
        for fp in fingerprints {
            out.push(self.get(fp).await?);
        }
        Ok(out)
    }

    /// Stores a blob. Idempotent: storing the same fingerprint twice
    /// (necessarily with equal content) is a no-op.
    async fn put(&self, fingerprint: Fingerprint, value: Json) -> Result<()>;

    /// Stores several blobs. The default implementation calls
    /// [`BlobStore::put`] in a loop.
    async fn put_many(&self, entries: Vec<(Fingerprint, Json)>) -> Result<()> {
        for (fp, value) in entries {
            self.put(fp, value).await?;
        }
        Ok(())
    }

    /// Removes a blob, if present. Returns whether it was present.
    ///
    /// Deleting a fragment that another object's manifest still
    /// references is permitted — the store has no knowledge of
    /// manifests, only blobs (spec.md §5 Non-goals: no reference
    /// counting or cascading delete).
    async fn delete(&self, fingerprint: &Fingerprint) -> Result<bool>;
}

#[async_trait]
impl<T: BlobStore + ?Sized> FragmentSource for T {
    async fn fetch_many(&self, fingerprints: &[Fingerprint]) -> Result<Vec<Option<Json>>> {
        self.get_many(fingerprints).await
    }
}

/// A read-fallback, write-fanout composite over several [`BlobStore`]s.
///
/// `get`/`has` probe the underlying stores in order and return on the
/// first hit. `put`/`delete` fan out to every store. If two stores
/// disagree on the content for the same fingerprint — which should be
/// structurally impossible, since the fingerprint *is* the content hash
/// — `get` reports [`Error::Corruption`] rather than silently picking
/// one.
pub struct MultiBlobStore {
    stores: Vec<Arc<dyn BlobStore>>,
}

impl MultiBlobStore {
    /// Builds a composite over `stores`, probed/fanned-out in order.
    pub fn new(stores: Vec<Arc<dyn BlobStore>>) -> Self {
        Self { stores }
    }
}

#[async_trait]
impl BlobStore for MultiBlobStore {
    async fn has(&self, fingerprint: &Fingerprint) -> Result<bool> {
        for store in &self.stores {
            if store.has(fingerprint).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<Json>> {
        let mut found: Option<Json> = None;
        for store in &self.stores {
            if let Some(candidate) = store.get(fingerprint).await? {
                match &found {
                    Some(existing) if existing != &candidate => {
                        warn!(
                            target: "glyphdb::storage",
                            fingerprint = %fingerprint,
                            "divergent blob content across tiers for the same fingerprint"
                        );
                        return Err(Error::corruption(
                            *fingerprint,
                            "divergent content across blob stores",
                        ));
                    }
                    _ => found = Some(candidate),
                }
            }
        }
        Ok(found)
    }

    async fn put(&self, fingerprint: Fingerprint, value: Json) -> Result<()> {
        for store in &self.stores {
            store.put(fingerprint, value.clone()).await?;
        }
        Ok(())
    }

    async fn delete(&self, fingerprint: &Fingerprint) -> Result<bool> {
        let mut deleted_anywhere = false;
        for store in &self.stores {
            if store.delete(fingerprint).await? {
                deleted_anywhere = true;
            }
        }
        Ok(deleted_anywhere)
    }
}
