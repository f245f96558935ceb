//! Binds one [`ValueStore`] and one [`RefStore`] into a `Ref`-handle
//! factory (spec.md §4.6)

use crate::ref_handle::{Ref, RefOptions};
use crate::value_store::ValueStore;
use glyph_codec::Value;
use glyph_core::contract::{Name, Namespace};
use glyph_core::error::{Error, Result};
use glyph_storage::{BlobStore, MultiBlobStore, RefStore};
use std::sync::Arc;

/// Session-wide defaults applied to every `Ref` it creates, unless a
/// call site overrides them (spec.md §6's Ref create options).
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOptions {
    /// Default `auto_pull` for refs created without an explicit
    /// [`RefOptions`] override.
    pub auto_pull: bool,
}

/// Binds one [`ValueStore`] (backed by an ordered list of
/// [`BlobStore`]s, composed via [`MultiBlobStore`] when there is more
/// than one) and one [`RefStore`]. Factory methods here create
/// [`Ref`] handles.
pub struct Session {
    value_store: Arc<ValueStore>,
    ref_store: Arc<dyn RefStore>,
    options: SessionOptions,
}

impl Session {
    /// Builds a session over `blob_stores` (probed/fanned-out in the
    /// given order) and `ref_store`.
    pub fn new(mut blob_stores: Vec<Arc<dyn BlobStore>>, ref_store: Arc<dyn RefStore>, options: SessionOptions) -> Self {
        let blobs: Arc<dyn BlobStore> = if blob_stores.len() == 1 {
            blob_stores.pop().expect("length checked above")
        } else {
            Arc::new(MultiBlobStore::new(blob_stores))
        };
        Self {
            value_store: Arc::new(ValueStore::new(blobs)),
            ref_store,
            options,
        }
    }

    /// Creates a new reference cell with `initial_value` and binds a
    /// [`Ref`] to it. Fails with [`Error::Precondition`] if the cell
    /// already exists.
    pub async fn new_ref(&self, name: Name, namespace: Option<Namespace>, initial_value: Value) -> Result<Ref> {
        let (fingerprint, _) = self.value_store.put(&initial_value).await?;
        let created = self
            .ref_store
            .new_ref(&name, namespace.as_ref(), fingerprint)
            .await?;
        if !created {
            return Err(Error::Precondition(format!(
                "reference cell ({name}, {namespace:?}) already exists"
            )));
        }
        self.bind(name, namespace, fingerprint).await
    }

    /// Binds a [`Ref`] to an existing reference cell. Fails with
    /// [`Error::NotFound`] if it does not exist.
    pub async fn get_ref(&self, name: Name, namespace: Option<Namespace>) -> Result<Ref> {
        let fingerprint = self
            .ref_store
            .get(&name, namespace.as_ref())
            .await?
            .ok_or_else(|| Error::NotFound(name.to_string(), namespace.as_ref().map(|n| n.to_string())))?;
        self.bind(name, namespace, fingerprint).await
    }

    /// Gets the existing cell, or creates it with `default_value` if
    /// absent. Not atomic against concurrent creators: if two callers
    /// race, one wins the creation and the other transparently falls
    /// back to reading what the winner wrote (spec.md §4.6).
    pub async fn get_or_new_ref(
        &self,
        name: Name,
        namespace: Option<Namespace>,
        default_value: Value,
    ) -> Result<Ref> {
        let (fingerprint, _) = self.value_store.put(&default_value).await?;
        let created = self
            .ref_store
            .new_ref(&name, namespace.as_ref(), fingerprint)
            .await?;

        let bound_fingerprint = if created {
            fingerprint
        } else {
            self.ref_store
                .get(&name, namespace.as_ref())
                .await?
                .ok_or_else(|| Error::NotFound(name.to_string(), namespace.as_ref().map(|n| n.to_string())))?
        };
        self.bind(name, namespace, bound_fingerprint).await
    }

    /// Deletes a reference cell. Returns whether it existed. Never
    /// cascades to the blobs its fingerprint pointed at.
    pub async fn delete_ref(&self, name: &Name, namespace: Option<&Namespace>) -> Result<bool> {
        self.ref_store.delete(name, namespace).await
    }

    async fn bind(
        &self,
        name: Name,
        namespace: Option<Namespace>,
        fingerprint: glyph_core::fingerprint::Fingerprint,
    ) -> Result<Ref> {
        Ref::bind(
            name,
            namespace,
            fingerprint,
            Arc::clone(&self.value_store),
            Arc::clone(&self.ref_store),
            RefOptions {
                auto_pull: self.options.auto_pull,
            },
        )
        .await
    }
}
