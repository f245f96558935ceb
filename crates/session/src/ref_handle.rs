//! Mutable handle over a single reference cell (spec.md §4.6)

use crate::value_store::ValueStore;
use glyph_codec::Value;
use glyph_core::contract::{Name, Namespace};
use glyph_core::error::{Error, Result};
use glyph_core::fingerprint::Fingerprint;
use glyph_storage::{RefStore, Subscription, SubscriptionId, SubscriptionPattern};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::warn;

/// Options governing a single [`Ref`]'s behavior, independent of the
/// owning [`crate::Session`]'s defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct RefOptions {
    /// Whether a background subscription keeps [`Ref::read`] fresh
    /// without an explicit [`Ref::pull`].
    pub auto_pull: bool,
}

struct RefInner {
    fingerprint: Fingerprint,
    value: Value,
}

/// A live binding to one `(name, namespace)` reference cell: a cached
/// fingerprint and decoded value, updatable under optimistic
/// concurrency control.
///
/// State machine: `Unbound → Bound(F)` at construction (via
/// [`crate::Session::new_ref`]/[`crate::Session::get_ref`]), `Bound(F) →
/// Bound(F')` via a successful [`Ref::set`]/[`Ref::update`]/[`Ref::pull`],
/// `Bound(F) → Closed` via [`Ref::close`]. An OCC failure never
/// transitions the state (spec.md §4.6).
///
/// Not thread-safe by itself — sharing a `Ref` across tasks requires
/// external synchronization (spec.md §5).
pub struct Ref {
    name: Name,
    namespace: Option<Namespace>,
    value_store: Arc<ValueStore>,
    ref_store: Arc<dyn RefStore>,
    inner: Arc<RwLock<RefInner>>,
    subscription_id: Option<SubscriptionId>,
    background: Option<JoinHandle<()>>,
}

impl Ref {
    pub(crate) async fn bind(
        name: Name,
        namespace: Option<Namespace>,
        fingerprint: Fingerprint,
        value_store: Arc<ValueStore>,
        ref_store: Arc<dyn RefStore>,
        options: RefOptions,
    ) -> Result<Self> {
        let value = value_store.get(&fingerprint).await?;
        let inner = Arc::new(RwLock::new(RefInner { fingerprint, value }));

        let (subscription_id, background) = if options.auto_pull {
            let pattern = SubscriptionPattern::exact(name.clone(), namespace.clone());
            let subscription = ref_store.subscribe(pattern);
            let id = subscription.id();
            let handle = spawn_auto_pull(subscription, Arc::clone(&inner), Arc::clone(&value_store));
            (Some(id), Some(handle))
        } else {
            (None, None)
        };

        Ok(Self {
            name,
            namespace,
            value_store,
            ref_store,
            inner,
            subscription_id,
            background,
        })
    }

    /// This cell's name.
    pub fn name(&self) -> &Name {
        &self.name
    }

    /// This cell's namespace, if any.
    pub fn namespace(&self) -> Option<&Namespace> {
        self.namespace.as_ref()
    }

    /// Returns the cached value. With `auto_pull` enabled this reflects
    /// the latest change delivered by the background subscription;
    /// otherwise it is only as fresh as the last [`Ref::pull`],
    /// [`Ref::set`], or [`Ref::update`].
    pub async fn read(&self) -> Value {
        self.inner.read().await.value.clone()
    }

    /// The fingerprint this handle currently believes is current.
    pub async fn fingerprint(&self) -> Fingerprint {
        self.inner.read().await.fingerprint
    }

    /// Re-reads the backing RefStore and, if the fingerprint changed,
    /// fetches and caches the new value.
    pub async fn pull(&self) -> Result<()> {
        let current = self
            .ref_store
            .get(&self.name, self.namespace.as_ref())
            .await?
            .ok_or_else(|| not_found(&self.name, self.namespace.as_ref()))?;

        let mut guard = self.inner.write().await;
        if guard.fingerprint != current {
            let value = self.value_store.get(&current).await?;
            guard.fingerprint = current;
            guard.value = value;
        }
        Ok(())
    }

    /// Persists `new_value` and attempts to advance the cell from the
    /// currently cached fingerprint to the new one. On OCC failure,
    /// returns [`Error::OccConflict`] without mutating local state —
    /// the caller may [`Ref::pull`] and retry.
    pub async fn set(&self, new_value: Value) -> Result<()> {
        let (new_fingerprint, _) = self.value_store.put(&new_value).await?;
        let expected = self.inner.read().await.fingerprint;

        let applied = self
            .ref_store
            .update(&self.name, self.namespace.as_ref(), expected, new_fingerprint)
            .await?;

        if !applied {
            let found = self
                .ref_store
                .get(&self.name, self.namespace.as_ref())
                .await?
                .unwrap_or(expected);
            warn!(
                target: "glyphdb::session",
                name = %self.name,
                expected = %expected,
                found = %found,
                "optimistic concurrency conflict on set"
            );
            return Err(Error::OccConflict {
                name: self.name.to_string(),
                namespace: self.namespace.as_ref().map(|n| n.to_string()),
                expected: expected.to_hex(),
                found: found.to_hex(),
            });
        }

        let mut guard = self.inner.write().await;
        guard.fingerprint = new_fingerprint;
        guard.value = new_value;
        Ok(())
    }

    /// Functionally `set(f(read()))`: the same OCC semantics as
    /// [`Ref::set`], applied to the result of `f` over the currently
    /// cached value.
    pub async fn update(&self, f: impl FnOnce(&Value) -> Value) -> Result<()> {
        let current = self.read().await;
        let next = f(&current);
        self.set(next).await
    }

    /// Unsubscribes and releases the background auto-pull task, if any.
    pub async fn close(&mut self) {
        if let Some(handle) = self.background.take() {
            handle.abort();
        }
        if let Some(id) = self.subscription_id.take() {
            self.ref_store.unsubscribe(id);
        }
    }
}

fn not_found(name: &Name, namespace: Option<&Namespace>) -> Error {
    Error::NotFound(name.to_string(), namespace.map(|n| n.to_string()))
}

fn spawn_auto_pull(
    mut subscription: Subscription,
    inner: Arc<RwLock<RefInner>>,
    value_store: Arc<ValueStore>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(change) = subscription.recv().await {
            let Some(new_fingerprint) = change.new else {
                continue;
            };
            let Ok(value) = value_store.get(&new_fingerprint).await else {
                continue;
            };
            let mut guard = inner.write().await;
            guard.fingerprint = new_fingerprint;
            guard.value = value;
        }
    })
}

impl Drop for Ref {
    fn drop(&mut self) {
        if let Some(handle) = self.background.take() {
            handle.abort();
        }
        if let Some(id) = self.subscription_id.take() {
            self.ref_store.unsubscribe(id);
        }
    }
}
