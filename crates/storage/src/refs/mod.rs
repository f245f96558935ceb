//! Mutable named references under optimistic concurrency control
//! (spec.md §4.2, §6)

mod file;
mod memory;
mod redb_store;
mod remote;

pub use file::FileRefStore;
pub use memory::MemoryRefStore;
pub use redb_store::RedbRefStore;
pub use remote::RemoteRefStore;

use async_trait::async_trait;
use glyph_core::contract::{Name, Namespace};
use glyph_core::error::Result;
use glyph_core::fingerprint::Fingerprint;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

/// A (name, namespace) pair's fingerprint transition, delivered to
/// every subscriber whose pattern matches.
///
/// `old` is absent for the transition created by `new_ref`; `new` is
/// absent for the transition caused by `delete` (spec.md §4.2, the
/// subscription-delivery property).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    /// The reference cell's name.
    pub name: Name,
    /// The reference cell's namespace, if any.
    pub namespace: Option<Namespace>,
    /// The fingerprint before this change, absent if the cell was just created.
    pub old: Option<Fingerprint>,
    /// The fingerprint after this change, absent if the cell was just deleted.
    pub new: Option<Fingerprint>,
}

/// Which names a subscription matches: a specific [`Name`], or every name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamePattern {
    /// Matches only this name.
    Exact(Name),
    /// Matches every name (the `*` wildcard in spec.md §4.2's
    /// `subscribe(name | *, ...)`).
    Any,
}

/// Which namespaces a subscription matches: a specific (possibly
/// absent) [`Namespace`], or every namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespacePattern {
    /// Matches only this exact namespace (which may itself be `None`,
    /// i.e. "the cell with no namespace").
    Exact(Option<Namespace>),
    /// Matches every namespace, including the absence of one.
    Any,
}

/// A subscription's filter over `(name, namespace)` pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionPattern {
    /// Name filter.
    pub name: NamePattern,
    /// Namespace filter.
    pub namespace: NamespacePattern,
}

impl SubscriptionPattern {
    /// Matches exactly this (name, namespace) pair.
    pub fn exact(name: Name, namespace: Option<Namespace>) -> Self {
        Self {
            name: NamePattern::Exact(name),
            namespace: NamespacePattern::Exact(namespace),
        }
    }

    /// Matches every change the store publishes.
    pub fn any() -> Self {
        Self {
            name: NamePattern::Any,
            namespace: NamespacePattern::Any,
        }
    }

    fn matches(&self, name: &Name, namespace: Option<&Namespace>) -> bool {
        let name_ok = match &self.name {
            NamePattern::Exact(n) => n == name,
            NamePattern::Any => true,
        };
        let namespace_ok = match &self.namespace {
            NamespacePattern::Exact(ns) => ns.as_ref() == namespace,
            NamespacePattern::Any => true,
        };
        name_ok && namespace_ok
    }
}

/// Opaque handle identifying a live subscription, returned by
/// [`RefStore::subscribe`] and consumed by [`RefStore::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A live subscription: an id to unsubscribe with, and a channel of
/// matching [`Change`]s.
///
/// Callbacks in spec.md §4.2 are modeled here as an async channel
/// rather than an invoked closure, so that a callback "running to
/// completion before the next for that key" falls out of ordinary
/// `mpsc` FIFO delivery instead of needing bespoke sequencing.
pub struct Subscription {
    id: SubscriptionId,
    receiver: mpsc::UnboundedReceiver<Change>,
}

impl Subscription {
    /// This subscription's id, for [`RefStore::unsubscribe`].
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Awaits the next matching change. Returns `None` once the store
    /// itself (not just this subscription) is dropped.
    pub async fn recv(&mut self) -> Option<Change> {
        self.receiver.recv().await
    }
}

/// Shared subscription bookkeeping every in-process [`RefStore`]
/// adapter embeds: dispatch is local-only here. [`RedbRefStore`]
/// layers a broadcast bridge on top for same-host cross-instance
/// delivery; [`RemoteRefStore`] replaces this with Postgres
/// `LISTEN`/`NOTIFY` (see each adapter's module docs).
#[derive(Default)]
pub struct SubscriptionRegistry {
    next_id: AtomicU64,
    subscribers: dashmap::DashMap<SubscriptionId, (SubscriptionPattern, mpsc::UnboundedSender<Change>)>,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscription matching `pattern`.
    pub fn subscribe(&self, pattern: SubscriptionPattern) -> Subscription {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.insert(id, (pattern, tx));
        Subscription { id, receiver: rx }
    }

    /// Removes a subscription. Returns whether it was present.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.remove(&id).is_some()
    }

    /// Delivers `change` to every currently-matching subscriber.
    /// Subscribers whose receiver has been dropped are pruned.
    pub fn publish(&self, change: Change) {
        let mut dead = Vec::new();
        for entry in self.subscribers.iter() {
            let (id, (pattern, sender)) = (*entry.key(), entry.value());
            if pattern.matches(&change.name, change.namespace.as_ref())
                && sender.send(change.clone()).is_err()
            {
                dead.push(id);
            }
        }
        for id in dead {
            self.subscribers.remove(&id);
        }
    }
}

/// Stores mutable `(name, namespace) → fingerprint` reference cells
/// under optimistic concurrency control, with change notification.
///
/// `new_ref` is the Rust rendering of spec.md §4.2's `new` — `new` is
/// not a reserved word but reads as a constructor here, which this is
/// not.
#[async_trait]
pub trait RefStore: Send + Sync {
    /// Current fingerprint for `(name, namespace)`, if the cell exists.
    async fn get(&self, name: &Name, namespace: Option<&Namespace>) -> Result<Option<Fingerprint>>;

    /// Creates a cell. Returns `true` if it did not already exist (and
    /// is now `Present(fingerprint)`); `false` if it already existed
    /// (no side effect).
    async fn new_ref(
        &self,
        name: &Name,
        namespace: Option<&Namespace>,
        fingerprint: Fingerprint,
    ) -> Result<bool>;

    /// Compare-and-set: if the cell currently holds `expected`, sets it
    /// to `desired` and returns `true`. Otherwise returns `false`
    /// without side effect — an OCC failure, not an error (spec.md §7.3).
    async fn update(
        &self,
        name: &Name,
        namespace: Option<&Namespace>,
        expected: Fingerprint,
        desired: Fingerprint,
    ) -> Result<bool>;

    /// Removes a cell. Returns whether it existed. Does not cascade to
    /// the blob its fingerprint pointed at (spec.md §8 scenario 6).
    async fn delete(&self, name: &Name, namespace: Option<&Namespace>) -> Result<bool>;

    /// Subscribes to every `new_ref`/`update`/`delete` matching `pattern`.
    fn subscribe(&self, pattern: SubscriptionPattern) -> Subscription;

    /// Cancels a subscription. Returns whether it was live.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}
