//! In-process, lock-free ref store backed by [`dashmap`]

use super::{Change, RefStore, Subscription, SubscriptionPattern, SubscriptionId, SubscriptionRegistry};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use glyph_core::contract::{Name, Namespace};
use glyph_core::error::Result;
use glyph_core::fingerprint::Fingerprint;
use tracing::debug;

type Key = (Name, Option<Namespace>);

/// A [`RefStore`] held entirely in memory. Never persists; subscribers
/// only ever see changes from this one instance.
#[derive(Default)]
pub struct MemoryRefStore {
    cells: DashMap<Key, Fingerprint>,
    registry: SubscriptionRegistry,
}

impl MemoryRefStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn key(name: &Name, namespace: Option<&Namespace>) -> Key {
        (name.clone(), namespace.cloned())
    }
}

#[async_trait]
impl RefStore for MemoryRefStore {
    async fn get(&self, name: &Name, namespace: Option<&Namespace>) -> Result<Option<Fingerprint>> {
        Ok(self.cells.get(&Self::key(name, namespace)).map(|entry| *entry.value()))
    }

    async fn new_ref(
        &self,
        name: &Name,
        namespace: Option<&Namespace>,
        fingerprint: Fingerprint,
    ) -> Result<bool> {
        let key = Self::key(name, namespace);
        let created = match self.cells.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(fingerprint);
                true
            }
        };
        if created {
            debug!(target: "glyphdb::refs", name = %name, fingerprint = %fingerprint, "reference cell created");
            self.registry.publish(Change {
                name: name.clone(),
                namespace: namespace.cloned(),
                old: None,
                new: Some(fingerprint),
            });
        }
        Ok(created)
    }

    async fn update(
        &self,
        name: &Name,
        namespace: Option<&Namespace>,
        expected: Fingerprint,
        desired: Fingerprint,
    ) -> Result<bool> {
        let key = Self::key(name, namespace);
        let applied = match self.cells.get_mut(&key) {
            Some(mut current) if *current == expected => {
                *current = desired;
                true
            }
            _ => false,
        };
        if applied {
            self.registry.publish(Change {
                name: name.clone(),
                namespace: namespace.cloned(),
                old: Some(expected),
                new: Some(desired),
            });
        }
        Ok(applied)
    }

    async fn delete(&self, name: &Name, namespace: Option<&Namespace>) -> Result<bool> {
        let key = Self::key(name, namespace);
        match self.cells.remove(&key) {
            Some((_, fingerprint)) => {
                self.registry.publish(Change {
                    name: name.clone(),
                    namespace: namespace.cloned(),
                    old: Some(fingerprint),
                    new: None,
                });
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn subscribe(&self, pattern: SubscriptionPattern) -> Subscription {
        self.registry.subscribe(pattern)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.registry.unsubscribe(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glyph_core::json::Json;

    fn name(s: &str) -> Name {
        Name::new(s).unwrap()
    }

    fn fp(n: i64) -> Fingerprint {
        Fingerprint::of(&Json::from(n))
    }

    #[tokio::test]
    async fn new_ref_then_get_round_trips() {
        let store = MemoryRefStore::new();
        assert!(store.new_ref(&name("cfg"), None, fp(1)).await.unwrap());
        assert_eq!(store.get(&name("cfg"), None).await.unwrap(), Some(fp(1)));
    }

    #[tokio::test]
    async fn new_ref_fails_if_already_present() {
        let store = MemoryRefStore::new();
        assert!(store.new_ref(&name("cfg"), None, fp(1)).await.unwrap());
        assert!(!store.new_ref(&name("cfg"), None, fp(2)).await.unwrap());
        assert_eq!(store.get(&name("cfg"), None).await.unwrap(), Some(fp(1)));
    }

    #[tokio::test]
    async fn update_succeeds_only_when_expected_matches() {
        let store = MemoryRefStore::new();
        store.new_ref(&name("cfg"), None, fp(1)).await.unwrap();

        assert!(!store.update(&name("cfg"), None, fp(99), fp(2)).await.unwrap());
        assert_eq!(store.get(&name("cfg"), None).await.unwrap(), Some(fp(1)));

        assert!(store.update(&name("cfg"), None, fp(1), fp(2)).await.unwrap());
        assert_eq!(store.get(&name("cfg"), None).await.unwrap(), Some(fp(2)));
    }

    #[tokio::test]
    async fn delete_does_not_cascade_and_reports_prior_presence() {
        let store = MemoryRefStore::new();
        assert!(!store.delete(&name("cfg"), None).await.unwrap());
        store.new_ref(&name("cfg"), None, fp(1)).await.unwrap();
        assert!(store.delete(&name("cfg"), None).await.unwrap());
        assert_eq!(store.get(&name("cfg"), None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn subscriber_observes_full_lifecycle() {
        let store = MemoryRefStore::new();
        let mut sub = store.subscribe(SubscriptionPattern::exact(name("cfg"), None));

        store.new_ref(&name("cfg"), None, fp(1)).await.unwrap();
        let created = sub.recv().await.unwrap();
        assert_eq!(created.old, None);
        assert_eq!(created.new, Some(fp(1)));

        store.update(&name("cfg"), None, fp(1), fp(2)).await.unwrap();
        let updated = sub.recv().await.unwrap();
        assert_eq!(updated.old, Some(fp(1)));
        assert_eq!(updated.new, Some(fp(2)));

        store.delete(&name("cfg"), None).await.unwrap();
        let deleted = sub.recv().await.unwrap();
        assert_eq!(deleted.old, Some(fp(2)));
        assert_eq!(deleted.new, None);
    }

    #[tokio::test]
    async fn namespaces_are_isolated() {
        let store = MemoryRefStore::new();
        let ns = Namespace::new("app").unwrap();
        store.new_ref(&name("cfg"), None, fp(1)).await.unwrap();
        store.new_ref(&name("cfg"), Some(&ns), fp(2)).await.unwrap();
        assert_eq!(store.get(&name("cfg"), None).await.unwrap(), Some(fp(1)));
        assert_eq!(store.get(&name("cfg"), Some(&ns)).await.unwrap(), Some(fp(2)));
    }
}
