//! Embedded ref store backed by `redb`
//!
//! `redb` gives durable CAS via its single-writer transactions; it has
//! no native pub/sub, so the usual in-process [`SubscriptionRegistry`]
//! fans every successful write out to this instance's subscribers. A
//! second process opening the same database file is not observed —
//! that requires the remote (Postgres `LISTEN`/`NOTIFY`) adapter
//! instead.

use super::{Change, RefStore, Subscription, SubscriptionId, SubscriptionPattern, SubscriptionRegistry};
use async_trait::async_trait;
use glyph_core::contract::{Name, Namespace, SEPARATOR};
use glyph_core::error::{Error, Result};
use glyph_core::fingerprint::Fingerprint;
use redb::{Database, ReadableTable, TableDefinition};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

const REFS_TABLE: TableDefinition<&str, &str> = TableDefinition::new("refs");

fn backend(e: impl std::fmt::Display) -> Error {
    Error::BackendFailure(e.to_string())
}

fn cell_key(name: &Name, namespace: Option<&Namespace>) -> String {
    match namespace {
        Some(ns) => format!("{ns}{SEPARATOR}{name}"),
        None => name.to_string(),
    }
}

/// A [`RefStore`] persisted in an embedded `redb` database file.
pub struct RedbRefStore {
    db: Arc<Database>,
    registry: SubscriptionRegistry,
}

impl RedbRefStore {
    /// Opens (creating if absent) the database at `path` and ensures
    /// the refs table exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::create(path).map_err(backend)?;
        let write_txn = db.begin_write().map_err(backend)?;
        write_txn.open_table(REFS_TABLE).map_err(backend)?;
        write_txn.commit().map_err(backend)?;
        Ok(Self {
            db: Arc::new(db),
            registry: SubscriptionRegistry::new(),
        })
    }
}

#[async_trait]
impl RefStore for RedbRefStore {
    async fn get(&self, name: &Name, namespace: Option<&Namespace>) -> Result<Option<Fingerprint>> {
        let read_txn = self.db.begin_read().map_err(backend)?;
        let table = read_txn.open_table(REFS_TABLE).map_err(backend)?;
        match table.get(cell_key(name, namespace).as_str()).map_err(backend)? {
            Some(guard) => Ok(Some(Fingerprint::from_str(guard.value()).map_err(|e| {
                Error::corruption_untagged(format!("malformed stored fingerprint: {e}"))
            })?)),
            None => Ok(None),
        }
    }

    async fn new_ref(
        &self,
        name: &Name,
        namespace: Option<&Namespace>,
        fingerprint: Fingerprint,
    ) -> Result<bool> {
        let key = cell_key(name, namespace);
        let write_txn = self.db.begin_write().map_err(backend)?;
        let created = {
            let mut table = write_txn.open_table(REFS_TABLE).map_err(backend)?;
            if table.get(key.as_str()).map_err(backend)?.is_some() {
                false
            } else {
                table.insert(key.as_str(), fingerprint.to_hex().as_str()).map_err(backend)?;
                true
            }
        };
        write_txn.commit().map_err(backend)?;
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
        let key = cell_key(name, namespace);
        let write_txn = self.db.begin_write().map_err(backend)?;
        let applied = {
            let mut table = write_txn.open_table(REFS_TABLE).map_err(backend)?;
            let matches = table
                .get(key.as_str())
                .map_err(backend)?
                .map(|guard| guard.value() == expected.to_hex())
                .unwrap_or(false);
            if matches {
                table.insert(key.as_str(), desired.to_hex().as_str()).map_err(backend)?;
            }
            matches
        };
        write_txn.commit().map_err(backend)?;
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
        let key = cell_key(name, namespace);
        let write_txn = self.db.begin_write().map_err(backend)?;
        let removed = {
            let mut table = write_txn.open_table(REFS_TABLE).map_err(backend)?;
            table.remove(key.as_str()).map_err(backend)?.map(|guard| guard.value().to_string())
        };
        write_txn.commit().map_err(backend)?;
        match removed {
            Some(hex) => {
                let old = Fingerprint::from_str(&hex)
                    .map_err(|e| Error::corruption_untagged(format!("malformed stored fingerprint: {e}")))?;
                self.registry.publish(Change {
                    name: name.clone(),
                    namespace: namespace.cloned(),
                    old: Some(old),
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
    use tempfile::tempdir;

    fn fp(n: i64) -> Fingerprint {
        Fingerprint::of(&Json::from(n))
    }

    #[tokio::test]
    async fn new_ref_then_reopen_sees_prior_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("refs.redb");
        let name = Name::new("cfg").unwrap();
        {
            let store = RedbRefStore::open(&path).unwrap();
            assert!(store.new_ref(&name, None, fp(1)).await.unwrap());
        }
        let store = RedbRefStore::open(&path).unwrap();
        assert_eq!(store.get(&name, None).await.unwrap(), Some(fp(1)));
    }

    #[tokio::test]
    async fn update_is_compare_and_swap() {
        let dir = tempdir().unwrap();
        let store = RedbRefStore::open(dir.path().join("refs.redb")).unwrap();
        let name = Name::new("cfg").unwrap();
        store.new_ref(&name, None, fp(1)).await.unwrap();

        assert!(!store.update(&name, None, fp(9), fp(2)).await.unwrap());
        assert!(store.update(&name, None, fp(1), fp(2)).await.unwrap());
        assert_eq!(store.get(&name, None).await.unwrap(), Some(fp(2)));
    }

    #[tokio::test]
    async fn subscriber_sees_new_ref_and_delete() {
        let dir = tempdir().unwrap();
        let store = RedbRefStore::open(dir.path().join("refs.redb")).unwrap();
        let name = Name::new("cfg").unwrap();
        let mut sub = store.subscribe(SubscriptionPattern::any());

        store.new_ref(&name, None, fp(1)).await.unwrap();
        assert_eq!(sub.recv().await.unwrap().new, Some(fp(1)));

        store.delete(&name, None).await.unwrap();
        let change = sub.recv().await.unwrap();
        assert_eq!(change.old, Some(fp(1)));
        assert_eq!(change.new, None);
    }
}
