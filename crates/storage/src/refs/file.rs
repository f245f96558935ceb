//! File-backed ref store: one JSON document, advisory-locked via `fs2`
//!
//! Same durability shape as [`super::super::blob::FileBlobStore`]:
//! temp-file-then-rename under an `fs2` exclusive lock, serialized
//! in-process by a `parking_lot::Mutex` (the critical section is
//! synchronous `std::fs` I/O, never held across an `.await`).
//! Notification is in-process only — a second process writing the
//! same file is not observed by this instance's subscribers.

use super::{Change, RefStore, Subscription, SubscriptionId, SubscriptionPattern, SubscriptionRegistry};
use async_trait::async_trait;
use fs2::FileExt;
use glyph_core::contract::{Name, Namespace, SEPARATOR};
use glyph_core::error::{Error, Result};
use glyph_core::fingerprint::Fingerprint;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

fn cell_key(name: &Name, namespace: Option<&Namespace>) -> String {
    match namespace {
        Some(ns) => format!("{ns}{SEPARATOR}{name}"),
        None => name.to_string(),
    }
}

/// A [`RefStore`] persisted as a single JSON document mapping a
/// `namespace`+[`SEPARATOR`]+`name` (or bare `name`) key to a hex
/// fingerprint.
pub struct FileRefStore {
    path: PathBuf,
    guard: Mutex<()>,
    registry: SubscriptionRegistry,
}

impl FileRefStore {
    /// Opens (without yet creating) the document at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
            registry: SubscriptionRegistry::new(),
        }
    }

    fn read_document(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let file = File::open(&self.path)?;
        file.lock_shared()?;
        let mut contents = String::new();
        let read_result = (&file).read_to_string(&mut contents);
        let _ = file.unlock();
        read_result?;

        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&contents)
            .map_err(|e| Error::corruption_untagged(format!("malformed ref document: {e}")))
    }

    fn write_document(&self, map: &BTreeMap<String, String>) -> Result<()> {
        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)?;
        let tmp_path = parent.join(format!(
            ".{}.tmp",
            self.path.file_name().and_then(|n| n.to_str()).unwrap_or("refs.json")
        ));

        let mut tmp = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;
        tmp.lock_exclusive()?;
        let bytes = serde_json::to_vec(map)
            .map_err(|e| Error::corruption_untagged(format!("failed to encode ref document: {e}")))?;
        let write_result = tmp.write_all(&bytes).and_then(|_| tmp.sync_all());
        let _ = tmp.unlock();
        write_result?;

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

#[async_trait]
impl RefStore for FileRefStore {
    async fn get(&self, name: &Name, namespace: Option<&Namespace>) -> Result<Option<Fingerprint>> {
        let _permit = self.guard.lock();
        match self.read_document()?.get(&cell_key(name, namespace)) {
            Some(hex) => Ok(Some(Fingerprint::from_str(hex).map_err(|e| {
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
        let _permit = self.guard.lock();
        let mut map = self.read_document()?;
        let key = cell_key(name, namespace);
        if map.contains_key(&key) {
            return Ok(false);
        }
        map.insert(key, fingerprint.to_hex());
        self.write_document(&map)?;
        debug!(target: "glyphdb::refs", name = %name, fingerprint = %fingerprint, "reference cell created");
        self.registry.publish(Change {
            name: name.clone(),
            namespace: namespace.cloned(),
            old: None,
            new: Some(fingerprint),
        });
        Ok(true)
    }

    async fn update(
        &self,
        name: &Name,
        namespace: Option<&Namespace>,
        expected: Fingerprint,
        desired: Fingerprint,
    ) -> Result<bool> {
        let _permit = self.guard.lock();
        let mut map = self.read_document()?;
        let key = cell_key(name, namespace);
        if map.get(&key).map(|hex| hex.as_str()) != Some(expected.to_hex().as_str()) {
            return Ok(false);
        }
        map.insert(key, desired.to_hex());
        self.write_document(&map)?;
        self.registry.publish(Change {
            name: name.clone(),
            namespace: namespace.cloned(),
            old: Some(expected),
            new: Some(desired),
        });
        Ok(true)
    }

    async fn delete(&self, name: &Name, namespace: Option<&Namespace>) -> Result<bool> {
        let _permit = self.guard.lock();
        let mut map = self.read_document()?;
        let key = cell_key(name, namespace);
        let removed = match map.remove(&key) {
            Some(hex) => Some(hex),
            None => return Ok(false),
        };
        self.write_document(&map)?;
        if let Some(hex) = removed {
            let old = Fingerprint::from_str(&hex)
                .map_err(|e| Error::corruption_untagged(format!("malformed stored fingerprint: {e}")))?;
            self.registry.publish(Change {
                name: name.clone(),
                namespace: namespace.cloned(),
                old: Some(old),
                new: None,
            });
        }
        Ok(true)
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
    async fn new_ref_persists_across_instances() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("refs.json");
        let name = Name::new("cfg").unwrap();

        let store = FileRefStore::new(&path);
        assert!(store.new_ref(&name, None, fp(1)).await.unwrap());

        let reopened = FileRefStore::new(&path);
        assert_eq!(reopened.get(&name, None).await.unwrap(), Some(fp(1)));
    }

    #[tokio::test]
    async fn update_requires_matching_expected() {
        let dir = tempdir().unwrap();
        let store = FileRefStore::new(dir.path().join("refs.json"));
        let name = Name::new("cfg").unwrap();
        store.new_ref(&name, None, fp(1)).await.unwrap();

        assert!(!store.update(&name, None, fp(9), fp(2)).await.unwrap());
        assert!(store.update(&name, None, fp(1), fp(2)).await.unwrap());
        assert_eq!(store.get(&name, None).await.unwrap(), Some(fp(2)));
    }

    #[tokio::test]
    async fn namespaced_and_bare_names_do_not_collide() {
        let dir = tempdir().unwrap();
        let store = FileRefStore::new(dir.path().join("refs.json"));
        let name = Name::new("cfg").unwrap();
        let ns = Namespace::new("app").unwrap();

        store.new_ref(&name, None, fp(1)).await.unwrap();
        store.new_ref(&name, Some(&ns), fp(2)).await.unwrap();
        assert_eq!(store.get(&name, None).await.unwrap(), Some(fp(1)));
        assert_eq!(store.get(&name, Some(&ns)).await.unwrap(), Some(fp(2)));
    }
}
