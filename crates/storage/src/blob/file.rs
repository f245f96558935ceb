//! File-backed blob store: one JSON document, advisory-locked via `fs2`
//!
//! Mirrors the teacher's WAL handling (`parking_lot::Mutex` guarding
//! blocking file I/O, see `database/handle.rs`): a single
//! `parking_lot::Mutex` serializes access in-process — every critical
//! section here is synchronous `std::fs` I/O with no `.await` inside
//! it, so a plain sync mutex is the right tool, not `tokio::sync::Mutex`
//! — and an `fs2` advisory lock on the temp file guards against a
//! second process racing the same path. Every write goes to a temp
//! file, is `fsync`'d, then renamed into place, so a reader never
//! observes a half-written document.

use super::BlobStore;
use async_trait::async_trait;
use fs2::FileExt;
use glyph_core::error::{Error, Result};
use glyph_core::fingerprint::Fingerprint;
use glyph_core::json::Json;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A [`BlobStore`] persisted as a single JSON document on disk,
/// mapping hex fingerprint to blob content.
pub struct FileBlobStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileBlobStore {
    /// Opens (without yet creating) the document at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    fn read_document(&self) -> Result<BTreeMap<String, Json>> {
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
        let value: serde_json::Value = serde_json::from_str(&contents)
            .map_err(|e| Error::corruption_untagged(format!("malformed blob document: {e}")))?;
        match Json::from(value) {
            Json::Object(map) => Ok(map),
            _ => Err(Error::corruption_untagged("blob document root must be an object")),
        }
    }

    fn write_document(&self, map: &BTreeMap<String, Json>) -> Result<()> {
        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)?;
        let tmp_path = parent.join(format!(
            ".{}.tmp",
            self.path.file_name().and_then(|n| n.to_str()).unwrap_or("blobs.json")
        ));

        let mut tmp = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;
        tmp.lock_exclusive()?;
        let write_result = tmp
            .write_all(&Json::Object(map.clone()).canonical_bytes())
            .and_then(|_| tmp.sync_all());
        let _ = tmp.unlock();
        write_result?;

        fs::rename(&tmp_path, &self.path)?;
        debug!(target: "glyphdb::storage", path = %self.path.display(), blobs = map.len(), "blob document written");
        Ok(())
    }
}

#[async_trait]
impl BlobStore for FileBlobStore {
    async fn has(&self, fingerprint: &Fingerprint) -> Result<bool> {
        let _permit = self.guard.lock();
        Ok(self.read_document()?.contains_key(&fingerprint.to_hex()))
    }

    async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<Json>> {
        let _permit = self.guard.lock();
        Ok(self.read_document()?.get(&fingerprint.to_hex()).cloned())
    }

    async fn put(&self, fingerprint: Fingerprint, value: Json) -> Result<()> {
        let _permit = self.guard.lock();
        let mut map = self.read_document()?;
        map.entry(fingerprint.to_hex()).or_insert(value);
        self.write_document(&map)
    }

    async fn delete(&self, fingerprint: &Fingerprint) -> Result<bool> {
        let _permit = self.guard.lock();
        let mut map = self.read_document()?;
        let removed = map.remove(&fingerprint.to_hex()).is_some();
        if removed {
            self.write_document(&map)?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn put_persists_across_instances() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blobs.json");

        let store = FileBlobStore::new(&path);
        let value = Json::from("durable");
        let fp = Fingerprint::of(&value);
        store.put(fp, value.clone()).await.unwrap();

        let reopened = FileBlobStore::new(&path);
        assert_eq!(reopened.get(&fp).await.unwrap(), Some(value));
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        let store = FileBlobStore::new(dir.path().join("absent.json"));
        assert!(!store.has(&Fingerprint::of(&Json::Null)).await.unwrap());
    }

    #[tokio::test]
    async fn delete_removes_entry_and_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blobs.json");
        let store = FileBlobStore::new(&path);
        let value = Json::from(7i64);
        let fp = Fingerprint::of(&value);
        store.put(fp, value).await.unwrap();
        assert!(store.delete(&fp).await.unwrap());

        let reopened = FileBlobStore::new(&path);
        assert_eq!(reopened.get(&fp).await.unwrap(), None);
    }
}
