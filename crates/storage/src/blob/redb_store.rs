//! Embedded blob store backed by `redb`
//!
//! `redb` appears in the teacher's root `Cargo.toml` as an optional
//! dependency gated behind its `comparison-benchmarks` feature, used
//! only to compare write throughput against a third-party engine. This
//! promotes it to a first-class embedded backend: one table, hex
//! fingerprint key, canonical JSON bytes as the value.

use super::BlobStore;
use async_trait::async_trait;
use glyph_core::error::{Error, Result};
use glyph_core::fingerprint::Fingerprint;
use glyph_core::json::Json;
use redb::{Database, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;

const BLOBS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("blobs");

fn backend(e: impl std::fmt::Display) -> Error {
    Error::BackendFailure(e.to_string())
}

/// A [`BlobStore`] persisted in an embedded `redb` database file.
pub struct RedbBlobStore {
    db: Arc<Database>,
}

impl RedbBlobStore {
    /// Opens (creating if absent) the database at `path` and ensures
    /// the blobs table exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::create(path).map_err(backend)?;
        let write_txn = db.begin_write().map_err(backend)?;
        write_txn.open_table(BLOBS_TABLE).map_err(backend)?;
        write_txn.commit().map_err(backend)?;
        Ok(Self { db: Arc::new(db) })
    }
}

#[async_trait]
impl BlobStore for RedbBlobStore {
    async fn has(&self, fingerprint: &Fingerprint) -> Result<bool> {
        let read_txn = self.db.begin_read().map_err(backend)?;
        let table = read_txn.open_table(BLOBS_TABLE).map_err(backend)?;
        Ok(table.get(fingerprint.to_hex().as_str()).map_err(backend)?.is_some())
    }

    async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<Json>> {
        let read_txn = self.db.begin_read().map_err(backend)?;
        let table = read_txn.open_table(BLOBS_TABLE).map_err(backend)?;
        match table.get(fingerprint.to_hex().as_str()).map_err(backend)? {
            Some(guard) => {
                let value: serde_json::Value = serde_json::from_slice(guard.value())
                    .map_err(|e| Error::corruption(*fingerprint, format!("malformed stored blob: {e}")))?;
                Ok(Some(Json::from(value)))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, fingerprint: Fingerprint, value: Json) -> Result<()> {
        if self.has(&fingerprint).await? {
            return Ok(());
        }
        let write_txn = self.db.begin_write().map_err(backend)?;
        {
            let mut table = write_txn.open_table(BLOBS_TABLE).map_err(backend)?;
            table
                .insert(fingerprint.to_hex().as_str(), value.canonical_bytes().as_slice())
                .map_err(backend)?;
        }
        write_txn.commit().map_err(backend)?;
        Ok(())
    }

    async fn delete(&self, fingerprint: &Fingerprint) -> Result<bool> {
        let write_txn = self.db.begin_write().map_err(backend)?;
        let removed = {
            let mut table = write_txn.open_table(BLOBS_TABLE).map_err(backend)?;
            table
                .remove(fingerprint.to_hex().as_str())
                .map_err(backend)?
                .is_some()
        };
        write_txn.commit().map_err(backend)?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn put_get_delete_round_trip() {
        let dir = tempdir().unwrap();
        let store = RedbBlobStore::open(dir.path().join("blobs.redb")).unwrap();

        let value = Json::object([("k".to_string(), Json::from(1i64))]);
        let fp = Fingerprint::of(&value);
        store.put(fp, value.clone()).await.unwrap();
        assert_eq!(store.get(&fp).await.unwrap(), Some(value));

        assert!(store.delete(&fp).await.unwrap());
        assert_eq!(store.get(&fp).await.unwrap(), None);
    }

    #[tokio::test]
    async fn reopening_sees_prior_writes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blobs.redb");
        {
            let store = RedbBlobStore::open(&path).unwrap();
            let value = Json::from("persisted");
            store.put(Fingerprint::of(&value), value).await.unwrap();
        }
        let store = RedbBlobStore::open(&path).unwrap();
        let value = Json::from("persisted");
        assert_eq!(store.get(&Fingerprint::of(&value)).await.unwrap(), Some(value));
    }
}
