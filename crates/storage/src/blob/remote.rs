//! Remote blob store backed by Postgres via `sqlx`
//!
//! `sqlx` is not in the teacher's own dependency table; it is adopted
//! here from `msez-api` in the `momentum-sez-stack` pack repo, the
//! other real async-Postgres user among the examples.

use super::BlobStore;
use async_trait::async_trait;
use glyph_core::error::{Error, Result};
use glyph_core::fingerprint::Fingerprint;
use glyph_core::json::Json;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

fn backend(e: sqlx::Error) -> Error {
    Error::BackendFailure(e.to_string())
}

/// A [`BlobStore`] backed by a `blobs(fingerprint, payload)` table.
pub struct RemoteBlobStore {
    pool: PgPool,
}

impl RemoteBlobStore {
    /// Wraps an already-configured pool. Does not create the table;
    /// use [`RemoteBlobStore::connect`] for that.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to `database_url` and ensures the `blobs` table exists.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(backend)?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS blobs (
                fingerprint TEXT PRIMARY KEY,
                payload JSONB NOT NULL
            )",
        )
        .execute(&pool)
        .await
        .map_err(backend)?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl BlobStore for RemoteBlobStore {
    async fn has(&self, fingerprint: &Fingerprint) -> Result<bool> {
        let row: Option<(i32,)> = sqlx::query_as("SELECT 1 FROM blobs WHERE fingerprint = $1")
            .bind(fingerprint.to_hex())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        Ok(row.is_some())
    }

    async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<Json>> {
        let row: Option<(serde_json::Value,)> =
            sqlx::query_as("SELECT payload FROM blobs WHERE fingerprint = $1")
                .bind(fingerprint.to_hex())
                .fetch_optional(&self.pool)
                .await
                .map_err(backend)?;
        Ok(row.map(|(payload,)| Json::from(payload)))
    }

    async fn put(&self, fingerprint: Fingerprint, value: Json) -> Result<()> {
        let payload: serde_json::Value = value.into();
        let result = sqlx::query("INSERT INTO blobs (fingerprint, payload) VALUES ($1, $2)")
            .bind(fingerprint.to_hex())
            .bind(payload)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(()),
            // Two writers racing the same content-addressed fingerprint
            // is not a conflict — they agree on the payload by
            // construction (spec.md §4.1).
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Ok(()),
            Err(e) => Err(backend(e)),
        }
    }

    async fn delete(&self, fingerprint: &Fingerprint) -> Result<bool> {
        let result = sqlx::query("DELETE FROM blobs WHERE fingerprint = $1")
            .bind(fingerprint.to_hex())
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(result.rows_affected() > 0)
    }
}
