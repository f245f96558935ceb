//! Remote ref store backed by Postgres via `sqlx`
//!
//! CAS is a single conditional `UPDATE ... WHERE fingerprint = $expected`
//! plus the affected-row count, the same shape `RemoteBlobStore` uses
//! for its unique-violation check. Change notification is `LISTEN`/
//! `NOTIFY` on a per-store channel: every writer `NOTIFY`s after
//! commit, and a dedicated listener connection republishes into this
//! instance's [`SubscriptionRegistry`], which is how a second process
//! sharing the same database *is* observed here, unlike the embedded
//! adapters.

use super::{Change, RefStore, Subscription, SubscriptionId, SubscriptionPattern, SubscriptionRegistry};
use async_trait::async_trait;
use glyph_core::contract::{Name, Namespace};
use glyph_core::error::{Error, Result};
use glyph_core::fingerprint::Fingerprint;
use sqlx::postgres::{PgListener, PgPoolOptions};
use sqlx::PgPool;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

const NOTIFY_CHANNEL: &str = "glyph_ref_changes";

fn backend(e: sqlx::Error) -> Error {
    Error::BackendFailure(e.to_string())
}

/// A [`RefStore`] backed by a `reference_cells(name, namespace, fingerprint)`
/// table.
pub struct RemoteRefStore {
    pool: PgPool,
    registry: Arc<SubscriptionRegistry>,
}

impl RemoteRefStore {
    /// Wraps an already-configured pool, without starting the
    /// notification listener. Use [`RemoteRefStore::connect`] for a
    /// fully wired instance.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            registry: Arc::new(SubscriptionRegistry::new()),
        }
    }

    /// Connects to `database_url`, ensures the `reference_cells` table
    /// exists, and spawns the background `LISTEN` task that feeds this
    /// instance's subscribers.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(backend)?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS reference_cells (
                name TEXT NOT NULL,
                namespace TEXT NOT NULL DEFAULT '',
                fingerprint TEXT NOT NULL,
                PRIMARY KEY (name, namespace)
            )",
        )
        .execute(&pool)
        .await
        .map_err(backend)?;

        let store = Self {
            pool,
            registry: Arc::new(SubscriptionRegistry::new()),
        };
        store.spawn_listener(database_url).await?;
        Ok(store)
    }

    async fn spawn_listener(&self, database_url: &str) -> Result<()> {
        let mut listener = PgListener::connect(database_url).await.map_err(backend)?;
        listener.listen(NOTIFY_CHANNEL).await.map_err(backend)?;
        let registry = Arc::clone(&self.registry);

        tokio::spawn(async move {
            while let Ok(notification) = listener.recv().await {
                match decode_notification(notification.payload()) {
                    Some(change) => registry.publish(change),
                    None => warn!(
                        target: "glyphdb::refs",
                        payload = notification.payload(),
                        "dropped malformed reference-change notification"
                    ),
                }
            }
        });
        Ok(())
    }

    fn namespace_column(namespace: Option<&Namespace>) -> String {
        namespace.map(|ns| ns.to_string()).unwrap_or_default()
    }

    async fn notify(&self, change: &Change) -> Result<()> {
        let payload = encode_notification(change);
        sqlx::query("SELECT pg_notify($1, $2)")
            .bind(NOTIFY_CHANNEL)
            .bind(payload)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }
}

fn encode_notification(change: &Change) -> String {
    format!(
        "{}\u{1f}{}\u{1f}{}\u{1f}{}",
        change.name,
        change.namespace.as_ref().map(|ns| ns.to_string()).unwrap_or_default(),
        change.old.map(|fp| fp.to_hex()).unwrap_or_default(),
        change.new.map(|fp| fp.to_hex()).unwrap_or_default(),
    )
}

fn decode_notification(payload: &str) -> Option<Change> {
    let mut parts = payload.split('\u{1f}');
    let name = Name::new(parts.next()?).ok()?;
    let namespace = match parts.next()? {
        "" => None,
        ns => Namespace::new(ns).ok(),
    };
    let old = match parts.next()? {
        "" => None,
        hex => Fingerprint::from_str(hex).ok(),
    };
    let new = match parts.next()? {
        "" => None,
        hex => Fingerprint::from_str(hex).ok(),
    };
    Some(Change {
        name,
        namespace,
        old,
        new,
    })
}

#[async_trait]
impl RefStore for RemoteRefStore {
    async fn get(&self, name: &Name, namespace: Option<&Namespace>) -> Result<Option<Fingerprint>> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT fingerprint FROM reference_cells WHERE name = $1 AND namespace = $2",
        )
        .bind(name.as_str())
        .bind(Self::namespace_column(namespace))
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        row.map(|(hex,)| {
            Fingerprint::from_str(&hex)
                .map_err(|e| Error::corruption_untagged(format!("malformed stored fingerprint: {e}")))
        })
        .transpose()
    }

    async fn new_ref(
        &self,
        name: &Name,
        namespace: Option<&Namespace>,
        fingerprint: Fingerprint,
    ) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO reference_cells (name, namespace, fingerprint) VALUES ($1, $2, $3)
             ON CONFLICT (name, namespace) DO NOTHING",
        )
        .bind(name.as_str())
        .bind(Self::namespace_column(namespace))
        .bind(fingerprint.to_hex())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        let created = result.rows_affected() > 0;
        if created {
            debug!(target: "glyphdb::refs", name = %name, fingerprint = %fingerprint, "reference cell created");
            self.notify(&Change {
                name: name.clone(),
                namespace: namespace.cloned(),
                old: None,
                new: Some(fingerprint),
            })
            .await?;
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
        let result = sqlx::query(
            "UPDATE reference_cells SET fingerprint = $1
             WHERE name = $2 AND namespace = $3 AND fingerprint = $4",
        )
        .bind(desired.to_hex())
        .bind(name.as_str())
        .bind(Self::namespace_column(namespace))
        .bind(expected.to_hex())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        let applied = result.rows_affected() > 0;
        if applied {
            self.notify(&Change {
                name: name.clone(),
                namespace: namespace.cloned(),
                old: Some(expected),
                new: Some(desired),
            })
            .await?;
        }
        Ok(applied)
    }

    async fn delete(&self, name: &Name, namespace: Option<&Namespace>) -> Result<bool> {
        let row: Option<(String,)> = sqlx::query_as(
            "DELETE FROM reference_cells WHERE name = $1 AND namespace = $2 RETURNING fingerprint",
        )
        .bind(name.as_str())
        .bind(Self::namespace_column(namespace))
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        match row {
            Some((hex,)) => {
                let old = Fingerprint::from_str(&hex)
                    .map_err(|e| Error::corruption_untagged(format!("malformed stored fingerprint: {e}")))?;
                self.notify(&Change {
                    name: name.clone(),
                    namespace: namespace.cloned(),
                    old: Some(old),
                    new: None,
                })
                .await?;
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
