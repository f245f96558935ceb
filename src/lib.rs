//! # glyphdb
//!
//! A content-addressed object store for structured values, with
//! mutable named references under optimistic concurrency control.
//!
//! Every value is shredded into a DAG of fingerprint-addressed, flat
//! fragments before it touches a blob store, so structurally equal
//! subtrees are stored once no matter where they occur. Mutable state
//! lives only in a separate, much smaller layer: named `(name,
//! namespace)` reference cells that point at a fingerprint and move
//! forward only via compare-and-swap.
//!
//! # Quick Start
//!
//! ```no_run
//! use glyphdb::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn run() -> glyph_core::error::Result<()> {
//! let session = Session::new(
//!     vec![Arc::new(MemoryBlobStore::new())],
//!     Arc::new(MemoryRefStore::new()),
//!     SessionOptions::default(),
//! );
//!
//! let mut map = std::collections::BTreeMap::new();
//! map.insert("count".to_string(), Value::I64(0));
//!
//! let cfg = session
//!     .new_ref(Name::new("cfg")?, None, Value::Map(map))
//!     .await?;
//!
//! cfg.update(|current| match current {
//!     Value::Map(m) => {
//!         let mut m = m.clone();
//!         m.insert("count".to_string(), Value::I64(1));
//!         Value::Map(m)
//!     }
//!     other => other.clone(),
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Components
//!
//! | Crate | Role |
//! |-------|------|
//! | [`glyph_core`] | [`Json`](glyph_core::json::Json) canonical form, [`Fingerprint`](glyph_core::fingerprint::Fingerprint), the [`Error`](glyph_core::error::Error) taxonomy, validated [`Name`](glyph_core::contract::Name)/[`Namespace`](glyph_core::contract::Namespace) |
//! | [`glyph_codec`] | Rich [`Value`](glyph_codec::Value) ↔ plain JSON, via sentinel-tagged pairs |
//! | [`glyph_normalize`] | Shred/reassemble JSON into flat, content-addressed fragments |
//! | [`glyph_storage`] | `BlobStore`/`RefStore` adapters: in-memory, file-backed, embedded (`redb`), remote (Postgres) |
//! | [`glyph_session`] | `ValueStore`/`Ref`/`Session`: the mutable-handle facade |
//!
//! Only this crate's re-exports and the [`prelude`] are meant for
//! general use; reach into a sub-crate directly only for adapter types
//! the prelude omits (e.g. a specific `BlobStore` backend).

pub use glyph_codec::{decode, encode, Value};
pub use glyph_core::contract::{Name, NameError, Namespace, NamespaceError};
pub use glyph_core::error::{Error, Result};
pub use glyph_core::fingerprint::Fingerprint;
pub use glyph_core::json::{Json, Number};
pub use glyph_normalize::{decode_manifest, denormalize, encode_manifest, normalize, FragmentSource};
pub use glyph_session::{Ref, RefOptions, Session, SessionOptions, ValueStore};
pub use glyph_storage::{
    BlobStore, Change, FileBlobStore, FileRefStore, MemoryBlobStore, MemoryRefStore, MultiBlobStore,
    NamePattern, NamespacePattern, RedbBlobStore, RedbRefStore, RefStore, RemoteBlobStore,
    RemoteRefStore, Subscription, SubscriptionId, SubscriptionPattern,
};

/// Glob import surface for application code: `use glyphdb::prelude::*;`
pub mod prelude {
    pub use crate::{
        BlobStore, Change, FileBlobStore, FileRefStore, MemoryBlobStore, MemoryRefStore,
        MultiBlobStore, Name, Namespace, Ref, RefOptions, RefStore, Session, SessionOptions,
        SubscriptionPattern, Value, ValueStore,
    };
}
