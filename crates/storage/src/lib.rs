//! Storage backends for blobs and mutable references
//!
//! Two trait families, each with four interchangeable adapters
//! (in-memory, file-backed, embedded `redb`, remote Postgres) per
//! spec.md §5–§6: [`blob::BlobStore`] for immutable content-addressed
//! fragments, [`refs::RefStore`] for mutable named cells under
//! optimistic concurrency control.

#![warn(missing_docs)]

pub mod blob;
pub mod refs;

pub use blob::{BlobStore, FileBlobStore, MemoryBlobStore, MultiBlobStore, RedbBlobStore, RemoteBlobStore};
pub use refs::{
    Change, FileRefStore, MemoryRefStore, NamePattern, NamespacePattern, RedbRefStore, RefStore,
    RemoteRefStore, Subscription, SubscriptionId, SubscriptionPattern,
};
