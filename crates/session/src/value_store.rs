//! Combines codec + normalizer over a single [`BlobStore`] (spec.md §4.5)

use glyph_codec::{decode, encode, Value};
use glyph_core::error::Result;
use glyph_core::fingerprint::Fingerprint;
use glyph_core::json::Json;
use glyph_normalize::{decode_manifest, denormalize, encode_manifest, normalize};
use glyph_storage::BlobStore;
use std::sync::Arc;

/// Orchestrates encode → normalize → put on write, and fetch →
/// decode-manifest → denormalize → decode on read, over a single
/// [`BlobStore`].
///
/// Every operation is safe to call from multiple concurrent tasks: the
/// only state held here is the `BlobStore` handle itself.
pub struct ValueStore {
    blobs: Arc<dyn BlobStore>,
}

impl ValueStore {
    /// Wraps `blobs` for codec/normalize orchestration.
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }

    /// Encodes, normalizes, and persists `value`. Returns the root
    /// descriptor's fingerprint and the descriptor itself.
    ///
    /// A value that encodes to a single primitive still produces
    /// exactly one fragment plus one root descriptor (spec.md §4.5).
    pub async fn put(&self, value: &Value) -> Result<(Fingerprint, Json)> {
        let json = encode(value);
        let fragments = normalize(&json);
        let manifest: Vec<Fingerprint> = fragments.iter().map(|(fp, _)| *fp).collect();

        self.blobs.put_many(fragments).await?;

        let descriptor = encode_manifest(&manifest);
        let root_fingerprint = Fingerprint::of(&descriptor);
        self.blobs.put(root_fingerprint, descriptor.clone()).await?;
        Ok((root_fingerprint, descriptor))
    }

    /// Fetches the root descriptor at `root_fingerprint`, resolves its
    /// manifest, and decodes the reassembled value.
    pub async fn get(&self, root_fingerprint: &Fingerprint) -> Result<Value> {
        let descriptor = self
            .blobs
            .get(root_fingerprint)
            .await?
            .ok_or_else(|| glyph_core::error::Error::corruption(*root_fingerprint, "root descriptor not found"))?;
        let fragments = decode_manifest(&descriptor, self.blobs.as_ref()).await?;
        let json = denormalize(&fragments)?;
        decode(&json)
    }

    /// Removes only the top-level root-descriptor blob at `fingerprint`.
    /// Referenced fragments are left untouched — deletion never
    /// cascades (spec.md §4.5).
    pub async fn delete(&self, fingerprint: &Fingerprint) -> Result<bool> {
        self.blobs.delete(fingerprint).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glyph_storage::MemoryBlobStore;
    use std::collections::BTreeMap;

    fn store() -> ValueStore {
        ValueStore::new(Arc::new(MemoryBlobStore::new()))
    }

    #[tokio::test]
    async fn round_trip_preserves_structural_equality() {
        let vs = store();
        let mut map = BTreeMap::new();
        map.insert("a".to_string(), Value::I64(1));
        map.insert("b".to_string(), Value::Seq(vec![Value::Bool(true), Value::Null]));
        let value = Value::Map(map);

        let (fp, _) = vs.put(&value).await.unwrap();
        assert_eq!(vs.get(&fp).await.unwrap(), value);
    }

    #[tokio::test]
    async fn single_primitive_round_trips() {
        let vs = store();
        let value = Value::I64(42);
        let (fp, _) = vs.put(&value).await.unwrap();
        assert_eq!(vs.get(&fp).await.unwrap(), value);
    }

    #[tokio::test]
    async fn delete_does_not_cascade_to_fragments() {
        let vs = store();
        let value = Value::Seq(vec![Value::I64(1), Value::I64(2)]);
        let (fp, _) = vs.put(&value).await.unwrap();

        assert!(vs.delete(&fp).await.unwrap());
        assert!(vs.get(&fp).await.is_err());
    }
}
