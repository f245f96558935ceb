//! End-to-end scenarios over the full codec → normalize → storage →
//! session stack.

use chrono::TimeZone;
use glyphdb::prelude::*;
use glyphdb::{decode_manifest, denormalize, normalize, Fingerprint, Json};
use std::sync::Arc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[test]
fn simple_round_trip_emits_exactly_ten_fragments() {
    let value = Json::Array(vec![
        Json::Array(vec![Json::from(2i64), Json::from(22i64)]),
        Json::Array(vec![Json::from(1i64), Json::from(11i64)]),
        Json::Array(vec![Json::from("a"), Json::from("aa")]),
    ]);

    let fragments = normalize(&value);
    assert_eq!(fragments.len(), 10);

    let rebuilt = denormalize(&fragments).unwrap();
    assert_eq!(rebuilt, value);
}

#[tokio::test]
async fn rich_types_round_trip_through_the_value_store() {
    let value_store = ValueStore::new(Arc::new(MemoryBlobStore::new()));

    let date = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    let inner_map = Value::map([("innerinner".to_string(), Value::String("inin".into()))]);
    let ordered = Value::OrderedMap(vec![
        (
            Value::String("a".into()),
            Value::ImmutableSet(vec![Value::I64(1), inner_map]),
        ),
        (
            Value::String("b".into()),
            Value::ImmutableMap(vec![(Value::String("c".into()), Value::String("CC".into()))]),
        ),
    ]);
    let value = Value::Seq(vec![Value::Date(date), ordered]);

    let (fp, _) = value_store.put(&value).await.unwrap();
    let decoded = value_store.get(&fp).await.unwrap();

    match &decoded {
        Value::Seq(items) => {
            match &items[0] {
                Value::Date(d) => assert_eq!(d.timestamp(), date.timestamp()),
                other => panic!("expected Value::Date, got {other:?}"),
            }
            match &items[1] {
                Value::OrderedMap(pairs) => {
                    assert_eq!(pairs[0].0, Value::String("a".into()));
                    assert_eq!(pairs[1].0, Value::String("b".into()));
                    match &pairs[0].1 {
                        Value::ImmutableSet(members) => assert_eq!(members.len(), 2),
                        other => panic!("expected Value::ImmutableSet, got {other:?}"),
                    }
                }
                other => panic!("expected Value::OrderedMap, got {other:?}"),
            }
        }
        other => panic!("expected Value::Seq, got {other:?}"),
    }
}

#[test]
fn structural_sharing_collapses_to_one_fragment_for_the_shared_leaf() {
    let value = Json::object([
        ("x".to_string(), Json::from("shared")),
        ("y".to_string(), Json::from("shared")),
    ]);
    let fragments = normalize(&value);
    assert_eq!(fragments.len(), 2);
}

#[tokio::test]
async fn delete_removes_only_the_top_level_descriptor() {
    let value_store = ValueStore::new(Arc::new(MemoryBlobStore::new()));
    let value = Value::Seq(vec![Value::I64(1), Value::I64(2)]);
    let (fp, _) = value_store.put(&value).await.unwrap();

    assert!(value_store.delete(&fp).await.unwrap());
    let err = value_store.get(&fp).await.unwrap_err();
    assert!(err.is_corruption());
}

#[tokio::test]
async fn decode_manifest_rejects_a_descriptor_with_a_missing_fragment() {
    let blobs: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
    let descriptor = glyphdb::encode_manifest(&[Fingerprint::of(&Json::from(1i64))]);

    let err = decode_manifest(&descriptor, blobs.as_ref()).await.unwrap_err();
    assert!(err.is_corruption());
}

#[tokio::test]
async fn ref_lifecycle_with_subscription_and_delete_without_cascade() {
    init_tracing();
    let name = Name::new("cfg").unwrap();
    let ns = Namespace::new("app").unwrap();

    let blobs = Arc::new(MemoryBlobStore::new());
    let ref_store_subscriber = Arc::new(MemoryRefStore::new());
    let session = Session::new(
        vec![blobs.clone() as Arc<dyn BlobStore>],
        ref_store_subscriber.clone(),
        SessionOptions::default(),
    );

    let mut sub = ref_store_subscriber.subscribe(SubscriptionPattern::exact(name.clone(), Some(ns.clone())));

    let initial = Value::map([("version".to_string(), Value::I64(1))]);
    let p1 = session.new_ref(name.clone(), Some(ns.clone()), initial).await.unwrap();
    let f1 = p1.fingerprint().await;

    let created = sub.recv().await.unwrap();
    assert_eq!(created.old, None);
    assert_eq!(created.new, Some(f1));

    let p2 = session.get_ref(name.clone(), Some(ns.clone())).await.unwrap();

    let v2 = Value::map([("version".to_string(), Value::I64(2))]);
    p1.set(v2.clone()).await.unwrap();

    let updated = sub.recv().await.unwrap();
    assert_eq!(updated.old, Some(f1));

    let v2_prime = Value::map([("version".to_string(), Value::I64(3))]);
    let err = p2.set(v2_prime).await.unwrap_err();
    assert!(err.is_occ_conflict());

    p2.pull().await.unwrap();
    assert_eq!(p2.read().await, v2);

    assert!(session.delete_ref(&name, Some(&ns)).await.unwrap());
    let deleted = sub.recv().await.unwrap();
    assert_eq!(deleted.new, None);

    assert!(session.get_ref(name.clone(), Some(ns.clone())).await.is_err());

    // Scenario 6: deleting the reference cell does not cascade — the
    // value-store blob the deleted cell pointed at still resolves.
    let f2 = p2.fingerprint().await;
    let value_store = ValueStore::new(blobs);
    assert_eq!(value_store.get(&f2).await.unwrap(), v2);
}
