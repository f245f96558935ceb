//! Property tests over the reference-cell layer: OCC exclusion and
//! subscription delivery, run against [`MemoryRefStore`].

use glyphdb::prelude::*;
use proptest::prelude::*;
use std::sync::Arc;

fn fp(n: i64) -> Fingerprint {
    Fingerprint::of(&Json::from(n))
}

proptest! {
    /// Two concurrent `update`s racing from the same expected fingerprint:
    /// exactly one wins, and `get` afterwards reflects the winner's desired
    /// value, never a merge of both or neither.
    #[test]
    fn update_race_is_exclusive(winner_first in any::<bool>()) {
        let store = MemoryRefStore::new();
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let name = Name::new("cfg").unwrap();
            store.new_ref(&name, None, fp(0)).await.unwrap();

            let (a, b) = (fp(1), fp(2));
            let (first, second) = if winner_first { (a, b) } else { (b, a) };

            let r1 = store.update(&name, None, fp(0), first).await.unwrap();
            let r2 = store.update(&name, None, fp(0), second).await.unwrap();

            prop_assert!(r1 ^ r2, "exactly one update must win, got ({r1}, {r2})");
            let winner = if r1 { first } else { second };
            prop_assert_eq!(store.get(&name, None).await.unwrap(), Some(winner));
            Ok(())
        })?;
    }

    /// Every successful new_ref/update/delete on a cell produces exactly one
    /// callback, in order, to a subscriber watching that exact cell.
    #[test]
    fn subscriber_observes_every_mutation_in_order(steps in 1usize..6) {
        let store = MemoryRefStore::new();
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let name = Name::new("cfg").unwrap();
            let mut sub = store.subscribe(SubscriptionPattern::exact(name.clone(), None));

            store.new_ref(&name, None, fp(0)).await.unwrap();
            let created = sub.recv().await.unwrap();
            prop_assert_eq!(created.old, None);
            prop_assert_eq!(created.new, Some(fp(0)));

            let mut current = fp(0);
            for i in 1..=steps {
                let next = fp(i as i64 + 100);
                prop_assert!(store.update(&name, None, current, next).await.unwrap());
                let change = sub.recv().await.unwrap();
                prop_assert_eq!(change.old, Some(current));
                prop_assert_eq!(change.new, Some(next));
                current = next;
            }
            Ok(())
        })?;
    }

    /// Once unsubscribe(id) returns, no later mutation is delivered to that
    /// subscription, regardless of how many mutations follow.
    #[test]
    fn unsubscribe_stops_further_delivery(extra_updates in 0usize..4) {
        let store = MemoryRefStore::new();
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let name = Name::new("cfg").unwrap();
            let mut sub = store.subscribe(SubscriptionPattern::exact(name.clone(), None));

            store.new_ref(&name, None, fp(0)).await.unwrap();
            let _ = sub.recv().await.unwrap();

            prop_assert!(store.unsubscribe(sub.id()));

            let mut current = fp(0);
            for i in 0..extra_updates {
                let next = fp(i as i64 + 200);
                store.update(&name, None, current, next).await.unwrap();
                current = next;
            }
            prop_assert!(sub.recv().await.is_none());
            Ok(())
        })?;
    }
}

/// Scenario 4/5/6 from the end-to-end spec, against a file-backed store:
/// same OCC-exclusion and no-cascade-delete shape as the in-memory adapter.
#[tokio::test]
async fn file_backed_ref_store_exposes_the_same_occ_shape() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn RefStore> = Arc::new(FileRefStore::new(dir.path().join("refs.json")));
    let name = Name::new("cfg").unwrap();
    let ns = Namespace::new("app").unwrap();

    assert!(store.new_ref(&name, Some(&ns), fp(1)).await.unwrap());
    assert!(!store.update(&name, Some(&ns), fp(9), fp(2)).await.unwrap());
    assert!(store.update(&name, Some(&ns), fp(1), fp(2)).await.unwrap());
    assert_eq!(store.get(&name, Some(&ns)).await.unwrap(), Some(fp(2)));

    assert!(store.delete(&name, Some(&ns)).await.unwrap());
    assert_eq!(store.get(&name, Some(&ns)).await.unwrap(), None);
}
