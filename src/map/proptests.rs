//! Property-based tests for the concurrent map using proptest
//!
//! These tests check the map against a plain `HashMap` model and verify the snapshot,
//! filter, update and JSON invariants over arbitrary inputs.

use crate::map::ConcurrentMap;
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

#[derive(Debug, Clone)]
enum Op {
    Set(u8, i32),
    Delete(u8),
    Get(u8),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (any::<u8>(), any::<i32>()).prop_map(|(k, v)| Op::Set(k, v)),
        any::<u8>().prop_map(Op::Delete),
        any::<u8>().prop_map(Op::Get),
    ]
}

/// Property: single-threaded behaviour matches `HashMap`
mod model_properties {
    use super::*;

    proptest! {
        #[test]
        fn test_matches_hashmap_model(ops in prop::collection::vec(op_strategy(), 1..200)) {
            let map: ConcurrentMap<u8, i32> = ConcurrentMap::new();
            let mut model: HashMap<u8, i32> = HashMap::new();

            for op in ops {
                match op {
                    Op::Set(k, v) => {
                        map.set(k, v);
                        model.insert(k, v);
                    }
                    Op::Delete(k) => {
                        map.delete(&k);
                        model.remove(&k);
                    }
                    Op::Get(k) => {
                        let expected = model.get(&k).copied();
                        prop_assert_eq!(map.get_opt(&k), expected);
                        prop_assert_eq!(map.get(&k), expected.unwrap_or_default());
                        prop_assert_eq!(map.get_with_test(&k), (expected.unwrap_or_default(), expected.is_some()));
                        prop_assert_eq!(map.has_key(&k), expected.is_some());
                    }
                }
                prop_assert_eq!(map.len(), model.len());
            }

            prop_assert_eq!(map.as_map(), model);
        }

        #[test]
        fn test_as_map_copy_independence(
            entries in prop::collection::hash_map(any::<u16>(), any::<i64>(), 1..50),
            extra in any::<i64>()
        ) {
            let map = ConcurrentMap::from_map(entries.clone());
            let mut copy = map.as_map();
            for value in copy.values_mut() {
                *value = value.wrapping_add(1);
            }
            copy.clear();
            copy.insert(0, extra);

            for (k, v) in &entries {
                prop_assert_eq!(map.get(k), *v);
            }
            prop_assert_eq!(map.len(), entries.len());
        }
    }
}

/// Property: bulk operations preserve or transform every entry
mod bulk_properties {
    use super::*;

    proptest! {
        #[test]
        fn test_filter_extremes(entries in prop::collection::hash_map(any::<u16>(), any::<i32>(), 0..100)) {
            let map = ConcurrentMap::from_map(entries.clone());

            let all = map.filter(|_, _| true);
            prop_assert_eq!(all.as_map(), entries.clone());

            let none = map.filter(|_, _| false);
            prop_assert!(none.is_empty());
        }

        #[test]
        fn test_filter_matches_retain(
            entries in prop::collection::hash_map(any::<u16>(), any::<i32>(), 0..100),
            modulus in 1i32..8
        ) {
            let map = ConcurrentMap::from_map(entries.clone());
            let filtered = map.filter(|_, v| v % modulus == 0);

            let mut expected = entries;
            expected.retain(|_, v| *v % modulus == 0);
            prop_assert_eq!(filtered.as_map(), expected);
        }

        #[test]
        fn test_update_identity(entries in prop::collection::hash_map(any::<u16>(), any::<i64>(), 0..100)) {
            let map = ConcurrentMap::from_map(entries.clone());
            map.update(|_, v| *v);
            prop_assert_eq!(map.as_map(), entries);
        }

        #[test]
        fn test_update_adds_key(entries in prop::collection::hash_map(any::<u16>(), any::<i64>(), 0..100)) {
            let map = ConcurrentMap::from_map(entries.clone());
            map.update(|k, v| v.wrapping_add(i64::from(*k)));

            for (k, v) in &entries {
                prop_assert_eq!(map.get(k), v.wrapping_add(i64::from(*k)));
            }
            prop_assert_eq!(map.len(), entries.len());
        }

        #[test]
        fn test_for_each_sees_every_key(entries in prop::collection::hash_map(any::<u16>(), any::<u32>(), 0..100)) {
            let map = ConcurrentMap::from_map(entries.clone());
            let mut seen = HashMap::new();
            map.for_each(|k, v, present| {
                assert!(present);
                seen.insert(*k, v);
            });
            prop_assert_eq!(seen, entries);
        }
    }
}

/// Property: JSON encoding round-trips faithful value types
mod json_properties {
    use super::*;

    proptest! {
        #[test]
        fn test_json_round_trip_integers(entries in prop::collection::hash_map(any::<u32>(), any::<i64>(), 1..50)) {
            let map = ConcurrentMap::from_map(entries.clone());
            let bytes = map.to_json().unwrap();
            let decoded: ConcurrentMap<u32, i64> = ConcurrentMap::from_json(&bytes).unwrap();
            prop_assert_eq!(decoded.as_map(), entries);
        }

        #[test]
        fn test_json_round_trip_strings(entries in prop::collection::hash_map("[a-z]{1,8}", ".{0,16}", 1..50)) {
            let map = ConcurrentMap::from_map(entries.clone());
            let json = map.to_json_string().unwrap();
            let decoded: ConcurrentMap<String, String> = ConcurrentMap::from_json_str(&json).unwrap();
            prop_assert_eq!(decoded.as_map(), entries);
        }
    }
}

/// Property: concurrent inserts of distinct keys are all retained
mod concurrent_properties {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn test_concurrent_inserts(
            batches in prop::collection::vec(prop::collection::vec(any::<u16>(), 0..50), 1..5)
        ) {
            let map: Arc<ConcurrentMap<u16, usize>> = Arc::new(ConcurrentMap::new());
            let mut handles = vec![];

            for (thread_id, batch) in batches.iter().cloned().enumerate() {
                let map = Arc::clone(&map);
                handles.push(thread::spawn(move || {
                    for key in batch {
                        map.set(key, thread_id);
                    }
                }));
            }

            for handle in handles {
                handle.join().unwrap();
            }

            let distinct: std::collections::HashSet<u16> = batches.iter().flatten().copied().collect();
            prop_assert_eq!(map.len(), distinct.len());
            for key in distinct {
                let (writer, present) = map.get_with_test(&key);
                prop_assert!(present);
                prop_assert!(batches[writer].contains(&key));
            }
        }
    }
}
