//! Tests for the Map engine
//!
//! These tests verify:
//! - put / get / contains / remove
//! - multi_get order with None at misses
//! - entries and lazy entries iteration
//! - Batched put / remove and namespace isolation
//! - Maps over a named column family

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use atlas_collections::{Config, Engine, JsonCodec, Map, MultiMap, Store, WriteBatch};
use common::memory_store;
use proptest::prelude::*;

// =============================================================================
// Basic Operations
// =============================================================================

#[test]
fn test_put_get_overwrite() {
    let map: MultiMap<String, u64> = MultiMap::new(memory_store(), "counters");

    map.put("ns", &"hits".to_string(), &1).unwrap();
    map.put("ns", &"hits".to_string(), &2).unwrap();

    assert_eq!(map.get("ns", &"hits".to_string()).unwrap(), Some(2));
    assert_eq!(map.get("ns", &"misses".to_string()).unwrap(), None);
    assert!(map.contains("ns", &"hits".to_string()).unwrap());
    assert!(!map.contains("ns", &"misses".to_string()).unwrap());
}

#[test]
fn test_remove() {
    let map: MultiMap<u32, String> = MultiMap::new(memory_store(), "names");
    map.put("ns", &1, &"one".to_string()).unwrap();

    map.remove("ns", &1).unwrap();
    assert_eq!(map.get("ns", &1).unwrap(), None);
    assert!(!map.contains("ns", &1).unwrap());

    map.remove("ns", &1).unwrap();
    map.remove("nobody", &1).unwrap();
}

#[test]
fn test_empty_encoded_value_is_present() {
    #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Marker;

    let map: MultiMap<String, ()> = MultiMap::new(memory_store(), "flags");
    map.put("ns", &"k".to_string(), &()).unwrap();

    assert_eq!(map.get("ns", &"k".to_string()).unwrap(), Some(()));
    assert!(map.contains("ns", &"k".to_string()).unwrap());
    assert_eq!(
        map.multi_get("ns", &["k".to_string(), "z".to_string()]).unwrap(),
        vec![Some(()), None]
    );
    assert_eq!(map.entries("ns").unwrap().len(), 1);

    let markers: MultiMap<u8, Marker> = MultiMap::new(memory_store(), "markers");
    markers.put("ns", &1, &Marker).unwrap();
    assert_eq!(markers.get("ns", &1).unwrap(), Some(Marker));
}

// =============================================================================
// multi_get Tests
// =============================================================================

#[test]
fn test_multi_get_preserves_input_order() {
    let map: MultiMap<String, u32> = MultiMap::new(memory_store(), "m");
    map.put("ns", &"k1".to_string(), &1).unwrap();
    map.put("ns", &"k3".to_string(), &3).unwrap();

    let keys = ["k3".to_string(), "k2".to_string(), "k1".to_string()];
    assert_eq!(map.multi_get("ns", &keys).unwrap(), vec![Some(3), None, Some(1)]);
}

#[test]
fn test_multi_get_without_metadata_is_all_none() {
    let map: MultiMap<u8, u8> = MultiMap::new(memory_store(), "m");

    assert_eq!(map.multi_get("ghost", &[1, 2, 3]).unwrap(), vec![None, None, None]);
    assert!(map.multi_get("ghost", &[]).unwrap().is_empty());
}

// =============================================================================
// Iteration Tests
// =============================================================================

#[test]
fn test_entries() {
    let map: MultiMap<String, Vec<u8>> = MultiMap::new(memory_store(), "blobs");
    map.put("ns", &"a".to_string(), &vec![1]).unwrap();
    map.put("ns", &"b".to_string(), &vec![]).unwrap();
    map.put("other", &"c".to_string(), &vec![3]).unwrap();

    let entries = map.entries("ns").unwrap();
    assert_eq!(
        entries,
        HashMap::from([("a".to_string(), vec![1]), ("b".to_string(), vec![])])
    );
}

#[test]
fn test_entries_iter_in_encoded_key_order() {
    let map: MultiMap<u32, u32, JsonCodec> = MultiMap::new(memory_store(), "m");
    for k in [3u32, 1, 2] {
        map.put("ns", &k, &(k * 10)).unwrap();
    }

    let entries: Vec<(u32, u32)> = map.entries_iter("ns").unwrap().map(Result::unwrap).collect();
    assert_eq!(entries, vec![(1, 10), (2, 20), (3, 30)]);
}

// =============================================================================
// Batch / Namespace Tests
// =============================================================================

#[test]
fn test_put_batch_and_remove_batch() {
    let store = memory_store();
    let map: MultiMap<u32, u32> = MultiMap::new(Arc::clone(&store), "m");

    let mut batch = WriteBatch::new();
    map.put_batch("ns", &mut batch, &[(1, 1), (2, 4), (3, 9)]).unwrap();
    assert_eq!(map.get("ns", &1).unwrap(), None);
    store.write(batch).unwrap();
    assert_eq!(map.entries("ns").unwrap().len(), 3);

    let mut batch = WriteBatch::new();
    map.remove_batch("ns", &mut batch, &[1, 3]).unwrap();
    store.write(batch).unwrap();
    assert_eq!(map.entries("ns").unwrap(), HashMap::from([(2, 4)]));
}

#[test]
fn test_namespaces_are_isolated() {
    let map: MultiMap<String, String> = MultiMap::new(memory_store(), "profile");
    map.put("alice", &"email".to_string(), &"a@x".to_string()).unwrap();
    map.put("bob", &"email".to_string(), &"b@x".to_string()).unwrap();

    map.clear("alice").unwrap();

    assert_eq!(map.get("alice", &"email".to_string()).unwrap(), None);
    assert_eq!(map.get("bob", &"email".to_string()).unwrap(), Some("b@x".to_string()));
}

#[test]
fn test_map_on_column_family() {
    let engine = Arc::new(Engine::open(Config::builder().column_family("maps").build()).unwrap());
    let cf: Arc<dyn Store> = Arc::new(engine.column_family("maps").unwrap());
    let map: MultiMap<String, u32> = MultiMap::new(cf, "m");

    map.put("ns", &"k".to_string(), &1).unwrap();

    assert_eq!(map.get("ns", &"k".to_string()).unwrap(), Some(1));
    assert_eq!(engine.entry_count("maps").unwrap(), 2);
    assert_eq!(engine.entry_count("default").unwrap(), 0);
}

// =============================================================================
// Facade Tests
// =============================================================================

#[test]
fn test_map_facade() {
    let store = memory_store();
    let map: Map<String, u32> = Map::new(Arc::clone(&store), "settings");

    map.put(&"a".to_string(), &1).unwrap();
    let mut batch = WriteBatch::new();
    map.put_batch(&mut batch, &[("b".to_string(), 2)]).unwrap();
    store.write(batch).unwrap();

    assert_eq!(map.get(&"b".to_string()).unwrap(), Some(2));
    assert!(map.contains(&"a".to_string()).unwrap());
    assert_eq!(
        map.multi_get(&["b".to_string(), "z".to_string()]).unwrap(),
        vec![Some(2), None]
    );
    assert_eq!(map.entries_iter().unwrap().count(), 2);

    map.remove(&"a".to_string()).unwrap();
    let mut batch = WriteBatch::new();
    map.remove_batch(&mut batch, &["b".to_string()]).unwrap();
    store.write(batch).unwrap();
    assert!(map.entries().unwrap().is_empty());

    map.put(&"c".to_string(), &3).unwrap();
    map.clear().unwrap();
    assert_eq!(map.get(&"c".to_string()).unwrap(), None);
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn prop_multi_get_aligned_with_input(
        stored in proptest::collection::hash_map(any::<u16>(), any::<u32>(), 0..32),
        probes in proptest::collection::vec(any::<u16>(), 0..32),
    ) {
        let map: MultiMap<u16, u32> = MultiMap::new(memory_store(), "p");
        for (k, v) in &stored {
            map.put("ns", k, v).unwrap();
        }

        let expected: Vec<Option<u32>> = probes.iter().map(|k| stored.get(k).copied()).collect();
        prop_assert_eq!(map.multi_get("ns", &probes).unwrap(), expected);
    }
}
