//! Tests for the Engine
//!
//! These tests verify:
//! - Basic operations through the `Store` interface
//! - Cursor positioning and stepping
//! - Atomic write batches across column families
//! - Durability: reopen replays the WAL
//! - Checkpoint rewrites the WAL without losing data
//! - Configuration validation

use std::fs;
use std::sync::Arc;

use atlas_collections::config::{Config, WalSyncStrategy};
use atlas_collections::{CollectionError, Cursor, Engine, MultiMap, MultiSet, Store, WriteBatch};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn durable_config(dir: &TempDir) -> Config {
    Config::builder()
        .data_dir(dir.path())
        .column_family("meta")
        .wal_sync_strategy(WalSyncStrategy::EveryWrite)
        .build()
}

fn collect_keys(engine: &Engine) -> Vec<Vec<u8>> {
    let mut cursor = engine.cursor().unwrap();
    cursor.seek_to_first();
    let mut keys = Vec::new();
    while cursor.valid() {
        keys.push(cursor.key().to_vec());
        cursor.next();
    }
    keys
}

// =============================================================================
// Basic Operations
// =============================================================================

#[test]
fn test_in_memory_put_get_delete() {
    let engine = Engine::in_memory();

    engine.put(b"k", b"v").unwrap();
    assert_eq!(engine.get(b"k").unwrap(), Some(b"v".to_vec()));

    engine.delete(b"k").unwrap();
    assert_eq!(engine.get(b"k").unwrap(), None);

    // deleting an absent key is fine
    engine.delete(b"k").unwrap();
    assert!(!engine.is_durable());
}

#[test]
fn test_multi_get_aligned() {
    let engine = Engine::in_memory();
    engine.put(b"a", b"1").unwrap();
    engine.put(b"c", b"3").unwrap();

    let values = engine
        .multi_get(&[b"a".to_vec(), b"b".to_vec(), b"c".to_vec()])
        .unwrap();
    assert_eq!(values, vec![Some(b"1".to_vec()), None, Some(b"3".to_vec())]);
}

// =============================================================================
// Cursor Tests
// =============================================================================

#[test]
fn test_cursor_forward_and_backward() {
    let engine = Engine::in_memory();
    for key in [b"a", b"c", b"e"] {
        engine.put(key, key).unwrap();
    }

    let mut cursor = engine.cursor().unwrap();
    cursor.seek(b"b");
    assert_eq!(cursor.key(), b"c");
    assert_eq!(cursor.value(), b"c");

    cursor.next();
    assert_eq!(cursor.key(), b"e");
    cursor.next();
    assert!(!cursor.valid());

    cursor.seek_for_prev(b"d");
    assert_eq!(cursor.key(), b"c");
    cursor.prev();
    assert_eq!(cursor.key(), b"a");
    cursor.prev();
    assert!(!cursor.valid());
    assert!(cursor.key().is_empty());

    cursor.seek_to_last();
    assert_eq!(cursor.key(), b"e");
}

#[test]
fn test_cursor_sees_writes_between_steps() {
    let engine = Engine::in_memory();
    engine.put(b"a", b"1").unwrap();
    engine.put(b"c", b"3").unwrap();

    let mut cursor = engine.cursor().unwrap();
    cursor.seek(b"a");
    engine.put(b"b", b"2").unwrap();
    cursor.next();

    assert_eq!(cursor.key(), b"b");
}

// =============================================================================
// Batch / Column Family Tests
// =============================================================================

#[test]
fn test_batch_applies_all_operations() {
    let engine = Engine::in_memory();
    engine.put(b"gone", b"x").unwrap();

    let mut batch = WriteBatch::new();
    engine.stage_put(&mut batch, b"a".to_vec(), b"1".to_vec());
    engine.stage_put(&mut batch, b"b".to_vec(), b"2".to_vec());
    engine.stage_delete(&mut batch, b"gone".to_vec());
    assert_eq!(batch.len(), 3);

    engine.write(batch).unwrap();
    assert_eq!(collect_keys(&engine), vec![b"a".to_vec(), b"b".to_vec()]);
}

#[test]
fn test_batch_with_unknown_column_family_applies_nothing() {
    let engine = Engine::in_memory();

    let mut batch = WriteBatch::new();
    batch.put("default", b"a".to_vec(), b"1".to_vec());
    batch.put("nope", b"b".to_vec(), b"2".to_vec());

    let err = engine.write(batch).unwrap_err();
    assert!(matches!(err, CollectionError::UnknownColumnFamily(name) if name == "nope"));
    assert_eq!(engine.get(b"a").unwrap(), None);
}

#[test]
fn test_column_families_are_isolated() {
    let engine = Arc::new(Engine::open(Config::builder().column_family("meta").build()).unwrap());
    let meta = engine.column_family("meta").unwrap();

    meta.put(b"k", b"meta").unwrap();
    engine.put(b"k", b"default").unwrap();

    assert_eq!(meta.get(b"k").unwrap(), Some(b"meta".to_vec()));
    assert_eq!(engine.get(b"k").unwrap(), Some(b"default".to_vec()));
    assert_eq!(engine.entry_count("meta").unwrap(), 1);
    assert_eq!(engine.column_families(), vec!["default".to_string(), "meta".to_string()]);
    assert!(engine.column_family("other").is_err());
}

#[test]
fn test_one_batch_spans_column_families() {
    let engine = Arc::new(Engine::open(Config::builder().column_family("meta").build()).unwrap());
    let meta = engine.column_family("meta").unwrap();

    let mut batch = WriteBatch::new();
    engine.stage_put(&mut batch, b"a".to_vec(), b"1".to_vec());
    meta.stage_put(&mut batch, b"b".to_vec(), b"2".to_vec());
    engine.write(batch).unwrap();

    assert_eq!(engine.get(b"a").unwrap(), Some(b"1".to_vec()));
    assert_eq!(meta.get(b"b").unwrap(), Some(b"2".to_vec()));
}

#[test]
fn test_batch_pending_sees_latest_write_per_family() {
    let engine = Arc::new(Engine::open(Config::builder().column_family("side").build()).unwrap());
    let side = engine.column_family("side").unwrap();
    assert_eq!(engine.cf_name(), "default");
    assert_eq!(side.cf_name(), "side");

    let mut batch = WriteBatch::new();
    engine.stage_put(&mut batch, b"k".to_vec(), b"1".to_vec());
    side.stage_put(&mut batch, b"k".to_vec(), b"side".to_vec());
    engine.stage_put(&mut batch, b"k".to_vec(), b"2".to_vec());
    engine.stage_delete(&mut batch, b"gone".to_vec());

    assert_eq!(batch.pending("default", b"k"), Some(Some(&b"2"[..])));
    assert_eq!(batch.pending("side", b"k"), Some(Some(&b"side"[..])));
    assert_eq!(batch.pending("default", b"gone"), Some(None));
    assert_eq!(batch.pending("default", b"untouched"), None);
}

// =============================================================================
// Durability Tests
// =============================================================================

#[test]
fn test_reopen_replays_wal() {
    let dir = TempDir::new().unwrap();

    {
        let engine = Arc::new(Engine::open(durable_config(&dir)).unwrap());
        let meta = engine.column_family("meta").unwrap();
        engine.put(b"a", b"1").unwrap();
        engine.put(b"b", b"2").unwrap();
        engine.delete(b"a").unwrap();
        meta.put(b"m", b"3").unwrap();
    }

    let engine = Arc::new(Engine::open(durable_config(&dir)).unwrap());
    assert!(engine.is_durable());
    assert_eq!(engine.get(b"a").unwrap(), None);
    assert_eq!(engine.get(b"b").unwrap(), Some(b"2".to_vec()));
    assert_eq!(
        engine.column_family("meta").unwrap().get(b"m").unwrap(),
        Some(b"3".to_vec())
    );
}

#[test]
fn test_collections_survive_reopen() {
    let dir = TempDir::new().unwrap();

    {
        let store: Arc<dyn Store> = Arc::new(Engine::open_path(dir.path()).unwrap());
        let map: MultiMap<String, u32> = MultiMap::new(Arc::clone(&store), "scores");
        map.put("ns", &"ada".to_string(), &7).unwrap();
        let set: MultiSet<u64> = MultiSet::new(store, "ids");
        set.add("ns", &42).unwrap();
    }

    let store: Arc<dyn Store> = Arc::new(Engine::open_path(dir.path()).unwrap());
    let map: MultiMap<String, u32> = MultiMap::new(Arc::clone(&store), "scores");
    let set: MultiSet<u64> = MultiSet::new(store, "ids");
    assert_eq!(map.get("ns", &"ada".to_string()).unwrap(), Some(7));
    assert!(set.contains("ns", &42).unwrap());
}

#[test]
fn test_reopen_after_torn_tail() {
    let dir = TempDir::new().unwrap();

    {
        let engine = Engine::open(durable_config(&dir)).unwrap();
        engine.put(b"a", b"1").unwrap();
        engine.put(b"b", b"2").unwrap();
        engine.close().unwrap();
    }

    let wal_path = dir.path().join("wal.log");
    let len = fs::metadata(&wal_path).unwrap().len();
    let file = fs::OpenOptions::new().write(true).open(&wal_path).unwrap();
    file.set_len(len - 2).unwrap();
    drop(file);

    let engine = Engine::open(durable_config(&dir)).unwrap();
    assert_eq!(engine.get(b"a").unwrap(), Some(b"1".to_vec()));
    assert_eq!(engine.get(b"b").unwrap(), None);

    engine.put(b"c", b"3").unwrap();
    drop(engine);

    let engine = Engine::open(durable_config(&dir)).unwrap();
    assert_eq!(engine.get(b"c").unwrap(), Some(b"3".to_vec()));
}

#[test]
fn test_checkpoint_compacts_wal() {
    let dir = TempDir::new().unwrap();
    let wal_path = dir.path().join("wal.log");

    {
        let engine = Arc::new(Engine::open(durable_config(&dir)).unwrap());
        for i in 0..50u32 {
            engine.put(b"hot", &i.to_be_bytes()).unwrap();
        }
        engine.column_family("meta").unwrap().put(b"m", b"1").unwrap();
        let before = fs::metadata(&wal_path).unwrap().len();

        engine.checkpoint().unwrap();
        assert!(fs::metadata(&wal_path).unwrap().len() < before);

        engine.put(b"after", b"x").unwrap();
    }

    let engine = Arc::new(Engine::open(durable_config(&dir)).unwrap());
    assert_eq!(engine.get(b"hot").unwrap(), Some(49u32.to_be_bytes().to_vec()));
    assert_eq!(engine.get(b"after").unwrap(), Some(b"x".to_vec()));
    assert_eq!(
        engine.column_family("meta").unwrap().get(b"m").unwrap(),
        Some(b"1".to_vec())
    );
}

#[test]
fn test_checkpoint_in_memory_is_noop() {
    let engine = Engine::in_memory();
    engine.put(b"a", b"1").unwrap();

    engine.checkpoint().unwrap();
    engine.sync().unwrap();
    assert_eq!(engine.data_dir(), None);
}

// =============================================================================
// Configuration Tests
// =============================================================================

#[test]
fn test_config_defaults() {
    let config = Config::default();

    assert!(config.data_dir.is_none());
    assert_eq!(config.bitmap_fragment_size, 1000);
    assert_eq!(config.wal_sync_strategy, WalSyncStrategy::EveryNEntries { count: 100 });
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_validation() {
    let zero_fragment = Config::builder().bitmap_fragment_size(0).build();
    assert!(matches!(zero_fragment.validate(), Err(CollectionError::Config(_))));

    let zero_sync = Config::builder()
        .wal_sync_strategy(WalSyncStrategy::EveryNEntries { count: 0 })
        .build();
    assert!(zero_sync.validate().is_err());

    let duplicate = Config::builder().column_family("a").column_family("a").build();
    assert!(duplicate.validate().is_err());

    let shadowing = Config::builder().column_family("default").build();
    assert!(matches!(Engine::open(shadowing), Err(CollectionError::Config(_))));
}
