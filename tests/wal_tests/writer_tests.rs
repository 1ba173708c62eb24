//! Tests for WAL Writer
//!
//! These tests verify:
//! - Writing batches to the WAL
//! - LSN generation and sequencing
//! - Sync strategies (EveryWrite, EveryNEntries)
//! - Truncation and checkpoint rewrite
//! - Integration with reader

use std::path::PathBuf;

use atlas_collections::config::WalSyncStrategy;
use atlas_collections::wal::{Operation, WalEntry, WalReader, WalWriter, HEADER_SIZE};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_wal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("test.wal");
    (temp_dir, wal_path)
}

fn put(key: &[u8], value: &[u8]) -> Operation {
    Operation::Put {
        cf: "default".to_string(),
        key: key.to_vec(),
        value: value.to_vec(),
    }
}

fn delete(key: &[u8]) -> Operation {
    Operation::Delete {
        cf: "default".to_string(),
        key: key.to_vec(),
    }
}

fn read_all(path: &PathBuf) -> Vec<WalEntry> {
    WalReader::open(path)
        .unwrap()
        .entries()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

// =============================================================================
// Basic Writing Tests
// =============================================================================

#[test]
fn test_write_single_entry() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    let lsn = writer.append(vec![put(b"key1", b"value1")]).unwrap();

    assert_eq!(lsn, 1);
    assert_eq!(writer.current_lsn(), 2);
}

#[test]
fn test_lsn_sequential() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    let lsn1 = writer.append(vec![put(b"a", b"1")]).unwrap();
    let lsn2 = writer.append(vec![put(b"b", b"2")]).unwrap();
    let lsn3 = writer.append(vec![delete(b"a")]).unwrap();

    assert_eq!((lsn1, lsn2, lsn3), (1, 2, 3));
    assert_eq!(writer.current_lsn(), 4);
}

#[test]
fn test_batch_is_one_entry() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    writer
        .append(vec![put(b"a", b"1"), put(b"b", b"2"), delete(b"c")])
        .unwrap();
    drop(writer);

    let entries = read_all(&wal_path);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].operations.len(), 3);
    assert_eq!(entries[0].operations[2], delete(b"c"));
}

#[test]
fn test_record_size_on_disk() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    writer.append(vec![put(b"k", b"v")]).unwrap();
    drop(writer);

    let expected = WalEntry::new(1, vec![put(b"k", b"v")]).serialize().unwrap();
    let on_disk = std::fs::read(&wal_path).unwrap();
    assert_eq!(on_disk.len(), expected.len());
    assert!(on_disk.len() > HEADER_SIZE);
}

// =============================================================================
// Reopen Tests
// =============================================================================

#[test]
fn test_reopen_continues_lsn() {
    let (_temp, wal_path) = setup_temp_wal();

    {
        let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
        writer.append(vec![put(b"a", b"1")]).unwrap();
        writer.append(vec![put(b"b", b"2")]).unwrap();
    }

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    assert_eq!(writer.current_lsn(), 3);
    assert_eq!(writer.append(vec![put(b"c", b"3")]).unwrap(), 3);

    let lsns: Vec<u64> = read_all(&wal_path).iter().map(|e| e.lsn).collect();
    assert_eq!(lsns, vec![1, 2, 3]);
}

#[test]
fn test_open_at_uses_given_lsn() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer = WalWriter::open_at(&wal_path, WalSyncStrategy::EveryWrite, 10).unwrap();
    assert_eq!(writer.append(vec![put(b"a", b"1")]).unwrap(), 10);
    assert_eq!(writer.path(), wal_path.as_path());
}

// =============================================================================
// Sync Strategy Tests
// =============================================================================

#[test]
fn test_every_write_leaves_nothing_uncommitted() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    writer.append(vec![put(b"a", b"1")]).unwrap();
    assert_eq!(writer.uncommitted_count(), 0);
}

#[test]
fn test_every_n_entries() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer =
        WalWriter::open(&wal_path, WalSyncStrategy::EveryNEntries { count: 3 }).unwrap();
    writer.append(vec![put(b"a", b"1")]).unwrap();
    writer.append(vec![put(b"b", b"2")]).unwrap();
    assert_eq!(writer.uncommitted_count(), 2);

    writer.append(vec![put(b"c", b"3")]).unwrap();
    assert_eq!(writer.uncommitted_count(), 0);

    writer.append(vec![put(b"d", b"4")]).unwrap();
    writer.sync().unwrap();
    assert_eq!(writer.uncommitted_count(), 0);
}

#[test]
fn test_unsynced_entries_are_readable_after_flush() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer =
        WalWriter::open(&wal_path, WalSyncStrategy::EveryNEntries { count: 100 }).unwrap();
    writer.append(vec![put(b"a", b"1")]).unwrap();

    assert_eq!(read_all(&wal_path).len(), 1);
}

// =============================================================================
// Truncate / Rewrite Tests
// =============================================================================

#[test]
fn test_truncate() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    writer.append(vec![put(b"a", b"1")]).unwrap();
    writer.truncate().unwrap();

    assert_eq!(std::fs::metadata(&wal_path).unwrap().len(), 0);
    assert!(read_all(&wal_path).is_empty());
}

#[test]
fn test_rewrite_replaces_log() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    for i in 0..5u8 {
        writer.append(vec![put(&[i], b"old")]).unwrap();
    }

    let lsn = writer.rewrite(vec![put(b"live", b"1")]).unwrap();
    assert_eq!(lsn, 6);

    writer.append(vec![put(b"after", b"2")]).unwrap();
    drop(writer);

    let entries = read_all(&wal_path);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].operations, vec![put(b"live", b"1")]);
    assert_eq!(entries[1].lsn, 7);
    assert!(!wal_path.with_extension("tmp").exists());
}

#[test]
fn test_empty_rewrite_keeps_lsn_sequence() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    for i in 0..3u8 {
        writer.append(vec![delete(&[i])]).unwrap();
    }
    let lsn = writer.rewrite(Vec::new()).unwrap();
    assert_eq!(lsn, 4);
    drop(writer);

    let entries = read_all(&wal_path);
    assert_eq!(entries.len(), 1);
    assert!(entries[0].operations.is_empty());

    let mut reopened = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    assert_eq!(reopened.current_lsn(), 5);
    assert_eq!(reopened.append(vec![put(b"k", b"v")]).unwrap(), 5);
}
