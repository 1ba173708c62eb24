//! Tests for WAL Recovery
//!
//! These tests verify:
//! - Recovery from a clean WAL (no corruption)
//! - Recovery from an empty WAL
//! - Recovery with partial writes (truncated tail)
//! - Recovery with corrupted entries (CRC mismatch)
//! - Verify mode (stats only, file untouched)

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use atlas_collections::config::WalSyncStrategy;
use atlas_collections::wal::{
    Operation, RecoveryResult, WalEntry, WalReader, WalRecord, WalRecovery, WalWriter, HEADER_SIZE,
};
use atlas_collections::CollectionError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_wal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("test.wal");
    (temp_dir, wal_path)
}

fn put(i: usize) -> Operation {
    Operation::Put {
        cf: "default".to_string(),
        key: format!("key{}", i).into_bytes(),
        value: format!("value{}", i).into_bytes(),
    }
}

/// Write entries using WalWriter (produces a well-formed WAL)
fn write_entries_via_writer(path: &PathBuf, count: usize) {
    let mut writer = WalWriter::open(path, WalSyncStrategy::EveryWrite).unwrap();
    for i in 0..count {
        writer.append(vec![put(i)]).unwrap();
    }
}

/// Serialized records for lsn 1..=count (for crafting corruption)
fn raw_records(count: usize) -> Vec<Vec<u8>> {
    (0..count)
        .map(|i| WalEntry::new(i as u64 + 1, vec![put(i)]).serialize().unwrap())
        .collect()
}

fn write_raw(path: &PathBuf, records: &[Vec<u8>]) {
    let mut file = File::create(path).unwrap();
    for record in records {
        file.write_all(record).unwrap();
    }
    file.sync_all().unwrap();
}

// =============================================================================
// Recover: Clean WAL Tests
// =============================================================================

#[test]
fn test_recover_clean_wal() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 5);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 5);
    assert_eq!(
        result,
        RecoveryResult {
            entries_recovered: 5,
            entries_corrupted: 0,
            last_lsn: 5,
            was_truncated: false,
        }
    );
    assert_eq!(entries[0].operations, vec![put(0)]);
}

#[test]
fn test_recover_empty_wal() {
    let (_temp, wal_path) = setup_temp_wal();
    File::create(&wal_path).unwrap();

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert!(entries.is_empty());
    assert_eq!(result, RecoveryResult::default());
}

// =============================================================================
// Recover: Partial Write Tests
// =============================================================================

#[test]
fn test_recover_truncates_partial_tail() {
    let (_temp, wal_path) = setup_temp_wal();
    let records = raw_records(3);
    let clean_len: usize = records[..2].iter().map(Vec::len).sum();

    let mut torn = records.clone();
    torn[2].truncate(records[2].len() - 3);
    write_raw(&wal_path, &torn);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 2);
    assert!(result.was_truncated);
    assert_eq!(result.last_lsn, 2);
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), clean_len as u64);
}

#[test]
fn test_recover_partial_header() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut records = raw_records(1);
    records.push(vec![0u8; HEADER_SIZE / 2]);
    write_raw(&wal_path, &records);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 1);
    assert!(result.was_truncated);
}

#[test]
fn test_writer_appends_cleanly_after_recovery() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut records = raw_records(2);
    records[1].truncate(HEADER_SIZE + 1);
    write_raw(&wal_path, &records);

    WalRecovery::recover(&wal_path).unwrap();
    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    assert_eq!(writer.append(vec![put(9)]).unwrap(), 2);
    drop(writer);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();
    assert_eq!(entries.len(), 2);
    assert!(!result.was_truncated);
}

// =============================================================================
// Recover: Corruption Tests
// =============================================================================

#[test]
fn test_recover_skips_crc_mismatch() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut records = raw_records(3);
    let last = records[1].len() - 1;
    records[1][last] ^= 0xFF;
    write_raw(&wal_path, &records);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    let lsns: Vec<u64> = entries.iter().map(|e| e.lsn).collect();
    assert_eq!(lsns, vec![1, 3]);
    assert_eq!(result.entries_corrupted, 1);
    assert!(!result.was_truncated);
}

#[test]
fn test_reader_reports_corruption_and_strict_iterator_fails() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut records = raw_records(2);
    records[0][HEADER_SIZE] ^= 0x01;
    write_raw(&wal_path, &records);

    let mut reader = WalReader::open(&wal_path).unwrap();
    assert!(matches!(
        reader.next_record().unwrap(),
        Some(WalRecord::Corrupted { offset: 0, .. })
    ));
    assert!(matches!(reader.next_record().unwrap(), Some(WalRecord::Valid(_))));
    assert!(reader.next_record().unwrap().is_none());

    let mut strict = WalReader::open(&wal_path).unwrap().entries();
    assert!(matches!(strict.next(), Some(Err(CollectionError::WalCorruption(_)))));
    assert!(strict.next().is_none());
}

#[test]
fn test_deserialize_rejects_length_mismatch() {
    let mut record = WalEntry::new(1, vec![put(0)]).serialize().unwrap();
    record.push(0);

    assert!(matches!(
        WalEntry::deserialize(&record),
        Err(CollectionError::WalCorruption(_))
    ));
}

// =============================================================================
// Verify Tests
// =============================================================================

#[test]
fn test_verify_does_not_modify_file() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 2);
    let mut file = OpenOptions::new().append(true).open(&wal_path).unwrap();
    file.write_all(&[1, 2, 3]).unwrap();
    drop(file);
    let len_before = fs::metadata(&wal_path).unwrap().len();

    let result = WalRecovery::verify(&wal_path).unwrap();

    assert_eq!(result.entries_recovered, 2);
    assert!(result.was_truncated);
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), len_before);
}
