//! WAL Recovery
//!
//! Handles crash recovery by replaying the WAL.

use std::fs::OpenOptions;
use std::path::Path;

use tracing::warn;

use crate::error::Result;

use super::reader::{WalReader, WalRecord};
use super::WalEntry;

/// Handles WAL recovery after crash
pub struct WalRecovery;

/// Result of a recovery operation
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of entries successfully recovered
    pub entries_recovered: u64,

    /// Number of corrupted entries skipped
    pub entries_corrupted: u64,

    /// Last valid LSN
    pub last_lsn: u64,

    /// Whether the WAL was truncated (partial writes removed)
    pub was_truncated: bool,
}

impl WalRecovery {
    /// Recover entries from a WAL file
    ///
    /// This will:
    /// 1. Read all valid entries
    /// 2. Detect and skip corrupted entries
    /// 3. Truncate partial writes at end
    /// 4. Return all valid entries in order
    pub fn recover(path: &Path) -> Result<(Vec<WalEntry>, RecoveryResult)> {
        let (entries, mut result, torn_at) = Self::scan(path, true)?;

        if let Some(offset) = torn_at {
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(offset)?;
            file.sync_all()?;
            result.was_truncated = true;
            warn!(offset, "truncated partial WAL record");
        }

        Ok((entries, result))
    }

    /// Verify integrity of a WAL file without modifying it
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        let (_, mut result, torn_at) = Self::scan(path, false)?;
        result.was_truncated = torn_at.is_some();
        Ok(result)
    }

    fn scan(path: &Path, keep: bool) -> Result<(Vec<WalEntry>, RecoveryResult, Option<u64>)> {
        let mut reader = WalReader::open(path)?;
        let mut entries = Vec::new();
        let mut result = RecoveryResult::default();
        let mut torn_at = None;

        while let Some(record) = reader.next_record()? {
            match record {
                WalRecord::Valid(entry) => {
                    result.entries_recovered += 1;
                    result.last_lsn = result.last_lsn.max(entry.lsn);
                    if keep {
                        entries.push(entry);
                    }
                }
                WalRecord::Corrupted { offset, reason } => {
                    result.entries_corrupted += 1;
                    warn!(offset, %reason, "skipping corrupted WAL record");
                }
                WalRecord::Torn { offset } => {
                    torn_at = Some(offset);
                }
            }
        }

        Ok((entries, result, torn_at))
    }
}
