//! WAL Writer
//!
//! Handles appending entries to the WAL file.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config::WalSyncStrategy;
use crate::error::Result;

use super::reader::{WalReader, WalRecord};
use super::{Operation, WalEntry};

/// Writes entries to the WAL file
pub struct WalWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    /// LSN that the next append will receive
    current_lsn: u64,
    sync_strategy: WalSyncStrategy,
    /// Entries appended since the last fsync
    uncommitted: usize,
}

impl WalWriter {
    /// Open or create a WAL file, continuing after its last valid LSN
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let mut last_lsn = 0;
        if path.exists() {
            let mut reader = WalReader::open(path)?;
            while let Some(record) = reader.next_record()? {
                if let WalRecord::Valid(entry) = record {
                    last_lsn = last_lsn.max(entry.lsn);
                }
            }
        }
        Self::open_at(path, sync_strategy, last_lsn + 1)
    }

    /// Open or create a WAL file with an explicit next LSN
    ///
    /// Used after recovery, which already knows the last valid LSN.
    pub fn open_at(path: &Path, sync_strategy: WalSyncStrategy, next_lsn: u64) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            current_lsn: next_lsn.max(1),
            sync_strategy,
            uncommitted: 0,
        })
    }

    /// Append one atomic entry holding `operations`
    ///
    /// Returns the LSN assigned to the entry.
    pub fn append(&mut self, operations: Vec<Operation>) -> Result<u64> {
        let lsn = self.current_lsn;
        let record = WalEntry::new(lsn, operations).serialize()?;

        self.writer.write_all(&record)?;
        self.current_lsn += 1;
        self.uncommitted += 1;

        match self.sync_strategy {
            WalSyncStrategy::EveryWrite => self.sync()?,
            WalSyncStrategy::EveryNEntries { count } => {
                if self.uncommitted >= count {
                    self.sync()?;
                } else {
                    self.writer.flush()?;
                }
            }
        }

        Ok(lsn)
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        self.uncommitted = 0;
        Ok(())
    }

    /// Drop every record (LSNs keep increasing)
    pub fn truncate(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().set_len(0)?;
        self.writer.get_ref().sync_all()?;
        self.uncommitted = 0;
        Ok(())
    }

    /// Atomically replace the log with a single entry holding `operations`
    ///
    /// The replacement is written to a sibling file and renamed over the
    /// original, so a crash leaves either the old or the new log intact.
    /// The entry is written even when `operations` is empty, so the LSN
    /// sequence survives a reopen.
    pub fn rewrite(&mut self, operations: Vec<Operation>) -> Result<u64> {
        self.writer.flush()?;

        let tmp_path = self.path.with_extension("tmp");
        let lsn = self.current_lsn;
        {
            let mut tmp = File::create(&tmp_path)?;
            tmp.write_all(&WalEntry::new(lsn, operations).serialize()?)?;
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;

        let file = OpenOptions::new().append(true).open(&self.path)?;
        self.writer = BufWriter::new(file);
        self.current_lsn += 1;
        self.uncommitted = 0;
        Ok(lsn)
    }

    /// Get the LSN the next append will receive
    pub fn current_lsn(&self) -> u64 {
        self.current_lsn
    }

    /// Entries appended since the last fsync
    pub fn uncommitted_count(&self) -> usize {
        self.uncommitted
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
