//! WAL Reader
//!
//! Handles reading entries from the WAL file.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use crate::error::{CollectionError, Result};

use super::entry::{RecordHeader, HEADER_SIZE, MAX_PAYLOAD_SIZE};
use super::WalEntry;

/// Outcome of reading one record
#[derive(Debug)]
pub enum WalRecord {
    /// CRC-verified entry
    Valid(WalEntry),

    /// Complete record whose checksum or payload did not verify
    Corrupted { offset: u64, reason: String },

    /// Incomplete record at the end of the file (partial write)
    Torn { offset: u64 },
}

/// Reads entries from the WAL file
pub struct WalReader {
    file: BufReader<File>,
    /// Offset of the next unread record
    position: u64,
    file_len: u64,
    done: bool,
}

impl WalReader {
    /// Open a WAL file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();
        Ok(Self {
            file: BufReader::new(file),
            position: 0,
            file_len,
            done: false,
        })
    }

    /// Offset just past the last record returned (valid or corrupted)
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Read the next record, classifying torn tails and corruption
    pub fn next_record(&mut self) -> Result<Option<WalRecord>> {
        if self.done || self.position >= self.file_len {
            return Ok(None);
        }

        let offset = self.position;

        let mut header_bytes = [0u8; HEADER_SIZE];
        if !self.read_full(&mut header_bytes)? {
            self.done = true;
            return Ok(Some(WalRecord::Torn { offset }));
        }
        let header = RecordHeader::parse(&header_bytes);

        let remaining = self.file_len - offset - HEADER_SIZE as u64;
        if header.len > MAX_PAYLOAD_SIZE || header.len as u64 > remaining {
            // A length we cannot trust means nothing after it can be framed
            self.done = true;
            return Ok(Some(WalRecord::Torn { offset }));
        }

        let mut payload = vec![0u8; header.len as usize];
        if !self.read_full(&mut payload)? {
            self.done = true;
            return Ok(Some(WalRecord::Torn { offset }));
        }

        self.position = offset + HEADER_SIZE as u64 + header.len as u64;

        match WalEntry::decode_payload(&header, &payload) {
            Ok(entry) => Ok(Some(WalRecord::Valid(entry))),
            Err(CollectionError::WalCorruption(reason)) => {
                Ok(Some(WalRecord::Corrupted { offset, reason }))
            }
            Err(e) => Err(e),
        }
    }

    /// Read the next valid entry, failing on corruption
    pub fn next_entry(&mut self) -> Result<Option<WalEntry>> {
        match self.next_record()? {
            None => Ok(None),
            Some(WalRecord::Valid(entry)) => Ok(Some(entry)),
            Some(WalRecord::Corrupted { offset, reason }) => Err(CollectionError::WalCorruption(
                format!("record at offset {}: {}", offset, reason),
            )),
            Some(WalRecord::Torn { offset }) => Err(CollectionError::WalCorruption(format!(
                "partial record at offset {}",
                offset
            ))),
        }
    }

    /// Iterate over all entries, stopping at the first error
    pub fn entries(self) -> WalIterator {
        WalIterator {
            reader: self,
            failed: false,
        }
    }

    /// Returns false on clean EOF before the buffer was filled
    fn read_full(&mut self, buf: &mut [u8]) -> Result<bool> {
        match self.file.read_exact(buf) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Iterator over WAL entries
pub struct WalIterator {
    reader: WalReader,
    failed: bool,
}

impl Iterator for WalIterator {
    type Item = Result<WalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.reader.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
