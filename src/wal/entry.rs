//! WAL Entry definitions
//!
//! Defines the structure of individual WAL log entries.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{CollectionError, Result};

/// Record header: LSN (8) + CRC (4) + payload length (4)
pub const HEADER_SIZE: usize = 16;

/// Upper bound on one record payload; anything larger is treated as corruption
pub const MAX_PAYLOAD_SIZE: u32 = 256 * 1024 * 1024;

/// A single entry in the WAL
///
/// One entry is one atomic unit: every operation of a committed write
/// batch lands in the same entry, so recovery replays all of them or none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalEntry {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// The operations to apply, in order
    pub operations: Vec<Operation>,

    /// Timestamp (unix millis) when entry was created
    pub timestamp: u64,
}

/// Operations that can be logged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    /// Put a key-value pair into a column family
    Put {
        cf: String,
        key: Vec<u8>,
        value: Vec<u8>,
    },

    /// Delete a key from a column family
    Delete { cf: String, key: Vec<u8> },
}

impl Operation {
    pub fn cf(&self) -> &str {
        match self {
            Operation::Put { cf, .. } | Operation::Delete { cf, .. } => cf,
        }
    }

    pub fn key(&self) -> &[u8] {
        match self {
            Operation::Put { key, .. } | Operation::Delete { key, .. } => key,
        }
    }
}

impl WalEntry {
    pub fn new(lsn: u64, operations: Vec<Operation>) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Self {
            lsn,
            operations,
            timestamp,
        }
    }

    /// Serialize into an on-disk record: header followed by payload
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let payload = bincode::serialize(self)?;
        if payload.len() > MAX_PAYLOAD_SIZE as usize {
            return Err(CollectionError::Store(format!(
                "WAL record too large: {} bytes (max {})",
                payload.len(),
                MAX_PAYLOAD_SIZE
            )));
        }
        let crc = Self::compute_crc(self.lsn, &payload);

        let mut record = Vec::with_capacity(HEADER_SIZE + payload.len());
        record.extend_from_slice(&self.lsn.to_le_bytes());
        record.extend_from_slice(&crc.to_le_bytes());
        record.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        record.extend_from_slice(&payload);
        Ok(record)
    }

    /// Parse one complete record (header + payload), verifying its CRC
    pub fn deserialize(record: &[u8]) -> Result<Self> {
        if record.len() < HEADER_SIZE {
            return Err(CollectionError::WalCorruption(format!(
                "record shorter than header: {} bytes",
                record.len()
            )));
        }
        let header = RecordHeader::parse(&record[..HEADER_SIZE]);
        let payload = &record[HEADER_SIZE..];
        if payload.len() != header.len as usize {
            return Err(CollectionError::WalCorruption(format!(
                "payload length mismatch: header says {}, got {}",
                header.len,
                payload.len()
            )));
        }
        Self::decode_payload(&header, payload)
    }

    pub(crate) fn decode_payload(header: &RecordHeader, payload: &[u8]) -> Result<Self> {
        let actual = Self::compute_crc(header.lsn, payload);
        if actual != header.crc {
            return Err(CollectionError::WalCorruption(format!(
                "CRC mismatch at lsn {}: expected {:08x}, got {:08x}",
                header.lsn, header.crc, actual
            )));
        }

        let entry: WalEntry = bincode::deserialize(payload)
            .map_err(|e| CollectionError::WalCorruption(e.to_string()))?;
        if entry.lsn != header.lsn {
            return Err(CollectionError::WalCorruption(format!(
                "LSN mismatch: header {}, payload {}",
                header.lsn, entry.lsn
            )));
        }
        Ok(entry)
    }

    /// CRC32 over the LSN and payload bytes
    pub fn compute_crc(lsn: u64, payload: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&lsn.to_le_bytes());
        hasher.update(payload);
        hasher.finalize()
    }
}

/// Decoded fixed-size record header
#[derive(Debug, Clone, Copy)]
pub(crate) struct RecordHeader {
    pub lsn: u64,
    pub crc: u32,
    pub len: u32,
}

impl RecordHeader {
    /// `bytes` must be exactly HEADER_SIZE long
    pub(crate) fn parse(bytes: &[u8]) -> Self {
        let mut lsn = [0u8; 8];
        let mut crc = [0u8; 4];
        let mut len = [0u8; 4];
        lsn.copy_from_slice(&bytes[0..8]);
        crc.copy_from_slice(&bytes[8..12]);
        len.copy_from_slice(&bytes[12..16]);
        Self {
            lsn: u64::from_le_bytes(lsn),
            crc: u32::from_le_bytes(crc),
            len: u32::from_le_bytes(len),
        }
    }
}
