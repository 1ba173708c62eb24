//! Write-Ahead Log (WAL) Module
//!
//! Provides durability guarantees through append-only logging.
//!
//! ## Responsibilities
//! - Append one log entry per committed write (single op or whole batch)
//! - CRC32 checksums for corruption detection
//! - Log Sequence Numbers (LSN) for ordering
//! - Crash recovery and replay
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Entry 1                                 │
//! │ ┌─────────┬─────────┬────────┬────────┐ │
//! │ │ LSN (8) │ CRC (4) │Len (4) │ Data   │ │
//! │ └─────────┴─────────┴────────┴────────┘ │
//! ├─────────────────────────────────────────┤
//! │ Entry 2                                 │
//! │ ┌─────────┬─────────┬────────┬────────┐ │
//! │ │ LSN (8) │ CRC (4) │Len (4) │ Data   │ │
//! │ └─────────┴─────────┴────────┴────────┘ │
//! └─────────────────────────────────────────┘
//! ```
//!
//! Integers are little-endian. Data is the bincode encoding of [`WalEntry`];
//! the CRC covers the LSN bytes and Data.

mod entry;
mod reader;
mod recovery;
mod writer;

pub use entry::{Operation, WalEntry, HEADER_SIZE, MAX_PAYLOAD_SIZE};
pub use reader::{WalIterator, WalReader, WalRecord};
pub use recovery::{RecoveryResult, WalRecovery};
pub use writer::WalWriter;
