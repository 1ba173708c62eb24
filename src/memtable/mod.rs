//! MemTable Module
//!
//! In-memory ordered key space backing one column family.
//!
//! ## Responsibilities
//! - Fast point reads and writes in memory
//! - Single-writer/multi-reader access pattern
//! - Track approximate size
//! - Ordered positioning (seek / seek-for-prev / next / prev) for cursors
//!
//! ## Data Structure Choice
//! BTreeMap wrapped in RwLock:
//! - Ordered keys (required for prefix and range scans)
//! - Cursors re-enter the map per step instead of holding the lock,
//!   so a long scan never blocks writers

mod table;

pub use table::{MemTable, MemTableIterator};
