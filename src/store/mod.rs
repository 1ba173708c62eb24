//! Store Module
//!
//! The ordered byte-wise key-value interface every collection is built on.
//!
//! ## Responsibilities
//! - Point get / put / delete
//! - Atomic write batches (staged by collections, committed by callers)
//! - Ordered cursors with seek, seek-for-prev, next and prev
//!
//! Collections only ever talk to `dyn Store`; [`Engine`](crate::Engine) and
//! [`ColumnFamily`](crate::engine::ColumnFamily) are the shipped implementations.

mod batch;

pub use batch::WriteBatch;

use crate::error::Result;

/// Ordered key-value store
pub trait Store: Send + Sync {
    /// Get a value by key
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Get several values, aligned with `keys`
    fn multi_get(&self, keys: &[Vec<u8>]) -> Result<Vec<Option<Vec<u8>>>> {
        keys.iter().map(|k| self.get(k)).collect()
    }

    /// Put a key-value pair (applied immediately)
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Delete a key (applied immediately, absent keys are fine)
    fn delete(&self, key: &[u8]) -> Result<()>;

    /// Apply every operation of `batch` atomically
    fn write(&self, batch: WriteBatch) -> Result<()>;

    /// Column family this store reads and stages into
    fn cf_name(&self) -> &str;

    /// Stage a put into `batch`, tagged with this store's key space
    fn stage_put(&self, batch: &mut WriteBatch, key: Vec<u8>, value: Vec<u8>);

    /// Stage a delete into `batch`, tagged with this store's key space
    fn stage_delete(&self, batch: &mut WriteBatch, key: Vec<u8>);

    /// Open a cursor over this store's key space
    ///
    /// The cursor starts unpositioned (invalid); dropping it releases it.
    fn cursor(&self) -> Result<Box<dyn Cursor + '_>>;
}

/// Bidirectional ordered cursor
pub trait Cursor {
    /// Position at the first key >= `key`
    fn seek(&mut self, key: &[u8]);

    /// Position at the last key <= `key`
    fn seek_for_prev(&mut self, key: &[u8]);

    fn seek_to_first(&mut self);

    fn seek_to_last(&mut self);

    /// Advance to the next key (no-op when invalid)
    fn next(&mut self);

    /// Step back to the previous key (no-op when invalid)
    fn prev(&mut self);

    /// True while the cursor points at an entry
    fn valid(&self) -> bool;

    /// Current key; empty when invalid
    fn key(&self) -> &[u8];

    /// Current value; empty when invalid
    fn value(&self) -> &[u8];
}
