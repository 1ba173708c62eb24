//! Engine Module
//!
//! The embedded ordered key-value store collections are built on.
//!
//! ## Responsibilities
//! - Own one MemTable per column family
//! - Log every committed write to the WAL before applying it
//! - Replay the WAL on startup (crash recovery)
//! - Hand out cursors and column-family scoped handles

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::config::{Config, DEFAULT_COLUMN_FAMILY};
use crate::error::{CollectionError, Result};
use crate::memtable::MemTable;
use crate::store::{Cursor, Store, WriteBatch};
use crate::wal::{Operation, WalRecovery, WalWriter};

/// The main storage engine
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// - **Writes** (put/delete/write/checkpoint): Serialized by `write_lock`
///   - Only ONE write operation at a time
///   - Must acquire: write_lock → WAL → memtable
///
/// - **Reads** (get/cursor): Concurrent
///   - No write_lock needed
///   - MemTable uses internal RwLock (many concurrent readers)
///
/// A batch is logged as a single WAL entry and applied under one
/// write_lock hold, so readers on other threads may observe a batch
/// half-applied but recovery never does.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Column family name → ordered table (fixed at open)
    tables: HashMap<String, MemTable>,

    /// Write-ahead log, absent for in-memory engines
    wal: Option<Mutex<WalWriter>>,

    /// Serializes write operations
    write_lock: Mutex<()>,
}

impl Engine {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const WAL_FILENAME: &'static str = "wal.log";

    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Validate config, create column families
    /// 2. Open/create data directory (if durable)
    /// 3. Recover from WAL if exists, replaying into the memtables
    /// 4. Ready to serve requests
    pub fn open(config: Config) -> Result<Self> {
        // Step 1: Validate and create tables
        config.validate()?;
        let mut tables = HashMap::new();
        tables.insert(DEFAULT_COLUMN_FAMILY.to_string(), MemTable::new());
        for name in &config.column_families {
            tables.insert(name.clone(), MemTable::new());
        }

        // Step 2: In-memory engines have no WAL
        let Some(data_dir) = config.data_dir.clone() else {
            debug!(column_families = tables.len(), "opened in-memory engine");
            return Ok(Self {
                config,
                tables,
                wal: None,
                write_lock: Mutex::new(()),
            });
        };

        fs::create_dir_all(&data_dir)?;
        let wal_path = data_dir.join(Self::WAL_FILENAME);

        // Step 3: Recover from WAL if it exists
        let mut next_lsn = 1;
        if wal_path.exists() {
            let (entries, recovery_result) = WalRecovery::recover(&wal_path)?;

            if recovery_result.entries_recovered > 0 || recovery_result.entries_corrupted > 0 {
                info!(
                    recovered = recovery_result.entries_recovered,
                    corrupted = recovery_result.entries_corrupted,
                    last_lsn = recovery_result.last_lsn,
                    truncated = recovery_result.was_truncated,
                    "WAL recovery complete"
                );
            }

            for entry in entries {
                for operation in entry.operations {
                    Self::apply_to(&tables, operation)?;
                }
            }
            next_lsn = recovery_result.last_lsn + 1;
        }

        let wal = WalWriter::open_at(&wal_path, config.wal_sync_strategy, next_lsn)?;
        info!(data_dir = %data_dir.display(), "engine opened");

        Ok(Self {
            config,
            tables,
            wal: Some(Mutex::new(wal)),
            write_lock: Mutex::new(()),
        })
    }

    /// Open a durable engine at a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    /// Open a purely in-memory engine with only the default column family
    pub fn in_memory() -> Self {
        Self {
            config: Config::default(),
            tables: HashMap::from([(DEFAULT_COLUMN_FAMILY.to_string(), MemTable::new())]),
            wal: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Handle scoped to a named column family
    pub fn column_family(self: &Arc<Self>, name: &str) -> Result<ColumnFamily> {
        self.table(name)?;
        Ok(ColumnFamily {
            engine: Arc::clone(self),
            name: name.to_string(),
        })
    }

    // =========================================================================
    // Column-family scoped operations
    // =========================================================================

    pub fn get_cf(&self, cf: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.table(cf)?.get(key))
    }

    pub fn put_cf(&self, cf: &str, key: &[u8], value: &[u8]) -> Result<()> {
        self.commit(vec![Operation::Put {
            cf: cf.to_string(),
            key: key.to_vec(),
            value: value.to_vec(),
        }])
    }

    pub fn delete_cf(&self, cf: &str, key: &[u8]) -> Result<()> {
        self.commit(vec![Operation::Delete {
            cf: cf.to_string(),
            key: key.to_vec(),
        }])
    }

    pub fn cursor_cf(&self, cf: &str) -> Result<EngineCursor<'_>> {
        Ok(EngineCursor {
            table: self.table(cf)?,
            current: None,
        })
    }

    /// Rewrite the WAL as one entry holding the live contents
    ///
    /// Keeps the log from growing without bound; no-op for in-memory engines.
    pub fn checkpoint(&self) -> Result<()> {
        let Some(wal) = &self.wal else {
            return Ok(());
        };
        let _write_guard = self.write_lock.lock();

        let mut operations = Vec::new();
        for (cf, table) in &self.tables {
            for (key, value) in table.iter() {
                operations.push(Operation::Put {
                    cf: cf.clone(),
                    key,
                    value,
                });
            }
        }

        let count = operations.len();
        let lsn = wal.lock().rewrite(operations)?;
        info!(entries = count, lsn, "WAL checkpoint written");
        Ok(())
    }

    /// Force the WAL to disk
    pub fn sync(&self) -> Result<()> {
        if let Some(wal) = &self.wal {
            wal.lock().sync()?;
        }
        Ok(())
    }

    /// Close the engine gracefully
    pub fn close(self) -> Result<()> {
        self.sync()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the data directory path (None for in-memory engines)
    pub fn data_dir(&self) -> Option<&Path> {
        self.config.data_dir.as_deref()
    }

    pub fn is_durable(&self) -> bool {
        self.wal.is_some()
    }

    /// Number of live keys in a column family
    pub fn entry_count(&self, cf: &str) -> Result<usize> {
        Ok(self.table(cf)?.entry_count())
    }

    /// Names of all column families, sorted
    pub fn column_families(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.keys().cloned().collect();
        names.sort();
        names
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn table(&self, cf: &str) -> Result<&MemTable> {
        self.tables
            .get(cf)
            .ok_or_else(|| CollectionError::UnknownColumnFamily(cf.to_string()))
    }

    /// Log then apply a group of operations as one atomic unit
    fn commit(&self, operations: Vec<Operation>) -> Result<()> {
        if operations.is_empty() {
            return Ok(());
        }

        // Reject the whole unit before anything is logged
        for operation in &operations {
            self.table(operation.cf())?;
        }

        let _write_guard = self.write_lock.lock();

        // Step 1: Write to WAL first (durability guarantee)
        if let Some(wal) = &self.wal {
            wal.lock().append(operations.clone())?;
        }

        // Step 2: Apply to memtables
        for operation in operations {
            Self::apply_to(&self.tables, operation)?;
        }

        Ok(())
    }

    fn apply_to(tables: &HashMap<String, MemTable>, operation: Operation) -> Result<()> {
        match operation {
            Operation::Put { cf, key, value } => {
                let table = tables
                    .get(&cf)
                    .ok_or(CollectionError::UnknownColumnFamily(cf))?;
                table.put(key, value);
            }
            Operation::Delete { cf, key } => {
                let table = tables
                    .get(&cf)
                    .ok_or(CollectionError::UnknownColumnFamily(cf))?;
                table.delete(&key);
            }
        }
        Ok(())
    }
}

impl Store for Engine {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.get_cf(DEFAULT_COLUMN_FAMILY, key)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.put_cf(DEFAULT_COLUMN_FAMILY, key, value)
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.delete_cf(DEFAULT_COLUMN_FAMILY, key)
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        self.commit(batch.into_operations())
    }

    fn cf_name(&self) -> &str {
        DEFAULT_COLUMN_FAMILY
    }

    fn stage_put(&self, batch: &mut WriteBatch, key: Vec<u8>, value: Vec<u8>) {
        batch.put(DEFAULT_COLUMN_FAMILY, key, value);
    }

    fn stage_delete(&self, batch: &mut WriteBatch, key: Vec<u8>) {
        batch.delete(DEFAULT_COLUMN_FAMILY, key);
    }

    fn cursor(&self) -> Result<Box<dyn Cursor + '_>> {
        Ok(Box::new(self.cursor_cf(DEFAULT_COLUMN_FAMILY)?))
    }
}

// =============================================================================
// Column Family Handle
// =============================================================================

/// A `Store` view of one named column family
#[derive(Clone)]
pub struct ColumnFamily {
    engine: Arc<Engine>,
    name: String,
}

impl ColumnFamily {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }
}

impl Store for ColumnFamily {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.engine.get_cf(&self.name, key)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.engine.put_cf(&self.name, key, value)
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.engine.delete_cf(&self.name, key)
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        self.engine.commit(batch.into_operations())
    }

    fn cf_name(&self) -> &str {
        &self.name
    }

    fn stage_put(&self, batch: &mut WriteBatch, key: Vec<u8>, value: Vec<u8>) {
        batch.put(self.name.as_str(), key, value);
    }

    fn stage_delete(&self, batch: &mut WriteBatch, key: Vec<u8>) {
        batch.delete(self.name.as_str(), key);
    }

    fn cursor(&self) -> Result<Box<dyn Cursor + '_>> {
        Ok(Box::new(self.engine.cursor_cf(&self.name)?))
    }
}

// =============================================================================
// Cursor
// =============================================================================

/// Cursor over one column family
///
/// Holds a copy of the current entry and re-positions through the table
/// on every step, so it never pins the table lock between calls.
pub struct EngineCursor<'a> {
    table: &'a MemTable,
    current: Option<(Vec<u8>, Vec<u8>)>,
}

impl Cursor for EngineCursor<'_> {
    fn seek(&mut self, key: &[u8]) {
        self.current = self.table.seek(key);
    }

    fn seek_for_prev(&mut self, key: &[u8]) {
        self.current = self.table.seek_for_prev(key);
    }

    fn seek_to_first(&mut self) {
        self.current = self.table.first();
    }

    fn seek_to_last(&mut self) {
        self.current = self.table.last();
    }

    fn next(&mut self) {
        if let Some((key, _)) = &self.current {
            self.current = self.table.next_after(key);
        }
    }

    fn prev(&mut self) {
        if let Some((key, _)) = &self.current {
            self.current = self.table.prev_before(key);
        }
    }

    fn valid(&self) -> bool {
        self.current.is_some()
    }

    fn key(&self) -> &[u8] {
        self.current.as_ref().map(|(k, _)| k.as_slice()).unwrap_or_default()
    }

    fn value(&self) -> &[u8] {
        self.current.as_ref().map(|(_, v)| v.as_slice()).unwrap_or_default()
    }
}
