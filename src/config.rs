//! Configuration for atlas-collections
//!
//! Centralized configuration with sensible defaults.

use std::collections::HashSet;
use std::path::PathBuf;

use crate::error::{CollectionError, Result};

/// Name of the column family that always exists
pub const DEFAULT_COLUMN_FAMILY: &str = "default";

/// Default number of bits per bitmap fragment
pub const DEFAULT_FRAGMENT_SIZE: u32 = 1000;

/// Main configuration for an Engine instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for the write-ahead log. `None` keeps everything in memory.
    /// Internal structure:
    ///   {data_dir}/
    ///     └── wal.log          (write-ahead log)
    pub data_dir: Option<PathBuf>,

    /// Named key spaces created at open (in addition to "default")
    pub column_families: Vec<String>,

    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync WAL
    pub wal_sync_strategy: WalSyncStrategy,

    // -------------------------------------------------------------------------
    // Collection Configuration
    // -------------------------------------------------------------------------
    /// Fragment size for bitmaps built with `MultiBitmap::from_config`
    pub bitmap_fragment_size: u32,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalSyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N uncommitted entries (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            column_families: Vec::new(),
            wal_sync_strategy: WalSyncStrategy::EveryNEntries { count: 100 },
            bitmap_fragment_size: DEFAULT_FRAGMENT_SIZE,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the configuration before an engine is opened
    pub fn validate(&self) -> Result<()> {
        if self.bitmap_fragment_size == 0 {
            return Err(CollectionError::Config(
                "bitmap_fragment_size must be greater than zero".to_string(),
            ));
        }

        if let WalSyncStrategy::EveryNEntries { count: 0 } = self.wal_sync_strategy {
            return Err(CollectionError::Config(
                "EveryNEntries count must be greater than zero".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for name in &self.column_families {
            if name.is_empty() {
                return Err(CollectionError::Config(
                    "column family name must not be empty".to_string(),
                ));
            }
            if name == DEFAULT_COLUMN_FAMILY || !seen.insert(name.as_str()) {
                return Err(CollectionError::Config(format!(
                    "duplicate column family: {}",
                    name
                )));
            }
        }

        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (enables the write-ahead log)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = Some(path.into());
        self
    }

    /// Add a named column family
    pub fn column_family(mut self, name: impl Into<String>) -> Self {
        self.config.column_families.push(name.into());
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Set the default bitmap fragment size (in bits)
    pub fn bitmap_fragment_size(mut self, bits: u32) -> Self {
        self.config.bitmap_fragment_size = bits;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
