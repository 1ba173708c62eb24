//! # Atlas Collections
//!
//! Redis-like collections (list, set, map, sorted set, bitmap) embedded on
//! top of an ordered byte-wise key-value store, with:
//! - Length-prefixed composite keys (binary-safe names, namespaces, members)
//! - Per-instance metadata with generation versions (O(1) clear)
//! - Namespaces: many independent instances under one collection name
//! - Atomic write batches staged by collections, committed by callers
//! - A WAL-backed in-memory engine with column families and crash recovery
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │     List · Set · Map · SortedSet · Bitmap  (facades)        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  ns = None
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │  MultiList · MultiSet · MultiMap · MultiZSet · MultiBitmap  │
//! │        (metadata + key codec + value codec)                 │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  dyn Store
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │   Engine    │          │ColumnFamily │
//!   │ ("default") │          │  (named)    │
//!   └──────┬──────┘          └──────┬──────┘
//!          └────────────┬───────────┘
//!          ┌────────────┴────────────┐
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │     WAL     │          │  MemTables  │
//!   │  (Append)   │          │  (RwLock)   │
//!   └─────────────┘          └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use atlas_collections::{Engine, MultiZSet, Store};
//!
//! let store: Arc<dyn Store> = Arc::new(Engine::in_memory());
//! let board: MultiZSet<String> = MultiZSet::new(store, "leaderboard");
//!
//! board.add("eu", &"ada".to_string(), 42).unwrap();
//! board.add("eu", &"bob".to_string(), 7).unwrap();
//!
//! let top = board.members_in_range_reverse("eu", i64::MAX, i64::MIN).unwrap();
//! assert_eq!(top[0], ("ada".to_string(), 42));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod keys;
pub mod codec;
pub mod metadata;
pub mod store;

pub mod wal;
pub mod memtable;
pub mod engine;

pub mod collection;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{CollectionError, Result};
pub use config::{Config, ConfigBuilder, WalSyncStrategy};
pub use codec::{BincodeCodec, Codec, JsonCodec};
pub use store::{Cursor, Store, WriteBatch};
pub use engine::{ColumnFamily, Engine};
pub use collection::{
    Bitmap, List, Map, MultiBitmap, MultiList, MultiMap, MultiSet, MultiZSet, Set, SortedSet,
};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of atlas-collections
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
