//! Collection Engines
//!
//! Redis-like collections projected onto flat keys of an ordered store.
//!
//! ## Responsibilities
//! - Per-instance metadata lifecycle (lazy creation, generation versions)
//! - List, Set, Map, SortedSet and Bitmap engines over any `Store`
//! - Namespaced engines (`Multi*`) plus single-instance facades
//! - Lazy iterators over `Result` items
//!
//! ## Write Path
//! ```text
//!   op(ns, ..)
//!       │
//!       ▼
//!   metadata [name][ns?] ──(absent)──► new generation, written now
//!       │
//!       ▼
//!   stage data keys (+ metadata update) into one local batch
//!       │
//!       ├── caller batch given ──► appended, committed by the caller
//!       └── otherwise          ──► Store::write (atomic)
//! ```
//!
//! Writers must be serialized per (name, namespace); instances under
//! different namespaces never share a key.

mod base;
mod bitmap;
mod facade;
mod list;
mod map;
mod set;
mod zset;

pub use bitmap::{MultiBitmap, MAX_BIT_INDEX};
pub use facade::{Bitmap, List, Map, Set, SortedSet};
pub use list::{ListIter, MultiList};
pub use map::{MapIter, MultiMap};
pub use set::{MultiSet, SetIter};
pub use zset::{MultiZSet, ZSetMembersIter, ZSetRangeIter};
