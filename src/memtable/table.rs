//! MemTable implementation
//!
//! BTreeMap-based table with RwLock for concurrency.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

type Entry = (Vec<u8>, Vec<u8>);

/// Ordered in-memory key space for one column family
pub struct MemTable {
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    /// Approximate size in bytes (keys + values)
    size: AtomicUsize,
}

impl MemTable {
    /// Create a new empty MemTable
    pub fn new() -> Self {
        Self {
            data: RwLock::new(BTreeMap::new()),
            size: AtomicUsize::new(0),
        }
    }

    /// Get a value by key (read lock)
    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.data.read().get(key).cloned()
    }

    /// Put a key-value pair (write lock)
    ///
    /// Returns the new approximate size.
    pub fn put(&self, key: Vec<u8>, value: Vec<u8>) -> usize {
        let key_len = key.len();
        let added = key_len + value.len();
        let mut data = self.data.write();
        if let Some(old) = data.insert(key, value) {
            self.size.fetch_sub(key_len + old.len(), Ordering::Relaxed);
        }
        self.size.fetch_add(added, Ordering::Relaxed) + added
    }

    /// Delete a key (write lock)
    ///
    /// Returns true if the key was present.
    pub fn delete(&self, key: &[u8]) -> bool {
        let mut data = self.data.write();
        match data.remove(key) {
            Some(old) => {
                self.size.fetch_sub(key.len() + old.len(), Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    /// Get approximate size in bytes
    pub fn size(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }

    /// Get entry count
    pub fn entry_count(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// First entry with key >= `key`
    pub fn seek(&self, key: &[u8]) -> Option<Entry> {
        self.first_in((Bound::Included(key), Bound::Unbounded))
    }

    /// Last entry with key <= `key`
    pub fn seek_for_prev(&self, key: &[u8]) -> Option<Entry> {
        self.last_in((Bound::Unbounded, Bound::Included(key)))
    }

    /// First entry with key strictly greater than `key`
    pub fn next_after(&self, key: &[u8]) -> Option<Entry> {
        self.first_in((Bound::Excluded(key), Bound::Unbounded))
    }

    /// Last entry with key strictly less than `key`
    pub fn prev_before(&self, key: &[u8]) -> Option<Entry> {
        self.last_in((Bound::Unbounded, Bound::Excluded(key)))
    }

    pub fn first(&self) -> Option<Entry> {
        self.first_in((Bound::Unbounded, Bound::Unbounded))
    }

    pub fn last(&self) -> Option<Entry> {
        self.last_in((Bound::Unbounded, Bound::Unbounded))
    }

    /// Snapshot of all entries in sorted key order
    pub fn iter(&self) -> MemTableIterator {
        let entries: Vec<Entry> = self
            .data
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        MemTableIterator {
            inner: entries.into_iter(),
        }
    }

    /// Clear all entries
    pub fn clear(&self) {
        self.data.write().clear();
        self.size.store(0, Ordering::Relaxed);
    }

    fn first_in(&self, range: (Bound<&[u8]>, Bound<&[u8]>)) -> Option<Entry> {
        self.data
            .read()
            .range::<[u8], _>(range)
            .next()
            .map(|(k, v)| (k.clone(), v.clone()))
    }

    fn last_in(&self, range: (Bound<&[u8]>, Bound<&[u8]>)) -> Option<Entry> {
        self.data
            .read()
            .range::<[u8], _>(range)
            .next_back()
            .map(|(k, v)| (k.clone(), v.clone()))
    }
}

impl Default for MemTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over a MemTable snapshot
pub struct MemTableIterator {
    inner: std::vec::IntoIter<Entry>,
}

impl Iterator for MemTableIterator {
    type Item = (Vec<u8>, Vec<u8>);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}
