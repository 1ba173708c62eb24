//! Single-instance facades
//!
//! Each facade wraps the namespaced engine of the same kind and always
//! addresses the instance without a namespace (`[name]` alone). A facade
//! and a namespaced engine sharing a name never see each other's data.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::Arc;

use roaring::RoaringTreemap;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::{BincodeCodec, Codec};
use crate::config::Config;
use crate::error::Result;
use crate::store::{Store, WriteBatch};

use super::bitmap::MultiBitmap;
use super::list::{ListIter, MultiList};
use super::map::{MapIter, MultiMap};
use super::set::{MultiSet, SetIter};
use super::zset::{MultiZSet, ZSetMembersIter, ZSetRangeIter};

// =============================================================================
// List
// =============================================================================

/// A single list
pub struct List<T, C = BincodeCodec> {
    inner: MultiList<T, C>,
}

impl<T, C> List<T, C>
where
    T: Serialize + DeserializeOwned,
    C: Codec + Default,
{
    pub fn new(store: Arc<dyn Store>, name: impl Into<String>) -> Self {
        Self {
            inner: MultiList::new(store, name),
        }
    }
}

impl<T, C> List<T, C>
where
    T: Serialize + DeserializeOwned,
    C: Codec,
{
    pub fn with_codec(store: Arc<dyn Store>, name: impl Into<String>, codec: C) -> Self {
        Self {
            inner: MultiList::with_codec(store, name, codec),
        }
    }

    pub fn append(&self, value: &T) -> Result<()> {
        self.inner.append_in(None, std::slice::from_ref(value), None)
    }

    pub fn append_batch(&self, batch: &mut WriteBatch, values: &[T]) -> Result<()> {
        self.inner.append_in(None, values, Some(batch))
    }

    pub fn get(&self, index: u64) -> Result<Option<T>> {
        self.inner.get_in(None, index)
    }

    pub fn size(&self) -> Result<u64> {
        self.inner.size_in(None)
    }

    pub fn iter(&self) -> Result<ListIter<'_, T, C>> {
        self.inner.iter_in(None)
    }

    pub fn clear(&self) -> Result<()> {
        self.inner.clear_in(None)
    }
}

// =============================================================================
// Set
// =============================================================================

/// A single set
pub struct Set<T, C = BincodeCodec> {
    inner: MultiSet<T, C>,
}

impl<T, C> Set<T, C>
where
    T: Serialize + DeserializeOwned,
    C: Codec + Default,
{
    pub fn new(store: Arc<dyn Store>, name: impl Into<String>) -> Self {
        Self {
            inner: MultiSet::new(store, name),
        }
    }
}

impl<T, C> Set<T, C>
where
    T: Serialize + DeserializeOwned,
    C: Codec,
{
    pub fn with_codec(store: Arc<dyn Store>, name: impl Into<String>, codec: C) -> Self {
        Self {
            inner: MultiSet::with_codec(store, name, codec),
        }
    }

    pub fn add(&self, member: &T) -> Result<()> {
        self.inner.add_in(None, std::slice::from_ref(member), None)
    }

    pub fn add_batch(&self, batch: &mut WriteBatch, members: &[T]) -> Result<()> {
        self.inner.add_in(None, members, Some(batch))
    }

    pub fn contains(&self, member: &T) -> Result<bool> {
        self.inner.contains_in(None, member)
    }

    pub fn remove(&self, member: &T) -> Result<()> {
        self.inner.remove_in(None, std::slice::from_ref(member), None)
    }

    pub fn remove_batch(&self, batch: &mut WriteBatch, members: &[T]) -> Result<()> {
        self.inner.remove_in(None, members, Some(batch))
    }

    pub fn members(&self) -> Result<HashSet<T>>
    where
        T: Eq + Hash,
    {
        self.inner.members_iter_in(None)?.collect()
    }

    pub fn members_iter(&self) -> Result<SetIter<'_, T, C>> {
        self.inner.members_iter_in(None)
    }

    pub fn clear(&self) -> Result<()> {
        self.inner.clear_in(None)
    }
}

// =============================================================================
// Map
// =============================================================================

/// A single map
pub struct Map<K, V, C = BincodeCodec> {
    inner: MultiMap<K, V, C>,
}

impl<K, V, C> Map<K, V, C>
where
    K: Serialize + DeserializeOwned,
    V: Serialize + DeserializeOwned,
    C: Codec + Default,
{
    pub fn new(store: Arc<dyn Store>, name: impl Into<String>) -> Self {
        Self {
            inner: MultiMap::new(store, name),
        }
    }
}

impl<K, V, C> Map<K, V, C>
where
    K: Serialize + DeserializeOwned,
    V: Serialize + DeserializeOwned,
    C: Codec,
{
    pub fn with_codec(store: Arc<dyn Store>, name: impl Into<String>, codec: C) -> Self {
        Self {
            inner: MultiMap::with_codec(store, name, codec),
        }
    }

    pub fn put(&self, key: &K, value: &V) -> Result<()> {
        self.inner.put_in(None, &[(key, value)], None)
    }

    pub fn put_batch(&self, batch: &mut WriteBatch, entries: &[(K, V)]) -> Result<()> {
        let refs: Vec<(&K, &V)> = entries.iter().map(|(k, v)| (k, v)).collect();
        self.inner.put_in(None, &refs, Some(batch))
    }

    pub fn get(&self, key: &K) -> Result<Option<V>> {
        self.inner.get_in(None, key)
    }

    pub fn multi_get(&self, keys: &[K]) -> Result<Vec<Option<V>>> {
        self.inner.multi_get_in(None, keys)
    }

    pub fn contains(&self, key: &K) -> Result<bool> {
        self.inner.contains_in(None, key)
    }

    pub fn remove(&self, key: &K) -> Result<()> {
        self.inner.remove_in(None, std::slice::from_ref(key), None)
    }

    pub fn remove_batch(&self, batch: &mut WriteBatch, keys: &[K]) -> Result<()> {
        self.inner.remove_in(None, keys, Some(batch))
    }

    pub fn entries(&self) -> Result<HashMap<K, V>>
    where
        K: Eq + Hash,
    {
        self.inner.entries_iter_in(None)?.collect()
    }

    pub fn entries_iter(&self) -> Result<MapIter<'_, K, V, C>> {
        self.inner.entries_iter_in(None)
    }

    pub fn clear(&self) -> Result<()> {
        self.inner.clear_in(None)
    }
}

// =============================================================================
// SortedSet
// =============================================================================

/// A single sorted set
pub struct SortedSet<T, C = BincodeCodec> {
    inner: MultiZSet<T, C>,
}

impl<T, C> SortedSet<T, C>
where
    T: Serialize + DeserializeOwned,
    C: Codec + Default,
{
    pub fn new(store: Arc<dyn Store>, name: impl Into<String>) -> Self {
        Self {
            inner: MultiZSet::new(store, name),
        }
    }
}

impl<T, C> SortedSet<T, C>
where
    T: Serialize + DeserializeOwned,
    C: Codec,
{
    pub fn with_codec(store: Arc<dyn Store>, name: impl Into<String>, codec: C) -> Self {
        Self {
            inner: MultiZSet::with_codec(store, name, codec),
        }
    }

    pub fn add(&self, member: &T, score: i64) -> Result<()> {
        self.inner.add_in(None, &[(member, score)], None)
    }

    pub fn add_batch(&self, batch: &mut WriteBatch, members: &[(T, i64)]) -> Result<()> {
        let refs: Vec<(&T, i64)> = members.iter().map(|(m, s)| (m, *s)).collect();
        self.inner.add_in(None, &refs, Some(batch))
    }

    pub fn get_score(&self, member: &T) -> Result<Option<i64>> {
        self.inner.get_score_in(None, member)
    }

    pub fn contains(&self, member: &T) -> Result<bool> {
        Ok(self.inner.get_score_in(None, member)?.is_some())
    }

    pub fn remove(&self, member: &T) -> Result<()> {
        self.inner.remove_in(None, std::slice::from_ref(member), None)
    }

    pub fn remove_batch(&self, batch: &mut WriteBatch, members: &[T]) -> Result<()> {
        self.inner.remove_in(None, members, Some(batch))
    }

    pub fn members(&self) -> Result<HashSet<T>>
    where
        T: Eq + Hash,
    {
        self.inner
            .members_with_scores_iter_in(None)?
            .map(|entry| entry.map(|(member, _)| member))
            .collect()
    }

    pub fn members_with_scores(&self) -> Result<HashMap<T, i64>>
    where
        T: Eq + Hash,
    {
        self.inner.members_with_scores_iter_in(None)?.collect()
    }

    pub fn members_with_scores_iter(&self) -> Result<ZSetMembersIter<'_, T, C>> {
        self.inner.members_with_scores_iter_in(None)
    }

    pub fn members_in_range(&self, lo: i64, hi: i64) -> Result<Vec<(T, i64)>> {
        self.inner.range_iter_in(None, lo, hi)?.collect()
    }

    pub fn members_in_range_iter(&self, lo: i64, hi: i64) -> Result<ZSetRangeIter<'_, T, C>> {
        self.inner.range_iter_in(None, lo, hi)
    }

    pub fn members_in_range_reverse(&self, from: i64, to: i64) -> Result<Vec<(T, i64)>> {
        self.inner.reverse_range_iter_in(None, from, to)?.collect()
    }

    pub fn members_in_range_reverse_iter(
        &self,
        from: i64,
        to: i64,
    ) -> Result<ZSetRangeIter<'_, T, C>> {
        self.inner.reverse_range_iter_in(None, from, to)
    }

    pub fn clear(&self) -> Result<()> {
        self.inner.clear_in(None)
    }
}

// =============================================================================
// Bitmap
// =============================================================================

/// A single bitmap
pub struct Bitmap {
    inner: MultiBitmap,
}

impl Bitmap {
    pub fn new(store: Arc<dyn Store>, name: impl Into<String>) -> Self {
        Self {
            inner: MultiBitmap::new(store, name),
        }
    }

    pub fn with_fragment_size(
        store: Arc<dyn Store>,
        name: impl Into<String>,
        fragment_size: u32,
    ) -> Result<Self> {
        Ok(Self {
            inner: MultiBitmap::with_fragment_size(store, name, fragment_size)?,
        })
    }

    pub fn from_config(
        store: Arc<dyn Store>,
        name: impl Into<String>,
        config: &Config,
    ) -> Result<Self> {
        Ok(Self {
            inner: MultiBitmap::from_config(store, name, config)?,
        })
    }

    pub fn fragment_size(&self) -> u32 {
        self.inner.fragment_size()
    }

    pub fn set_bit(&self, bit: u64) -> Result<()> {
        self.inner.set_bits_in(None, &[bit], None)
    }

    pub fn set_bit_batch(&self, batch: &mut WriteBatch, bits: &[u64]) -> Result<()> {
        self.inner.set_bits_in(None, bits, Some(batch))
    }

    pub fn clear_bit(&self, bit: u64) -> Result<()> {
        self.inner.clear_bits_in(None, &[bit], None)
    }

    pub fn clear_bit_batch(&self, batch: &mut WriteBatch, bits: &[u64]) -> Result<()> {
        self.inner.clear_bits_in(None, bits, Some(batch))
    }

    pub fn get_bit(&self, bit: u64) -> Result<bool> {
        self.inner.get_bit_in(None, bit)
    }

    pub fn get_all_bits(&self) -> Result<RoaringTreemap> {
        self.inner.get_all_bits_in(None)
    }

    pub fn get_bits(&self, from_fragment: u64, to_fragment: u64) -> Result<RoaringTreemap> {
        self.inner.get_bits_in(None, from_fragment, to_fragment)
    }

    pub fn next_set_bit(&self, from: u64) -> Result<i64> {
        self.inner.next_set_bit_in(None, from)
    }

    pub fn previous_set_bit(&self, from: u64) -> Result<i64> {
        self.inner.previous_set_bit_in(None, from)
    }

    pub fn next_clear_bit(&self, from: u64) -> Result<i64> {
        self.inner.next_clear_bit_in(None, from)
    }

    pub fn previous_clear_bit(&self, from: u64) -> Result<i64> {
        self.inner.previous_clear_bit_in(None, from)
    }

    pub fn clear(&self) -> Result<()> {
        self.inner.clear_in(None)
    }
}
