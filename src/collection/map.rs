//! Map engine
//!
//! ```text
//! [name] [ns?] [version] [key] → value
//! ```

use std::collections::HashMap;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::{BincodeCodec, Codec};
use crate::error::Result;
use crate::metadata::MapMetadata;
use crate::store::{Store, WriteBatch};

use super::base::{CollectionBase, PrefixScan};
use super::set::decode_single_segment;

/// Maps sharing one name, each addressed by a namespace
pub struct MultiMap<K, V, C = BincodeCodec> {
    base: CollectionBase<MapMetadata>,
    codec: C,
    _entry: PhantomData<fn() -> (K, V)>,
}

impl<K, V, C> MultiMap<K, V, C>
where
    K: Serialize + DeserializeOwned,
    V: Serialize + DeserializeOwned,
    C: Codec + Default,
{
    pub fn new(store: Arc<dyn Store>, name: impl Into<String>) -> Self {
        Self::with_codec(store, name, C::default())
    }
}

impl<K, V, C> MultiMap<K, V, C>
where
    K: Serialize + DeserializeOwned,
    V: Serialize + DeserializeOwned,
    C: Codec,
{
    pub fn with_codec(store: Arc<dyn Store>, name: impl Into<String>, codec: C) -> Self {
        Self {
            base: CollectionBase::new(store, name.into()),
            codec,
            _entry: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        self.base.name()
    }

    pub fn put(&self, ns: impl AsRef<[u8]>, key: &K, value: &V) -> Result<()> {
        self.put_in(Some(ns.as_ref()), &[(key, value)], None)
    }

    pub fn put_batch(
        &self,
        ns: impl AsRef<[u8]>,
        batch: &mut WriteBatch,
        entries: &[(K, V)],
    ) -> Result<()> {
        let refs: Vec<(&K, &V)> = entries.iter().map(|(k, v)| (k, v)).collect();
        self.put_in(Some(ns.as_ref()), &refs, Some(batch))
    }

    pub fn get(&self, ns: impl AsRef<[u8]>, key: &K) -> Result<Option<V>> {
        self.get_in(Some(ns.as_ref()), key)
    }

    /// Values for `keys`, aligned with the input; `None` where absent
    pub fn multi_get(&self, ns: impl AsRef<[u8]>, keys: &[K]) -> Result<Vec<Option<V>>> {
        self.multi_get_in(Some(ns.as_ref()), keys)
    }

    pub fn contains(&self, ns: impl AsRef<[u8]>, key: &K) -> Result<bool> {
        self.contains_in(Some(ns.as_ref()), key)
    }

    pub fn remove(&self, ns: impl AsRef<[u8]>, key: &K) -> Result<()> {
        self.remove_in(Some(ns.as_ref()), std::slice::from_ref(key), None)
    }

    pub fn remove_batch(
        &self,
        ns: impl AsRef<[u8]>,
        batch: &mut WriteBatch,
        keys: &[K],
    ) -> Result<()> {
        self.remove_in(Some(ns.as_ref()), keys, Some(batch))
    }

    /// All entries, unordered
    pub fn entries(&self, ns: impl AsRef<[u8]>) -> Result<HashMap<K, V>>
    where
        K: Eq + Hash,
    {
        self.entries_iter(ns)?.collect()
    }

    /// Lazily iterate entries in encoded-key order
    pub fn entries_iter(&self, ns: impl AsRef<[u8]>) -> Result<MapIter<'_, K, V, C>> {
        self.entries_iter_in(Some(ns.as_ref()))
    }

    /// Drop every entry by starting a new generation
    pub fn clear(&self, ns: impl AsRef<[u8]>) -> Result<()> {
        self.clear_in(Some(ns.as_ref()))
    }

    // =========================================================================
    // Namespace-optional implementations (shared with the Map facade)
    // =========================================================================

    pub(crate) fn put_in(
        &self,
        ns: Option<&[u8]>,
        entries: &[(&K, &V)],
        batch: Option<&mut WriteBatch>,
    ) -> Result<()> {
        let metadata = self.base.create_metadata_if_absent(ns, batch.as_deref())?;
        let mut staged = WriteBatch::new();
        for (key, value) in entries {
            let entry_key = self.entry_key(ns, &metadata, key)?;
            self.base
                .stage_put(&mut staged, entry_key, self.codec.encode(*value)?);
        }
        self.base.apply(staged, batch)
    }

    pub(crate) fn get_in(&self, ns: Option<&[u8]>, key: &K) -> Result<Option<V>> {
        let Some(metadata) = self.base.get_metadata(ns)? else {
            return Ok(None);
        };
        match self.base.point_get(&self.entry_key(ns, &metadata, key)?)? {
            Some(bytes) => Ok(Some(self.codec.decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub(crate) fn multi_get_in(&self, ns: Option<&[u8]>, keys: &[K]) -> Result<Vec<Option<V>>> {
        let Some(metadata) = self.base.get_metadata(ns)? else {
            return Ok(keys.iter().map(|_| None).collect());
        };
        let entry_keys = keys
            .iter()
            .map(|key| self.entry_key(ns, &metadata, key))
            .collect::<Result<Vec<_>>>()?;

        self.base
            .multi_get(&entry_keys)?
            .into_iter()
            .map(|value| match value {
                Some(bytes) => self.codec.decode(&bytes).map(Some),
                None => Ok(None),
            })
            .collect()
    }

    pub(crate) fn contains_in(&self, ns: Option<&[u8]>, key: &K) -> Result<bool> {
        let Some(metadata) = self.base.get_metadata(ns)? else {
            return Ok(false);
        };
        Ok(self
            .base
            .point_get(&self.entry_key(ns, &metadata, key)?)?
            .is_some())
    }

    pub(crate) fn remove_in(
        &self,
        ns: Option<&[u8]>,
        keys: &[K],
        batch: Option<&mut WriteBatch>,
    ) -> Result<()> {
        let Some(metadata) = self.base.get_metadata(ns)? else {
            return Ok(());
        };
        let mut staged = WriteBatch::new();
        for key in keys {
            let entry_key = self.entry_key(ns, &metadata, key)?;
            self.base.stage_delete(&mut staged, entry_key);
        }
        self.base.apply(staged, batch)
    }

    pub(crate) fn entries_iter_in(&self, ns: Option<&[u8]>) -> Result<MapIter<'_, K, V, C>> {
        let scan = match self.base.get_metadata(ns)? {
            Some(metadata) => self.base.scan_prefix(self.base.data_key(ns, &metadata).build())?,
            None => PrefixScan::empty(),
        };
        Ok(MapIter {
            scan,
            codec: &self.codec,
            _entry: PhantomData,
        })
    }

    pub(crate) fn clear_in(&self, ns: Option<&[u8]>) -> Result<()> {
        self.base.new_generation(ns)?;
        Ok(())
    }

    fn entry_key(&self, ns: Option<&[u8]>, metadata: &MapMetadata, key: &K) -> Result<Vec<u8>> {
        Ok(self
            .base
            .data_key(ns, metadata)
            .append(self.codec.encode(key)?)
            .build())
    }
}

/// Lazy cursor over map entries
pub struct MapIter<'a, K, V, C> {
    scan: PrefixScan<'a>,
    codec: &'a C,
    _entry: PhantomData<fn() -> (K, V)>,
}

impl<K, V, C> Iterator for MapIter<'_, K, V, C>
where
    K: DeserializeOwned,
    V: DeserializeOwned,
    C: Codec,
{
    type Item = Result<(K, V)>;

    fn next(&mut self) -> Option<Self::Item> {
        let (suffix, value) = self.scan.next()?;
        let entry = decode_single_segment(&suffix).and_then(|key_bytes| {
            let key = self.codec.decode(&key_bytes)?;
            let value = self.codec.decode(&value)?;
            Ok((key, value))
        });
        Some(entry)
    }
}
