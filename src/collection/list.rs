//! List engine
//!
//! Append-only list addressed by index.
//!
//! ```text
//! [name] [ns?] [version] [index u64 BE] → value
//! ```
//!
//! Indexes are fixed-width big-endian, so a prefix scan returns items in
//! insertion order.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::{BincodeCodec, Codec};
use crate::error::Result;
use crate::metadata::ListMetadata;
use crate::store::{Store, WriteBatch};

use super::base::{CollectionBase, PrefixScan};

/// Lists sharing one name, each addressed by a namespace
pub struct MultiList<T, C = BincodeCodec> {
    base: CollectionBase<ListMetadata>,
    codec: C,
    _value: PhantomData<fn() -> T>,
}

impl<T, C> MultiList<T, C>
where
    T: Serialize + DeserializeOwned,
    C: Codec + Default,
{
    pub fn new(store: Arc<dyn Store>, name: impl Into<String>) -> Self {
        Self::with_codec(store, name, C::default())
    }
}

impl<T, C> MultiList<T, C>
where
    T: Serialize + DeserializeOwned,
    C: Codec,
{
    pub fn with_codec(store: Arc<dyn Store>, name: impl Into<String>, codec: C) -> Self {
        Self {
            base: CollectionBase::new(store, name.into()),
            codec,
            _value: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        self.base.name()
    }

    /// Append a value at index `size`
    pub fn append(&self, ns: impl AsRef<[u8]>, value: &T) -> Result<()> {
        self.append_in(Some(ns.as_ref()), std::slice::from_ref(value), None)
    }

    /// Stage appends of `values` (in order) into `batch`
    ///
    /// Indexes continue from appends already staged into `batch`.
    pub fn append_batch(
        &self,
        ns: impl AsRef<[u8]>,
        batch: &mut WriteBatch,
        values: &[T],
    ) -> Result<()> {
        self.append_in(Some(ns.as_ref()), values, Some(batch))
    }

    /// Value at `index`, or None past the end
    pub fn get(&self, ns: impl AsRef<[u8]>, index: u64) -> Result<Option<T>> {
        self.get_in(Some(ns.as_ref()), index)
    }

    /// Number of appended values (0 for an unknown namespace)
    pub fn size(&self, ns: impl AsRef<[u8]>) -> Result<u64> {
        self.size_in(Some(ns.as_ref()))
    }

    /// Lazily iterate values in insertion order
    pub fn iter(&self, ns: impl AsRef<[u8]>) -> Result<ListIter<'_, T, C>> {
        self.iter_in(Some(ns.as_ref()))
    }

    /// Drop every value by starting a new generation
    pub fn clear(&self, ns: impl AsRef<[u8]>) -> Result<()> {
        self.clear_in(Some(ns.as_ref()))
    }

    // =========================================================================
    // Namespace-optional implementations (shared with the List facade)
    // =========================================================================

    pub(crate) fn append_in(
        &self,
        ns: Option<&[u8]>,
        values: &[T],
        batch: Option<&mut WriteBatch>,
    ) -> Result<()> {
        let mut metadata = self.base.create_metadata_if_absent(ns, batch.as_deref())?;

        let mut staged = WriteBatch::new();
        for value in values {
            let key = self.item_key(ns, &metadata, metadata.size);
            self.base
                .stage_put(&mut staged, key.clone(), self.codec.encode(value)?);
            metadata.size += 1;
            metadata.tail = Some(key);
        }
        if staged.is_empty() {
            return Ok(());
        }
        self.base.stage_metadata(&mut staged, ns, &metadata)?;

        self.base.apply(staged, batch)
    }

    pub(crate) fn get_in(&self, ns: Option<&[u8]>, index: u64) -> Result<Option<T>> {
        let Some(metadata) = self.base.get_metadata(ns)? else {
            return Ok(None);
        };
        match self.base.point_get(&self.item_key(ns, &metadata, index))? {
            Some(bytes) => Ok(Some(self.codec.decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub(crate) fn size_in(&self, ns: Option<&[u8]>) -> Result<u64> {
        Ok(self.base.get_metadata(ns)?.map(|m| m.size).unwrap_or(0))
    }

    pub(crate) fn iter_in(&self, ns: Option<&[u8]>) -> Result<ListIter<'_, T, C>> {
        let scan = match self.base.get_metadata(ns)? {
            Some(metadata) => self.base.scan_prefix(self.base.data_key(ns, &metadata).build())?,
            None => PrefixScan::empty(),
        };
        Ok(ListIter {
            scan,
            codec: &self.codec,
            _value: PhantomData,
        })
    }

    pub(crate) fn clear_in(&self, ns: Option<&[u8]>) -> Result<()> {
        self.base.new_generation(ns)?;
        Ok(())
    }

    fn item_key(&self, ns: Option<&[u8]>, metadata: &ListMetadata, index: u64) -> Vec<u8> {
        self.base.data_key(ns, metadata).append_u64(index).build()
    }
}

/// Lazy cursor over list values in index order
pub struct ListIter<'a, T, C> {
    scan: PrefixScan<'a>,
    codec: &'a C,
    _value: PhantomData<fn() -> T>,
}

impl<T, C> Iterator for ListIter<'_, T, C>
where
    T: DeserializeOwned,
    C: Codec,
{
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let (_, value) = self.scan.next()?;
        Some(self.codec.decode(&value))
    }
}
