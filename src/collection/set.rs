//! Set engine
//!
//! Membership-only collection; every member is one zero-length entry.
//!
//! ```text
//! [name] [ns?] [version] [member] → ()
//! ```

use std::collections::HashSet;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::{BincodeCodec, Codec};
use crate::error::{CollectionError, Result};
use crate::keys::decode;
use crate::metadata::SetMetadata;
use crate::store::{Store, WriteBatch};

use super::base::{CollectionBase, PrefixScan};

/// Sets sharing one name, each addressed by a namespace
pub struct MultiSet<T, C = BincodeCodec> {
    base: CollectionBase<SetMetadata>,
    codec: C,
    _member: PhantomData<fn() -> T>,
}

impl<T, C> MultiSet<T, C>
where
    T: Serialize + DeserializeOwned,
    C: Codec + Default,
{
    pub fn new(store: Arc<dyn Store>, name: impl Into<String>) -> Self {
        Self::with_codec(store, name, C::default())
    }
}

impl<T, C> MultiSet<T, C>
where
    T: Serialize + DeserializeOwned,
    C: Codec,
{
    pub fn with_codec(store: Arc<dyn Store>, name: impl Into<String>, codec: C) -> Self {
        Self {
            base: CollectionBase::new(store, name.into()),
            codec,
            _member: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        self.base.name()
    }

    pub fn add(&self, ns: impl AsRef<[u8]>, member: &T) -> Result<()> {
        self.add_in(Some(ns.as_ref()), std::slice::from_ref(member), None)
    }

    pub fn add_batch(
        &self,
        ns: impl AsRef<[u8]>,
        batch: &mut WriteBatch,
        members: &[T],
    ) -> Result<()> {
        self.add_in(Some(ns.as_ref()), members, Some(batch))
    }

    pub fn contains(&self, ns: impl AsRef<[u8]>, member: &T) -> Result<bool> {
        self.contains_in(Some(ns.as_ref()), member)
    }

    pub fn remove(&self, ns: impl AsRef<[u8]>, member: &T) -> Result<()> {
        self.remove_in(Some(ns.as_ref()), std::slice::from_ref(member), None)
    }

    pub fn remove_batch(
        &self,
        ns: impl AsRef<[u8]>,
        batch: &mut WriteBatch,
        members: &[T],
    ) -> Result<()> {
        self.remove_in(Some(ns.as_ref()), members, Some(batch))
    }

    /// All members, unordered
    pub fn members(&self, ns: impl AsRef<[u8]>) -> Result<HashSet<T>>
    where
        T: Eq + Hash,
    {
        self.members_iter(ns)?.collect()
    }

    /// Lazily iterate members in encoded-byte order
    pub fn members_iter(&self, ns: impl AsRef<[u8]>) -> Result<SetIter<'_, T, C>> {
        self.members_iter_in(Some(ns.as_ref()))
    }

    /// Drop every member by starting a new generation
    pub fn clear(&self, ns: impl AsRef<[u8]>) -> Result<()> {
        self.clear_in(Some(ns.as_ref()))
    }

    // =========================================================================
    // Namespace-optional implementations (shared with the Set facade)
    // =========================================================================

    pub(crate) fn add_in(
        &self,
        ns: Option<&[u8]>,
        members: &[T],
        batch: Option<&mut WriteBatch>,
    ) -> Result<()> {
        let metadata = self.base.create_metadata_if_absent(ns, batch.as_deref())?;
        let mut staged = WriteBatch::new();
        for member in members {
            let key = self.member_key(ns, &metadata, member)?;
            self.base.stage_put(&mut staged, key, Vec::new());
        }
        self.base.apply(staged, batch)
    }

    pub(crate) fn contains_in(&self, ns: Option<&[u8]>, member: &T) -> Result<bool> {
        let Some(metadata) = self.base.get_metadata(ns)? else {
            return Ok(false);
        };
        let key = self.member_key(ns, &metadata, member)?;
        Ok(self.base.point_get(&key)?.is_some())
    }

    pub(crate) fn remove_in(
        &self,
        ns: Option<&[u8]>,
        members: &[T],
        batch: Option<&mut WriteBatch>,
    ) -> Result<()> {
        let Some(metadata) = self.base.get_metadata(ns)? else {
            return Ok(());
        };
        let mut staged = WriteBatch::new();
        for member in members {
            let key = self.member_key(ns, &metadata, member)?;
            self.base.stage_delete(&mut staged, key);
        }
        self.base.apply(staged, batch)
    }

    pub(crate) fn members_iter_in(&self, ns: Option<&[u8]>) -> Result<SetIter<'_, T, C>> {
        let scan = match self.base.get_metadata(ns)? {
            Some(metadata) => self.base.scan_prefix(self.base.data_key(ns, &metadata).build())?,
            None => PrefixScan::empty(),
        };
        Ok(SetIter {
            scan,
            codec: &self.codec,
            _member: PhantomData,
        })
    }

    pub(crate) fn clear_in(&self, ns: Option<&[u8]>) -> Result<()> {
        self.base.new_generation(ns)?;
        Ok(())
    }

    fn member_key(&self, ns: Option<&[u8]>, metadata: &SetMetadata, member: &T) -> Result<Vec<u8>> {
        Ok(self
            .base
            .data_key(ns, metadata)
            .append(self.codec.encode(member)?)
            .build())
    }
}

/// Lazy cursor over set members
///
/// Finite and not restartable; call `members_iter` again to re-seek.
pub struct SetIter<'a, T, C> {
    scan: PrefixScan<'a>,
    codec: &'a C,
    _member: PhantomData<fn() -> T>,
}

impl<T, C> Iterator for SetIter<'_, T, C>
where
    T: DeserializeOwned,
    C: Codec,
{
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let (suffix, _) = self.scan.next()?;
        Some(decode_single_segment(&suffix).and_then(|bytes| self.codec.decode(&bytes)))
    }
}

/// Decode a key suffix that must hold exactly one segment
pub(crate) fn decode_single_segment(suffix: &[u8]) -> Result<Vec<u8>> {
    let mut parts = decode(suffix)?;
    if parts.len() != 1 {
        return Err(CollectionError::MalformedKey(format!(
            "expected 1 trailing segment, found {}",
            parts.len()
        )));
    }
    Ok(parts.remove(0))
}
