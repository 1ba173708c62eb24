//! Bitmap engine
//!
//! One logical bit space `0..=i64::MAX`, cut into fixed-size fragments.
//! Each fragment is a serialized roaring bitmap of local offsets.
//!
//! ```text
//! [name] [ns?] [version] [fragment u64 BE] → roaring blob
//!
//! bit i ─► fragment = i / fragment_size
//!          local    = i % fragment_size
//! ```
//!
//! Fragment keys are fixed width, so a cursor walks fragments in index
//! order and skips fragments that were never written. A missing fragment
//! reads as all clear.
//!
//! ## Search contract
//! - `next_set_bit` / `previous_set_bit` look only at fragments
//!   `0..=max_fragment_index` and return -1 when nothing is found
//! - `next_clear_bit` always succeeds (never-written space is clear)
//! - `previous_clear_bit` returns -1 only when every bit down to 0 is set

use std::collections::BTreeMap;
use std::sync::Arc;

use roaring::{RoaringBitmap, RoaringTreemap};
use tracing::trace;

use crate::config::{Config, DEFAULT_FRAGMENT_SIZE};
use crate::error::{CollectionError, Result};
use crate::keys::{decode_u64, has_prefix, strip_prefix};
use crate::metadata::BitmapMetadata;
use crate::store::{Cursor, Store, WriteBatch};

use super::base::CollectionBase;
use super::set::decode_single_segment;

/// Highest addressable bit (search results are reported as i64)
pub const MAX_BIT_INDEX: u64 = i64::MAX as u64;

/// Bitmaps sharing one name, each addressed by a namespace
pub struct MultiBitmap {
    base: CollectionBase<BitmapMetadata>,
    fragment_size: u32,
}

impl MultiBitmap {
    /// Bitmap with the default fragment size
    pub fn new(store: Arc<dyn Store>, name: impl Into<String>) -> Self {
        Self {
            base: CollectionBase::new(store, name.into()),
            fragment_size: DEFAULT_FRAGMENT_SIZE,
        }
    }

    /// Bitmap with `fragment_size` bits per fragment
    ///
    /// The fragment size is part of the persisted layout: reopen a bitmap
    /// with the size it was written with.
    pub fn with_fragment_size(
        store: Arc<dyn Store>,
        name: impl Into<String>,
        fragment_size: u32,
    ) -> Result<Self> {
        if fragment_size == 0 {
            return Err(CollectionError::Config(
                "bitmap fragment size must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            base: CollectionBase::new(store, name.into()),
            fragment_size,
        })
    }

    /// Bitmap using `config.bitmap_fragment_size`
    pub fn from_config(
        store: Arc<dyn Store>,
        name: impl Into<String>,
        config: &Config,
    ) -> Result<Self> {
        Self::with_fragment_size(store, name, config.bitmap_fragment_size)
    }

    pub fn name(&self) -> &str {
        self.base.name()
    }

    pub fn fragment_size(&self) -> u32 {
        self.fragment_size
    }

    pub fn set_bit(&self, ns: impl AsRef<[u8]>, bit: u64) -> Result<()> {
        self.set_bits_in(Some(ns.as_ref()), &[bit], None)
    }

    /// Stage setting `bits` into `batch`
    ///
    /// Fragments already staged into `batch` are updated, not replaced.
    pub fn set_bit_batch(
        &self,
        ns: impl AsRef<[u8]>,
        batch: &mut WriteBatch,
        bits: &[u64],
    ) -> Result<()> {
        self.set_bits_in(Some(ns.as_ref()), bits, Some(batch))
    }

    pub fn clear_bit(&self, ns: impl AsRef<[u8]>, bit: u64) -> Result<()> {
        self.clear_bits_in(Some(ns.as_ref()), &[bit], None)
    }

    pub fn clear_bit_batch(
        &self,
        ns: impl AsRef<[u8]>,
        batch: &mut WriteBatch,
        bits: &[u64],
    ) -> Result<()> {
        self.clear_bits_in(Some(ns.as_ref()), bits, Some(batch))
    }

    pub fn get_bit(&self, ns: impl AsRef<[u8]>, bit: u64) -> Result<bool> {
        self.get_bit_in(Some(ns.as_ref()), bit)
    }

    /// Every set bit, as global indexes
    pub fn get_all_bits(&self, ns: impl AsRef<[u8]>) -> Result<RoaringTreemap> {
        self.get_all_bits_in(Some(ns.as_ref()))
    }

    /// Set bits of fragments `from_fragment..=to_fragment`, as global indexes
    pub fn get_bits(
        &self,
        ns: impl AsRef<[u8]>,
        from_fragment: u64,
        to_fragment: u64,
    ) -> Result<RoaringTreemap> {
        self.get_bits_in(Some(ns.as_ref()), from_fragment, to_fragment)
    }

    /// First set bit `>= from`, or -1
    pub fn next_set_bit(&self, ns: impl AsRef<[u8]>, from: u64) -> Result<i64> {
        self.next_set_bit_in(Some(ns.as_ref()), from)
    }

    /// Last set bit `<= from`, or -1
    pub fn previous_set_bit(&self, ns: impl AsRef<[u8]>, from: u64) -> Result<i64> {
        self.previous_set_bit_in(Some(ns.as_ref()), from)
    }

    /// First clear bit `>= from`
    pub fn next_clear_bit(&self, ns: impl AsRef<[u8]>, from: u64) -> Result<i64> {
        self.next_clear_bit_in(Some(ns.as_ref()), from)
    }

    /// Last clear bit `<= from`, or -1
    pub fn previous_clear_bit(&self, ns: impl AsRef<[u8]>, from: u64) -> Result<i64> {
        self.previous_clear_bit_in(Some(ns.as_ref()), from)
    }

    /// Drop every bit by starting a new generation
    pub fn clear(&self, ns: impl AsRef<[u8]>) -> Result<()> {
        self.clear_in(Some(ns.as_ref()))
    }

    // =========================================================================
    // Namespace-optional implementations (shared with the Bitmap facade)
    // =========================================================================

    pub(crate) fn set_bits_in(
        &self,
        ns: Option<&[u8]>,
        bits: &[u64],
        batch: Option<&mut WriteBatch>,
    ) -> Result<()> {
        let by_fragment = self.group_by_fragment(bits)?;
        if by_fragment.is_empty() {
            return Ok(());
        }
        let pending = batch.as_deref();
        let mut metadata = self.base.create_metadata_if_absent(ns, pending)?;
        let mut staged = WriteBatch::new();

        // Step 1: Load, update and stage each touched fragment once
        for (fragment, locals) in &by_fragment {
            let key = self.fragment_key(ns, &metadata, *fragment);
            let mut bitmap = self.load_fragment(pending, &key)?.unwrap_or_default();
            bitmap.extend(locals.iter().copied());
            self.base.stage_put(&mut staged, key, encode_fragment(&bitmap)?);
        }

        // Step 2: Raise the high-water mark in the same unit
        if let Some(highest) = by_fragment.keys().next_back().copied() {
            if highest > metadata.max_fragment_index {
                metadata.max_fragment_index = highest;
                self.base.stage_metadata(&mut staged, ns, &metadata)?;
            }
        }

        trace!(collection = %self.base.name(), fragments = by_fragment.len(), "set bits");
        self.base.apply(staged, batch)
    }

    pub(crate) fn clear_bits_in(
        &self,
        ns: Option<&[u8]>,
        bits: &[u64],
        batch: Option<&mut WriteBatch>,
    ) -> Result<()> {
        let by_fragment = self.group_by_fragment(bits)?;
        let pending = batch.as_deref();
        let Some(metadata) = self.base.pending_metadata(ns, pending)? else {
            return Ok(());
        };
        let mut staged = WriteBatch::new();

        for (fragment, locals) in &by_fragment {
            let key = self.fragment_key(ns, &metadata, *fragment);
            let Some(mut bitmap) = self.load_fragment(pending, &key)? else {
                continue;
            };
            for local in locals {
                bitmap.remove(*local);
            }
            if bitmap.is_empty() {
                self.base.stage_delete(&mut staged, key);
            } else {
                self.base.stage_put(&mut staged, key, encode_fragment(&bitmap)?);
            }
        }

        self.base.apply(staged, batch)
    }

    pub(crate) fn get_bit_in(&self, ns: Option<&[u8]>, bit: u64) -> Result<bool> {
        let Some(metadata) = self.base.get_metadata(ns)? else {
            return Ok(false);
        };
        let (fragment, local) = self.locate(bit);
        let key = self.fragment_key(ns, &metadata, fragment);
        Ok(self
            .load_fragment(None, &key)?
            .is_some_and(|bitmap| bitmap.contains(local)))
    }

    pub(crate) fn get_all_bits_in(&self, ns: Option<&[u8]>) -> Result<RoaringTreemap> {
        match self.base.get_metadata(ns)? {
            Some(metadata) => self.collect_bits(ns, &metadata, 0, metadata.max_fragment_index),
            None => Ok(RoaringTreemap::new()),
        }
    }

    pub(crate) fn get_bits_in(
        &self,
        ns: Option<&[u8]>,
        from_fragment: u64,
        to_fragment: u64,
    ) -> Result<RoaringTreemap> {
        match self.base.get_metadata(ns)? {
            Some(metadata) if from_fragment <= to_fragment => {
                self.collect_bits(ns, &metadata, from_fragment, to_fragment)
            }
            _ => Ok(RoaringTreemap::new()),
        }
    }

    pub(crate) fn next_set_bit_in(&self, ns: Option<&[u8]>, from: u64) -> Result<i64> {
        let Some(metadata) = self.base.get_metadata(ns)? else {
            return Ok(-1);
        };
        let (start_fragment, start_local) = self.locate(from);
        if start_fragment > metadata.max_fragment_index {
            return Ok(-1);
        }

        let prefix = self.base.data_key(ns, &metadata).build();
        let mut cursor = self.base.store().cursor()?;
        cursor.seek(&self.fragment_key(ns, &metadata, start_fragment));

        while let Some((fragment, bitmap)) = current_fragment(&*cursor, &prefix)? {
            if fragment > metadata.max_fragment_index {
                break;
            }
            let lower = if fragment == start_fragment { start_local } else { 0 };
            if let Some(local) = first_set_at_or_after(&bitmap, lower) {
                return Ok(self.global_index(fragment, local));
            }
            cursor.next();
        }
        Ok(-1)
    }

    pub(crate) fn previous_set_bit_in(&self, ns: Option<&[u8]>, from: u64) -> Result<i64> {
        let Some(metadata) = self.base.get_metadata(ns)? else {
            return Ok(-1);
        };
        let (mut start_fragment, mut start_local) = self.locate(from);
        if start_fragment > metadata.max_fragment_index {
            start_fragment = metadata.max_fragment_index;
            start_local = self.fragment_size - 1;
        }

        let prefix = self.base.data_key(ns, &metadata).build();
        let mut cursor = self.base.store().cursor()?;
        cursor.seek_for_prev(&self.fragment_key(ns, &metadata, start_fragment));

        while let Some((fragment, bitmap)) = current_fragment(&*cursor, &prefix)? {
            let upper = if fragment == start_fragment {
                start_local
            } else {
                self.fragment_size - 1
            };
            if let Some(local) = last_set_at_or_before(&bitmap, upper) {
                return Ok(self.global_index(fragment, local));
            }
            cursor.prev();
        }
        Ok(-1)
    }

    pub(crate) fn next_clear_bit_in(&self, ns: Option<&[u8]>, from: u64) -> Result<i64> {
        let Some(metadata) = self.base.get_metadata(ns)? else {
            return Ok(to_i64(from));
        };
        let (mut fragment, mut lower) = self.locate(from);

        loop {
            // Nothing was ever written past the high-water mark
            if fragment > metadata.max_fragment_index {
                return Ok(self.global_index(fragment, lower));
            }
            let key = self.fragment_key(ns, &metadata, fragment);
            let Some(bitmap) = self.load_fragment(None, &key)? else {
                return Ok(self.global_index(fragment, lower));
            };
            if let Some(local) = (lower..self.fragment_size).find(|l| !bitmap.contains(*l)) {
                return Ok(self.global_index(fragment, local));
            }
            fragment += 1;
            lower = 0;
        }
    }

    pub(crate) fn previous_clear_bit_in(&self, ns: Option<&[u8]>, from: u64) -> Result<i64> {
        let Some(metadata) = self.base.get_metadata(ns)? else {
            return Ok(to_i64(from));
        };
        let (mut fragment, mut upper) = self.locate(from);

        loop {
            if fragment > metadata.max_fragment_index {
                return Ok(self.global_index(fragment, upper));
            }
            let key = self.fragment_key(ns, &metadata, fragment);
            let Some(bitmap) = self.load_fragment(None, &key)? else {
                return Ok(self.global_index(fragment, upper));
            };
            if let Some(local) = (0..=upper).rev().find(|l| !bitmap.contains(*l)) {
                return Ok(self.global_index(fragment, local));
            }
            if fragment == 0 {
                return Ok(-1);
            }
            fragment -= 1;
            upper = self.fragment_size - 1;
        }
    }

    pub(crate) fn clear_in(&self, ns: Option<&[u8]>) -> Result<()> {
        self.base.new_generation(ns)?;
        Ok(())
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// (fragment index, local offset) of a global bit
    fn locate(&self, bit: u64) -> (u64, u32) {
        let size = u64::from(self.fragment_size);
        (bit / size, (bit % size) as u32)
    }

    /// Global index as reported by the search operations (-1 past i64::MAX)
    fn global_index(&self, fragment: u64, local: u32) -> i64 {
        fragment
            .checked_mul(u64::from(self.fragment_size))
            .and_then(|base| base.checked_add(u64::from(local)))
            .map(to_i64)
            .unwrap_or(-1)
    }

    fn group_by_fragment(&self, bits: &[u64]) -> Result<BTreeMap<u64, Vec<u32>>> {
        let mut by_fragment: BTreeMap<u64, Vec<u32>> = BTreeMap::new();
        for &bit in bits {
            if bit > MAX_BIT_INDEX {
                return Err(CollectionError::BitIndexOutOfRange(bit));
            }
            let (fragment, local) = self.locate(bit);
            by_fragment.entry(fragment).or_default().push(local);
        }
        Ok(by_fragment)
    }

    fn fragment_key(&self, ns: Option<&[u8]>, metadata: &BitmapMetadata, fragment: u64) -> Vec<u8> {
        self.base.data_key(ns, metadata).append_u64(fragment).build()
    }

    fn load_fragment(
        &self,
        pending: Option<&WriteBatch>,
        key: &[u8],
    ) -> Result<Option<RoaringBitmap>> {
        match self.base.pending_get(pending, key)? {
            Some(bytes) => Ok(Some(decode_fragment(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Union of fragments `from..=to`, each shifted to its global offset
    fn collect_bits(
        &self,
        ns: Option<&[u8]>,
        metadata: &BitmapMetadata,
        from: u64,
        to: u64,
    ) -> Result<RoaringTreemap> {
        let prefix = self.base.data_key(ns, metadata).build();
        let start = self.fragment_key(ns, metadata, from);
        let size = u64::from(self.fragment_size);

        let mut bits = RoaringTreemap::new();
        for (suffix, value) in self.base.scan_prefix_from(prefix, &start)? {
            let fragment = decode_u64(&decode_single_segment(&suffix)?)?;
            if fragment > to {
                break;
            }
            let offset = fragment * size;
            bits.extend(decode_fragment(&value)?.iter().map(|local| offset + u64::from(local)));
        }
        Ok(bits)
    }
}

/// Fragment under the cursor, if it is still inside `prefix`
fn current_fragment(cursor: &dyn Cursor, prefix: &[u8]) -> Result<Option<(u64, RoaringBitmap)>> {
    if !cursor.valid() || !has_prefix(cursor.key(), prefix) {
        return Ok(None);
    }
    let suffix = strip_prefix(cursor.key(), prefix).unwrap_or_default();
    let fragment = decode_u64(&decode_single_segment(suffix)?)?;
    Ok(Some((fragment, decode_fragment(cursor.value())?)))
}

fn first_set_at_or_after(bitmap: &RoaringBitmap, lower: u32) -> Option<u32> {
    let below = if lower == 0 { 0 } else { bitmap.rank(lower - 1) };
    bitmap.select(u32::try_from(below).ok()?)
}

fn last_set_at_or_before(bitmap: &RoaringBitmap, upper: u32) -> Option<u32> {
    match bitmap.rank(upper) {
        0 => None,
        count => bitmap.select(u32::try_from(count - 1).ok()?),
    }
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(-1)
}

fn decode_fragment(bytes: &[u8]) -> Result<RoaringBitmap> {
    RoaringBitmap::deserialize_from(bytes)
        .map_err(|e| CollectionError::Serialization(format!("bitmap fragment: {}", e)))
}

fn encode_fragment(bitmap: &RoaringBitmap) -> Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(bitmap.serialized_size());
    bitmap
        .serialize_into(&mut bytes)
        .map_err(|e| CollectionError::Serialization(format!("bitmap fragment: {}", e)))?;
    Ok(bytes)
}
