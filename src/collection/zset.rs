//! Sorted-set engine
//!
//! Two coupled key families under one generation:
//!
//! ```text
//! member index: [name] [ns?] [version] "members" [member]          → score (i64 BE)
//! score index:  [name] [ns?] [version] "scores"  [score] [member]  → ()
//! ```
//!
//! The score segment uses the sortable i64 encoding, so the score index
//! is ordered by (score, encoded member) and range scans read both fields
//! straight out of the key. The member index serves point lookups and is
//! required to find the score-index key of a member before deleting it.
//!
//! Both entries of a member are always written or deleted in the same
//! atomic unit (one store batch, or the caller's batch).

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::error;

use crate::codec::{BincodeCodec, Codec};
use crate::error::{CollectionError, Result};
use crate::keys::{
    append_to_key, decode, decode_sortable_i64, encode_sortable_i64, has_prefix, prefix_successor,
    strip_prefix,
};
use crate::metadata::ZSetMetadata;
use crate::store::{Cursor, Store, WriteBatch};

use super::base::{CollectionBase, PrefixScan};
use super::set::decode_single_segment;

const MEMBERS_SEGMENT: &[u8] = b"members";
const SCORES_SEGMENT: &[u8] = b"scores";

/// Sorted sets sharing one name, each addressed by a namespace
pub struct MultiZSet<T, C = BincodeCodec> {
    base: CollectionBase<ZSetMetadata>,
    codec: C,
    _member: PhantomData<fn() -> T>,
}

impl<T, C> MultiZSet<T, C>
where
    T: Serialize + DeserializeOwned,
    C: Codec + Default,
{
    pub fn new(store: Arc<dyn Store>, name: impl Into<String>) -> Self {
        Self::with_codec(store, name, C::default())
    }
}

impl<T, C> MultiZSet<T, C>
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

    /// Add `member` with `score`, moving it if it already has another score
    pub fn add(&self, ns: impl AsRef<[u8]>, member: &T, score: i64) -> Result<()> {
        self.add_in(Some(ns.as_ref()), &[(member, score)], None)
    }

    pub fn add_batch(
        &self,
        ns: impl AsRef<[u8]>,
        batch: &mut WriteBatch,
        members: &[(T, i64)],
    ) -> Result<()> {
        let refs: Vec<(&T, i64)> = members.iter().map(|(m, s)| (m, *s)).collect();
        self.add_in(Some(ns.as_ref()), &refs, Some(batch))
    }

    pub fn get_score(&self, ns: impl AsRef<[u8]>, member: &T) -> Result<Option<i64>> {
        self.get_score_in(Some(ns.as_ref()), member)
    }

    pub fn contains(&self, ns: impl AsRef<[u8]>, member: &T) -> Result<bool> {
        Ok(self.get_score_in(Some(ns.as_ref()), member)?.is_some())
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
        self.members_with_scores_iter(ns)?
            .map(|entry| entry.map(|(member, _)| member))
            .collect()
    }

    /// Member → score for every member
    pub fn members_with_scores(&self, ns: impl AsRef<[u8]>) -> Result<HashMap<T, i64>>
    where
        T: Eq + Hash,
    {
        self.members_with_scores_iter(ns)?.collect()
    }

    /// Lazily iterate (member, score) over the member index
    pub fn members_with_scores_iter(
        &self,
        ns: impl AsRef<[u8]>,
    ) -> Result<ZSetMembersIter<'_, T, C>> {
        self.members_with_scores_iter_in(Some(ns.as_ref()))
    }

    /// Members with `lo <= score <= hi`, ascending by (score, member)
    pub fn members_in_range(
        &self,
        ns: impl AsRef<[u8]>,
        lo: i64,
        hi: i64,
    ) -> Result<Vec<(T, i64)>> {
        self.members_in_range_iter(ns, lo, hi)?.collect()
    }

    pub fn members_in_range_iter(
        &self,
        ns: impl AsRef<[u8]>,
        lo: i64,
        hi: i64,
    ) -> Result<ZSetRangeIter<'_, T, C>> {
        self.range_iter_in(Some(ns.as_ref()), lo, hi)
    }

    /// Members with `to <= score <= from`, descending by (score, member)
    pub fn members_in_range_reverse(
        &self,
        ns: impl AsRef<[u8]>,
        from: i64,
        to: i64,
    ) -> Result<Vec<(T, i64)>> {
        self.members_in_range_reverse_iter(ns, from, to)?.collect()
    }

    pub fn members_in_range_reverse_iter(
        &self,
        ns: impl AsRef<[u8]>,
        from: i64,
        to: i64,
    ) -> Result<ZSetRangeIter<'_, T, C>> {
        self.reverse_range_iter_in(Some(ns.as_ref()), from, to)
    }

    /// Drop every member by starting a new generation
    pub fn clear(&self, ns: impl AsRef<[u8]>) -> Result<()> {
        self.clear_in(Some(ns.as_ref()))
    }

    // =========================================================================
    // Namespace-optional implementations (shared with the SortedSet facade)
    // =========================================================================

    pub(crate) fn add_in(
        &self,
        ns: Option<&[u8]>,
        members: &[(&T, i64)],
        batch: Option<&mut WriteBatch>,
    ) -> Result<()> {
        let pending = batch.as_deref();
        let metadata = self.base.create_metadata_if_absent(ns, pending)?;
        let score_prefix = self.score_prefix(ns, &metadata);

        // Scores already staged by this call, so a member repeated in one
        // call moves instead of leaving a stale score entry behind
        let mut staged_scores: HashMap<Vec<u8>, i64> = HashMap::new();
        let mut staged = WriteBatch::new();

        for (member, score) in members {
            let member_bytes = self.codec.encode(*member)?;
            let member_key = self.member_key(ns, &metadata, &member_bytes);

            let previous = match staged_scores.get(&member_bytes) {
                Some(previous) => Some(*previous),
                None => self.stored_score(pending, &score_prefix, &member_key, &member_bytes)?,
            };
            if let Some(previous) = previous {
                if previous != *score {
                    let old_score_key = score_key(&score_prefix, previous, &member_bytes);
                    self.base.stage_delete(&mut staged, old_score_key);
                }
            }

            self.base
                .stage_put(&mut staged, member_key, score.to_be_bytes().to_vec());
            self.base.stage_put(
                &mut staged,
                score_key(&score_prefix, *score, &member_bytes),
                Vec::new(),
            );
            staged_scores.insert(member_bytes, *score);
        }

        self.base.apply(staged, batch)
    }

    pub(crate) fn get_score_in(&self, ns: Option<&[u8]>, member: &T) -> Result<Option<i64>> {
        let Some(metadata) = self.base.get_metadata(ns)? else {
            return Ok(None);
        };
        let member_bytes = self.codec.encode(member)?;
        match self
            .base
            .point_get(&self.member_key(ns, &metadata, &member_bytes))?
        {
            Some(value) => Ok(Some(decode_score_value(&value)?)),
            None => Ok(None),
        }
    }

    pub(crate) fn remove_in(
        &self,
        ns: Option<&[u8]>,
        members: &[T],
        batch: Option<&mut WriteBatch>,
    ) -> Result<()> {
        let pending = batch.as_deref();
        let Some(metadata) = self.base.pending_metadata(ns, pending)? else {
            return Ok(());
        };
        let score_prefix = self.score_prefix(ns, &metadata);
        let mut removed: HashSet<Vec<u8>> = HashSet::new();
        let mut staged = WriteBatch::new();

        for member in members {
            let member_bytes = self.codec.encode(member)?;
            if removed.contains(&member_bytes) {
                continue;
            }
            let member_key = self.member_key(ns, &metadata, &member_bytes);

            // The score-index key can only be derived from the current score
            let Some(score) =
                self.stored_score(pending, &score_prefix, &member_key, &member_bytes)?
            else {
                continue;
            };
            self.base.stage_delete(&mut staged, member_key);
            self.base
                .stage_delete(&mut staged, score_key(&score_prefix, score, &member_bytes));
            removed.insert(member_bytes);
        }

        self.base.apply(staged, batch)
    }

    pub(crate) fn members_with_scores_iter_in(
        &self,
        ns: Option<&[u8]>,
    ) -> Result<ZSetMembersIter<'_, T, C>> {
        let scan = match self.base.get_metadata(ns)? {
            Some(metadata) => self.base.scan_prefix(self.members_prefix(ns, &metadata))?,
            None => PrefixScan::empty(),
        };
        Ok(ZSetMembersIter {
            scan,
            codec: &self.codec,
            _member: PhantomData,
        })
    }

    pub(crate) fn range_iter_in(
        &self,
        ns: Option<&[u8]>,
        lo: i64,
        hi: i64,
    ) -> Result<ZSetRangeIter<'_, T, C>> {
        let metadata = match self.base.get_metadata(ns)? {
            Some(metadata) if lo <= hi => metadata,
            _ => return Ok(ZSetRangeIter::empty(&self.codec)),
        };
        let prefix = self.score_prefix(ns, &metadata);

        let mut cursor = self.base.store().cursor()?;
        cursor.seek(&append_to_key(&prefix, &[&encode_sortable_i64(lo)]));

        Ok(ZSetRangeIter {
            cursor: Some(cursor),
            prefix,
            lo,
            hi,
            reverse: false,
            codec: &self.codec,
            _member: PhantomData,
        })
    }

    pub(crate) fn reverse_range_iter_in(
        &self,
        ns: Option<&[u8]>,
        from: i64,
        to: i64,
    ) -> Result<ZSetRangeIter<'_, T, C>> {
        let metadata = match self.base.get_metadata(ns)? {
            Some(metadata) if to <= from => metadata,
            _ => return Ok(ZSetRangeIter::empty(&self.codec)),
        };
        let prefix = self.score_prefix(ns, &metadata);

        // Position on the last key scored exactly `from` (or the nearest below)
        let mut cursor = self.base.store().cursor()?;
        let from_prefix = append_to_key(&prefix, &[&encode_sortable_i64(from)]);
        match prefix_successor(&from_prefix) {
            Some(bound) => cursor.seek_for_prev(&bound),
            None => cursor.seek_to_last(),
        }

        Ok(ZSetRangeIter {
            cursor: Some(cursor),
            prefix,
            lo: to,
            hi: from,
            reverse: true,
            codec: &self.codec,
            _member: PhantomData,
        })
    }

    pub(crate) fn clear_in(&self, ns: Option<&[u8]>) -> Result<()> {
        self.base.new_generation(ns)?;
        Ok(())
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn members_prefix(&self, ns: Option<&[u8]>, metadata: &ZSetMetadata) -> Vec<u8> {
        self.base
            .data_key(ns, metadata)
            .append(MEMBERS_SEGMENT)
            .build()
    }

    fn score_prefix(&self, ns: Option<&[u8]>, metadata: &ZSetMetadata) -> Vec<u8> {
        self.base
            .data_key(ns, metadata)
            .append(SCORES_SEGMENT)
            .build()
    }

    fn member_key(
        &self,
        ns: Option<&[u8]>,
        metadata: &ZSetMetadata,
        member_bytes: &[u8],
    ) -> Vec<u8> {
        append_to_key(&self.members_prefix(ns, metadata), &[member_bytes])
    }

    /// Current score of a member, checking that its score-index entry exists
    ///
    /// Reads through `pending`, so a member staged earlier into the same
    /// batch has its score-index entry replaced rather than duplicated.
    fn stored_score(
        &self,
        pending: Option<&WriteBatch>,
        score_prefix: &[u8],
        member_key: &[u8],
        member_bytes: &[u8],
    ) -> Result<Option<i64>> {
        let Some(value) = self.base.pending_get(pending, member_key)? else {
            return Ok(None);
        };
        let score = decode_score_value(&value)?;

        if self
            .base
            .pending_get(pending, &score_key(score_prefix, score, member_bytes))?
            .is_none()
        {
            error!(
                collection = %self.base.name(),
                score,
                "sorted-set member has no score-index entry"
            );
            return Err(CollectionError::InconsistentPairedIndex {
                member: member_bytes.to_vec(),
                score,
            });
        }

        Ok(Some(score))
    }
}

fn score_key(score_prefix: &[u8], score: i64, member_bytes: &[u8]) -> Vec<u8> {
    append_to_key(score_prefix, &[&encode_sortable_i64(score), member_bytes])
}

fn decode_score_value(value: &[u8]) -> Result<i64> {
    let bytes: [u8; 8] = value.try_into().map_err(|_| {
        CollectionError::Serialization(format!("score value must be 8 bytes, got {}", value.len()))
    })?;
    Ok(i64::from_be_bytes(bytes))
}

// =============================================================================
// Iterators
// =============================================================================

/// Lazy cursor over (member, score) pairs of the member index
pub struct ZSetMembersIter<'a, T, C> {
    scan: PrefixScan<'a>,
    codec: &'a C,
    _member: PhantomData<fn() -> T>,
}

impl<T, C> Iterator for ZSetMembersIter<'_, T, C>
where
    T: DeserializeOwned,
    C: Codec,
{
    type Item = Result<(T, i64)>;

    fn next(&mut self) -> Option<Self::Item> {
        let (suffix, value) = self.scan.next()?;
        let entry = decode_single_segment(&suffix).and_then(|member_bytes| {
            let member = self.codec.decode(&member_bytes)?;
            Ok((member, decode_score_value(&value)?))
        });
        Some(entry)
    }
}

/// Lazy cursor over the score index within `[lo, hi]`
///
/// Forward iterators yield ascending (score, member); reverse iterators
/// yield the same entries descending. Neither touches the member index.
pub struct ZSetRangeIter<'a, T, C> {
    cursor: Option<Box<dyn Cursor + 'a>>,
    prefix: Vec<u8>,
    lo: i64,
    hi: i64,
    reverse: bool,
    codec: &'a C,
    _member: PhantomData<fn() -> T>,
}

impl<'a, T, C> ZSetRangeIter<'a, T, C> {
    fn empty(codec: &'a C) -> Self {
        Self {
            cursor: None,
            prefix: Vec::new(),
            lo: 0,
            hi: 0,
            reverse: false,
            codec,
            _member: PhantomData,
        }
    }

    /// (score, encoded member) of the current score-index key
    fn current(&self) -> Option<Result<(i64, Vec<u8>)>> {
        let cursor = self.cursor.as_ref()?;
        if !cursor.valid() || !has_prefix(cursor.key(), &self.prefix) {
            return None;
        }
        let suffix = strip_prefix(cursor.key(), &self.prefix).unwrap_or_default();
        Some(decode(suffix).and_then(|mut parts| {
            if parts.len() != 2 {
                return Err(CollectionError::MalformedKey(format!(
                    "score-index key has {} trailing segments",
                    parts.len()
                )));
            }
            let member = parts.pop().unwrap_or_default();
            let score = decode_sortable_i64(&parts[0])?;
            Ok((score, member))
        }))
    }

    fn step(&mut self) {
        if let Some(cursor) = self.cursor.as_mut() {
            if self.reverse {
                cursor.prev();
            } else {
                cursor.next();
            }
        }
    }
}

impl<T, C> Iterator for ZSetRangeIter<'_, T, C>
where
    T: DeserializeOwned,
    C: Codec,
{
    type Item = Result<(T, i64)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (score, member_bytes) = match self.current() {
                Some(Ok(entry)) => entry,
                Some(Err(e)) => {
                    self.cursor = None;
                    return Some(Err(e));
                }
                None => {
                    self.cursor = None;
                    return None;
                }
            };

            let in_range = score >= self.lo && score <= self.hi;
            if !in_range {
                // seek_for_prev can land on an entry above the upper bound
                if self.reverse && score > self.hi {
                    self.step();
                    continue;
                }
                self.cursor = None;
                return None;
            }

            self.step();
            return Some(self.codec.decode(&member_bytes).map(|member| (member, score)));
        }
    }
}
