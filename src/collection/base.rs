//! Shared collection plumbing
//!
//! Metadata lifecycle, point reads, staged writes and prefix scans used by
//! every collection engine.

use std::marker::PhantomData;
use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::keys::{has_prefix, strip_prefix, KeyBuilder};
use crate::metadata::{next_version, Metadata};
use crate::store::{Cursor, Store, WriteBatch};

/// Store handle + collection name, parameterized by metadata kind
pub(crate) struct CollectionBase<M: Metadata> {
    store: Arc<dyn Store>,
    name: String,
    _metadata: PhantomData<fn() -> M>,
}

impl<M: Metadata> CollectionBase<M> {
    pub(crate) fn new(store: Arc<dyn Store>, name: String) -> Self {
        Self {
            store,
            name,
            _metadata: PhantomData,
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    // =========================================================================
    // Metadata
    // =========================================================================

    /// Key of the metadata record: `[name] [ns?]`
    pub(crate) fn metadata_key(&self, ns: Option<&[u8]>) -> Vec<u8> {
        KeyBuilder::with_namespace(&self.name, ns).build()
    }

    pub(crate) fn get_metadata(&self, ns: Option<&[u8]>) -> Result<Option<M>> {
        self.pending_metadata(ns, None)
    }

    /// Metadata as it will be once `pending` commits
    pub(crate) fn pending_metadata(
        &self,
        ns: Option<&[u8]>,
        pending: Option<&WriteBatch>,
    ) -> Result<Option<M>> {
        match self.pending_get(pending, &self.metadata_key(ns))? {
            Some(bytes) if !bytes.is_empty() => Ok(Some(M::decode(&bytes)?)),
            _ => Ok(None),
        }
    }

    /// Read the metadata record (through `pending`), creating a new
    /// generation if absent
    ///
    /// Creation is written immediately, never staged into a caller batch:
    /// the version must be fixed before any data key can be computed.
    pub(crate) fn create_metadata_if_absent(
        &self,
        ns: Option<&[u8]>,
        pending: Option<&WriteBatch>,
    ) -> Result<M> {
        if let Some(metadata) = self.pending_metadata(ns, pending)? {
            return Ok(metadata);
        }
        self.new_generation(ns)
    }

    /// Write a fresh metadata record with a new version
    ///
    /// Keys of the previous generation stay in the store but are no longer
    /// reachable through this collection.
    pub(crate) fn new_generation(&self, ns: Option<&[u8]>) -> Result<M> {
        let metadata = M::with_version(next_version());
        self.store.put(&self.metadata_key(ns), &metadata.encode()?)?;
        debug!(
            collection = %self.name,
            kind = M::DATA_TYPE.name(),
            version = metadata.version(),
            "created metadata"
        );
        Ok(metadata)
    }

    /// Stage a metadata update
    pub(crate) fn stage_metadata(
        &self,
        staged: &mut WriteBatch,
        ns: Option<&[u8]>,
        metadata: &M,
    ) -> Result<()> {
        self.store
            .stage_put(staged, self.metadata_key(ns), metadata.encode()?);
        Ok(())
    }

    // =========================================================================
    // Keys
    // =========================================================================

    /// `[name] [ns?] [version]`, the prefix of every data key of the instance
    pub(crate) fn data_key(&self, ns: Option<&[u8]>, metadata: &M) -> KeyBuilder {
        KeyBuilder::with_namespace(&self.name, ns).append_i64(metadata.version())
    }

    // =========================================================================
    // Reads / Writes
    // =========================================================================

    pub(crate) fn point_get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.store.get(key)
    }

    /// Point read that sees writes already staged into `pending`
    ///
    /// Lets several staging calls share one uncommitted batch: each reads
    /// what the earlier ones staged instead of the committed value.
    pub(crate) fn pending_get(
        &self,
        pending: Option<&WriteBatch>,
        key: &[u8],
    ) -> Result<Option<Vec<u8>>> {
        if let Some(staged) = pending.and_then(|b| b.pending(self.store.cf_name(), key)) {
            return Ok(staged.map(<[u8]>::to_vec));
        }
        self.store.get(key)
    }

    pub(crate) fn multi_get(&self, keys: &[Vec<u8>]) -> Result<Vec<Option<Vec<u8>>>> {
        self.store.multi_get(keys)
    }

    pub(crate) fn stage_put(&self, staged: &mut WriteBatch, key: Vec<u8>, value: Vec<u8>) {
        self.store.stage_put(staged, key, value);
    }

    pub(crate) fn stage_delete(&self, staged: &mut WriteBatch, key: Vec<u8>) {
        self.store.stage_delete(staged, key);
    }

    /// Hand fully-staged writes to the caller's batch, or commit them now
    ///
    /// Engines stage a whole call into `staged` before calling this, so a
    /// failure part-way through never leaves a partial call in `batch`.
    pub(crate) fn apply(
        &self,
        mut staged: WriteBatch,
        batch: Option<&mut WriteBatch>,
    ) -> Result<()> {
        match batch {
            Some(batch) => {
                batch.append(&mut staged);
                Ok(())
            }
            None => self.store.write(staged),
        }
    }

    /// Cursor positioned at the first key under `prefix`
    pub(crate) fn scan_prefix(&self, prefix: Vec<u8>) -> Result<PrefixScan<'_>> {
        let start = prefix.clone();
        self.scan_prefix_from(prefix, &start)
    }

    /// Like `scan_prefix`, but starting at the first key >= `start`
    pub(crate) fn scan_prefix_from(&self, prefix: Vec<u8>, start: &[u8]) -> Result<PrefixScan<'_>> {
        let mut cursor = self.store.cursor()?;
        cursor.seek(start);
        Ok(PrefixScan {
            cursor: Some(cursor),
            prefix,
        })
    }
}

/// Forward scan over every entry whose key starts with a fixed prefix
///
/// Yields `(suffix, value)` where `suffix` is the key with the prefix
/// removed. Stops at the first key outside the prefix. The underlying
/// cursor is released on drop.
pub(crate) struct PrefixScan<'a> {
    cursor: Option<Box<dyn Cursor + 'a>>,
    prefix: Vec<u8>,
}

impl PrefixScan<'_> {
    /// A scan that yields nothing (collection has no metadata yet)
    pub(crate) fn empty() -> Self {
        Self {
            cursor: None,
            prefix: Vec::new(),
        }
    }
}

impl Iterator for PrefixScan<'_> {
    type Item = (Vec<u8>, Vec<u8>);

    fn next(&mut self) -> Option<Self::Item> {
        let cursor = self.cursor.as_mut()?;
        if !cursor.valid() || !has_prefix(cursor.key(), &self.prefix) {
            self.cursor = None;
            return None;
        }
        let suffix = strip_prefix(cursor.key(), &self.prefix)
            .unwrap_or_default()
            .to_vec();
        let value = cursor.value().to_vec();
        cursor.next();
        Some((suffix, value))
    }
}
