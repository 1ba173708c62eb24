//! Key builder
//!
//! Length-prefixed composite keys.

use bytes::{Buf, BufMut};

use crate::error::{CollectionError, Result};

use super::encoding::encode_sortable_i64;
use super::SEGMENT_HEADER_SIZE;

/// Incrementally builds a composite key
///
/// ```
/// use atlas_collections::keys::{decode, KeyBuilder};
///
/// let key = KeyBuilder::new("names").append("ns1").append_u64(7).build();
/// let parts = decode(&key).unwrap();
/// assert_eq!(parts[0], b"names");
/// assert_eq!(parts[2], 7u64.to_be_bytes());
/// ```
#[derive(Debug, Clone, Default)]
pub struct KeyBuilder {
    buf: Vec<u8>,
}

impl KeyBuilder {
    /// Start a key with its first segment (the collection name)
    pub fn new(first: impl AsRef<[u8]>) -> Self {
        Self::default().append(first)
    }

    /// Start a key with the collection name and, if present, the namespace
    pub fn with_namespace(name: impl AsRef<[u8]>, ns: Option<&[u8]>) -> Self {
        let builder = Self::new(name);
        match ns {
            Some(ns) => builder.append(ns),
            None => builder,
        }
    }

    /// Continue from an already-built key without re-encoding it
    pub fn from_key(key: &[u8]) -> Self {
        Self { buf: key.to_vec() }
    }

    /// Append an opaque byte segment
    pub fn append(mut self, part: impl AsRef<[u8]>) -> Self {
        put_segment(&mut self.buf, part.as_ref());
        self
    }

    pub fn append_u16(self, value: u16) -> Self {
        self.append(value.to_be_bytes())
    }

    pub fn append_u32(self, value: u32) -> Self {
        self.append(value.to_be_bytes())
    }

    pub fn append_u64(self, value: u64) -> Self {
        self.append(value.to_be_bytes())
    }

    pub fn append_i64(self, value: i64) -> Self {
        self.append(value.to_be_bytes())
    }

    /// Append an i64 whose byte order must follow signed numeric order
    pub fn append_sortable_i64(self, value: i64) -> Self {
        self.append(encode_sortable_i64(value))
    }

    pub fn build(self) -> Vec<u8> {
        self.buf
    }
}

fn put_segment(buf: &mut Vec<u8>, part: &[u8]) {
    buf.reserve(SEGMENT_HEADER_SIZE + part.len());
    buf.put_u32(part.len() as u32);
    buf.put_slice(part);
}

/// Extend an already-built key with more segments
pub fn append_to_key(key: &[u8], parts: &[&[u8]]) -> Vec<u8> {
    let extra: usize = parts.iter().map(|p| SEGMENT_HEADER_SIZE + p.len()).sum();
    let mut buf = Vec::with_capacity(key.len() + extra);
    buf.put_slice(key);
    for part in parts {
        put_segment(&mut buf, part);
    }
    buf
}

/// Decode a composite key into its segments
///
/// Fails with `MalformedKey` if a length tag runs past the end of the key.
pub fn decode(key: &[u8]) -> Result<Vec<Vec<u8>>> {
    let mut parts = Vec::new();
    let mut rest = key;

    while rest.has_remaining() {
        if rest.remaining() < SEGMENT_HEADER_SIZE {
            return Err(CollectionError::MalformedKey(format!(
                "truncated segment header at offset {}",
                key.len() - rest.remaining()
            )));
        }
        let len = rest.get_u32() as usize;
        if rest.remaining() < len {
            return Err(CollectionError::MalformedKey(format!(
                "segment of {} bytes exceeds remaining {} bytes",
                len,
                rest.remaining()
            )));
        }
        parts.push(rest[..len].to_vec());
        rest.advance(len);
    }

    Ok(parts)
}

/// True iff `key` starts with the bytes of `prefix`
///
/// With length-prefixed segments this is exactly "the first k segments
/// of `key` equal the k segments of `prefix`".
pub fn has_prefix(key: &[u8], prefix: &[u8]) -> bool {
    key.starts_with(prefix)
}

/// Remaining encoded segments of `key` after `prefix`
pub fn strip_prefix<'a>(key: &'a [u8], prefix: &[u8]) -> Option<&'a [u8]> {
    key.strip_prefix(prefix)
}

/// Smallest byte string greater than every key starting with `prefix`
///
/// Returns `None` when no such bound exists (empty or all-0xFF prefix).
pub fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut bound = prefix.to_vec();
    while let Some(last) = bound.pop() {
        if last < u8::MAX {
            bound.push(last + 1);
            return Some(bound);
        }
    }
    None
}
