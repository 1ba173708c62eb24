//! Write batches
//!
//! A batch stages puts and deletes (each tagged with its column family)
//! and is applied atomically by [`Store::write`](super::Store::write).

use crate::wal::Operation;

/// Ordered set of staged writes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    operations: Vec<Operation>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, cf: impl Into<String>, key: Vec<u8>, value: Vec<u8>) {
        self.operations.push(Operation::Put {
            cf: cf.into(),
            key,
            value,
        });
    }

    pub fn delete(&mut self, cf: impl Into<String>, key: Vec<u8>) {
        self.operations.push(Operation::Delete { cf: cf.into(), key });
    }

    /// Move every operation of `other` to the end of this batch
    pub fn append(&mut self, other: &mut WriteBatch) {
        self.operations.append(&mut other.operations);
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn clear(&mut self) {
        self.operations.clear();
    }

    /// Latest staged write of `key` in column family `cf`
    ///
    /// `Some(Some(value))` for a pending put, `Some(None)` for a pending
    /// delete, `None` if the batch never touches the key.
    pub fn pending(&self, cf: &str, key: &[u8]) -> Option<Option<&[u8]>> {
        self.operations
            .iter()
            .rev()
            .find(|op| op.cf() == cf && op.key() == key)
            .map(|op| match op {
                Operation::Put { value, .. } => Some(value.as_slice()),
                Operation::Delete { .. } => None,
            })
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn into_operations(self) -> Vec<Operation> {
        self.operations
    }
}
