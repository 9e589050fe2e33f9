//! The raw key-value interface every backend implements.

use std::collections::{btree_map, BTreeMap};

use crate::errors::DbResult;

/// An ordered set of writes to apply atomically. `None` deletes the key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl WriteBatch {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a write of `value` under `key`, replacing any earlier op on that key.
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.ops.insert(key, Some(value));
    }

    /// Records a deletion of `key`, replacing any earlier op on that key.
    pub fn delete(&mut self, key: Vec<u8>) {
        self.ops.insert(key, None);
    }

    /// Returns the pending op for `key`: `Some(None)` means deleted in this batch.
    pub fn get(&self, key: &[u8]) -> Option<Option<&Vec<u8>>> {
        self.ops.get(key).map(Option::as_ref)
    }

    /// Returns whether the batch contains no ops.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Number of ops.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Ops on keys in `start..end`, in key order.
    pub fn range<'a>(
        &'a self,
        start: &[u8],
        end: &[u8],
    ) -> impl Iterator<Item = (&'a Vec<u8>, &'a Option<Vec<u8>>)> + 'a {
        self.ops.range(start.to_vec()..end.to_vec())
    }

    /// Ops on keys starting with `prefix`, in key order.
    pub fn range_prefix<'a>(
        &'a self,
        prefix: &'a [u8],
    ) -> impl Iterator<Item = (&'a Vec<u8>, &'a Option<Vec<u8>>)> + 'a {
        self.ops
            .range(prefix.to_vec()..)
            .take_while(move |(k, _)| k.starts_with(prefix))
    }
}

impl IntoIterator for WriteBatch {
    type Item = (Vec<u8>, Option<Vec<u8>>);
    type IntoIter = btree_map::IntoIter<Vec<u8>, Option<Vec<u8>>>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

/// A deterministic, ordered key-value store.
///
/// Implementations must return prefix scans in ascending key order so that every node iterates
/// entities identically.
pub trait KvStore {
    /// Gets the value stored under `key`.
    fn get(&self, key: &[u8]) -> DbResult<Option<Vec<u8>>>;

    /// Stores `value` under `key`.
    fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> DbResult<()>;

    /// Removes `key`.
    fn delete(&mut self, key: &[u8]) -> DbResult<()>;

    /// Returns every pair whose key starts with `prefix`, in ascending key order.
    fn scan_prefix(&self, prefix: &[u8]) -> DbResult<Vec<(Vec<u8>, Vec<u8>)>>;

    /// Returns every pair whose key is in `start..end`, in ascending key order.
    fn scan_range(&self, start: &[u8], end: &[u8]) -> DbResult<Vec<(Vec<u8>, Vec<u8>)>>;

    /// Applies `batch`. Backends that support it apply the batch atomically.
    fn apply(&mut self, batch: WriteBatch) -> DbResult<()> {
        for (key, value) in batch {
            match value {
                Some(value) => self.put(key, value)?,
                None => self.delete(&key)?,
            }
        }

        Ok(())
    }
}
