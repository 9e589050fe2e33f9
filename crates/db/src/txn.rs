//! All-or-nothing transactions on top of any [`KvStore`].

use std::collections::BTreeMap;

use crate::{
    errors::DbResult,
    kv::{KvStore, WriteBatch},
};

/// Buffers writes over a base store. Reads see the buffered writes.
///
/// Nothing reaches the base store until [`StoreTxn::commit`]; dropping the transaction discards
/// every write made through it.
#[derive(Debug)]
pub struct StoreTxn<'a, S: KvStore + ?Sized> {
    base: &'a mut S,
    writes: WriteBatch,
}

impl<'a, S: KvStore + ?Sized> StoreTxn<'a, S> {
    /// Starts a transaction over `base`.
    pub fn new(base: &'a mut S) -> Self {
        Self {
            base,
            writes: WriteBatch::new(),
        }
    }

    /// Number of buffered writes.
    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    /// Applies every buffered write to the base store.
    pub fn commit(self) -> DbResult<()> {
        if self.writes.is_empty() {
            return Ok(());
        }

        self.base.apply(self.writes)
    }
}

impl<S: KvStore + ?Sized> KvStore for StoreTxn<'_, S> {
    fn get(&self, key: &[u8]) -> DbResult<Option<Vec<u8>>> {
        match self.writes.get(key) {
            Some(buffered) => Ok(buffered.cloned()),
            None => self.base.get(key),
        }
    }

    fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> DbResult<()> {
        self.writes.put(key, value);
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> DbResult<()> {
        self.writes.delete(key.to_vec());
        Ok(())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> DbResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.base.scan_prefix(prefix)?.into_iter().collect();

        for (key, value) in self.writes.range_prefix(prefix) {
            match value {
                Some(value) => merged.insert(key.clone(), value.clone()),
                None => merged.remove(key),
            };
        }

        Ok(merged.into_iter().collect())
    }

    fn scan_range(&self, start: &[u8], end: &[u8]) -> DbResult<Vec<(Vec<u8>, Vec<u8>)>> {
        if start >= end {
            return Ok(Vec::new());
        }

        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.base.scan_range(start, end)?.into_iter().collect();

        for (key, value) in self.writes.range(start, end) {
            match value {
                Some(value) => merged.insert(key.clone(), value.clone()),
                None => merged.remove(key),
            };
        }

        Ok(merged.into_iter().collect())
    }
}
