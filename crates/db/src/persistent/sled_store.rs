//! [`KvStore`] implementation on a `sled` tree.

use tracing::{debug, trace};

use super::config::SledConfig;
use crate::{
    errors::DbResult,
    kv::{KvStore, WriteBatch},
};

/// A persistent store. Batches are applied atomically.
#[derive(Debug, Clone)]
pub struct SledStore {
    db: sled::Db,
    tree: sled::Tree,
}

impl SledStore {
    /// Opens (or creates) the database described by `config`.
    pub fn open(config: &SledConfig) -> DbResult<Self> {
        let db = sled::Config::new()
            .path(config.path())
            .cache_capacity(config.cache_capacity())
            .open()?;
        let tree = db.open_tree(config.tree_name())?;

        debug!(path = %config.path().display(), tree = %config.tree_name(), "opened sled store");

        Ok(Self { db, tree })
    }

    /// Flushes dirty pages to disk and returns the number of bytes flushed.
    pub fn flush(&self) -> DbResult<usize> {
        Ok(self.db.flush()?)
    }
}

impl KvStore for SledStore {
    fn get(&self, key: &[u8]) -> DbResult<Option<Vec<u8>>> {
        Ok(self.tree.get(key)?.map(|v| v.to_vec()))
    }

    fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> DbResult<()> {
        self.tree.insert(key, value)?;
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> DbResult<()> {
        self.tree.remove(key)?;
        Ok(())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> DbResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut pairs = Vec::new();
        for entry in self.tree.scan_prefix(prefix) {
            let (k, v) = entry?;
            pairs.push((k.to_vec(), v.to_vec()));
        }

        Ok(pairs)
    }

    fn scan_range(&self, start: &[u8], end: &[u8]) -> DbResult<Vec<(Vec<u8>, Vec<u8>)>> {
        if start >= end {
            return Ok(Vec::new());
        }

        let mut pairs = Vec::new();
        for entry in self.tree.range(start..end) {
            let (k, v) = entry?;
            pairs.push((k.to_vec(), v.to_vec()));
        }

        Ok(pairs)
    }

    fn apply(&mut self, batch: WriteBatch) -> DbResult<()> {
        trace!(ops = batch.len(), "applying batch");

        let mut sled_batch = sled::Batch::default();
        for (key, value) in batch {
            match value {
                Some(value) => sled_batch.insert(key, value),
                None => sled_batch.remove(key),
            }
        }

        self.tree.apply_batch(sled_batch)?;
        Ok(())
    }
}
