//! This module contains all the configuration types used in the persistence layer.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default name of the tree holding custody state.
const DEFAULT_TREE_NAME: &str = "custody";

/// Default size of the page cache in bytes.
const DEFAULT_CACHE_CAPACITY: u64 = 64 * 1024 * 1024;

/// The configuration for the sled database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SledConfig {
    path: PathBuf,
    tree_name: String,
    cache_capacity: u64,
}

impl SledConfig {
    /// Creates a configuration for a database at `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            tree_name: DEFAULT_TREE_NAME.to_string(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }

    /// Sets the name of the tree holding custody state.
    pub fn with_tree_name(self, tree_name: impl Into<String>) -> Self {
        Self {
            tree_name: tree_name.into(),
            ..self
        }
    }

    /// Sets the size of the page cache.
    pub fn with_cache_capacity(self, cache_capacity: u64) -> Self {
        Self {
            cache_capacity,
            ..self
        }
    }

    /// Returns the database path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the tree name.
    pub fn tree_name(&self) -> &str {
        &self.tree_name
    }

    /// Returns the cache capacity.
    pub const fn cache_capacity(&self) -> u64 {
        self.cache_capacity
    }
}
