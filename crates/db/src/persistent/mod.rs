//! Persistent store backed by `sled`.

pub mod config;
pub mod sled_store;
