//! Storage interfaces for the custody core.
//!
//! The core never touches a concrete database. It is handed a [`kv::KvStore`] and accesses
//! entities through typed [`row_spec::RowSpec`]s on top of it. Every processed message runs inside
//! a [`txn::StoreTxn`] so that it either commits as a whole or leaves no trace.

pub mod errors;
pub mod inmemory;
pub mod kv;
pub mod persistent;
pub mod row_spec;
pub mod txn;

pub mod prelude {
    //! Re-exports of the storage types.

    pub use crate::{
        errors::{DbError, DbResult},
        inmemory::InMemoryStore,
        kv::{KvStore, WriteBatch},
        persistent::{config::SledConfig, sled_store::SledStore},
        row_spec::{RowSpec, TypedStore},
        txn::StoreTxn,
    };
}
