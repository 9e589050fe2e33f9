//! The context every engine operation runs in.

use std::fmt;

use custody_db::{errors::DbError, kv::KvStore, txn::StoreTxn};
use custody_params::protocol::ProtocolParams;
use custody_primitives::{memo::MemoParser, types::BlockHeight};

use crate::events::CustodyEvent;

/// Everything an operation may read or write.
///
/// The store handed in is usually a [`StoreTxn`] so that the caller decides whether the
/// operation's writes are kept.
pub struct CustodyCtx<'a> {
    pub(crate) height: BlockHeight,
    pub(crate) store: &'a mut dyn KvStore,
    pub(crate) params: &'a ProtocolParams,
    pub(crate) memo_parser: &'a dyn MemoParser,
    pub(crate) events: &'a mut Vec<CustodyEvent>,
}

impl fmt::Debug for CustodyCtx<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustodyCtx")
            .field("height", &self.height)
            .field("params", &self.params)
            .field("events", &self.events.len())
            .finish_non_exhaustive()
    }
}

impl<'a> CustodyCtx<'a> {
    /// Creates a new context.
    pub fn new(
        height: BlockHeight,
        store: &'a mut dyn KvStore,
        params: &'a ProtocolParams,
        memo_parser: &'a dyn MemoParser,
        events: &'a mut Vec<CustodyEvent>,
    ) -> Self {
        Self {
            height,
            store,
            params,
            memo_parser,
            events,
        }
    }

    /// The current native height.
    pub const fn height(&self) -> BlockHeight {
        self.height
    }

    /// The protocol parameters in effect.
    pub const fn params(&self) -> &ProtocolParams {
        self.params
    }

    /// The memo parser.
    pub const fn memo_parser(&self) -> &dyn MemoParser {
        self.memo_parser
    }

    /// Read access to the store.
    pub fn store(&self) -> &dyn KvStore {
        &*self.store
    }

    /// Write access to the store.
    pub fn store_mut(&mut self) -> &mut dyn KvStore {
        &mut *self.store
    }

    /// Records an audit event.
    pub fn emit(&mut self, event: CustodyEvent) {
        self.events.push(event);
    }

    /// Runs `f` in a nested transaction. Its writes and events are kept only if it succeeds.
    pub fn atomically<T, E>(
        &mut self,
        f: impl FnOnce(&mut CustodyCtx<'_>) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<DbError>,
    {
        let mut events = Vec::new();
        let mut txn = StoreTxn::new(&mut *self.store);

        let res = {
            let mut nested = CustodyCtx {
                height: self.height,
                store: &mut txn,
                params: self.params,
                memo_parser: self.memo_parser,
                events: &mut events,
            };
            f(&mut nested)
        };

        let out = res?;
        txn.commit()?;
        self.events.extend(events);

        Ok(out)
    }
}
