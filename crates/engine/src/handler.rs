//! The seam to the downstream logic that acts on finalised inbound transactions.

use custody_db::errors::DbError;
use custody_primitives::{memo::Memo, tx::ObservedTx, txout::TxOutItem};
use thiserror::Error;
use tracing::debug;

use crate::{context::CustodyCtx, errors::EngineError};

/// Errors returned by an [`InboundHandler`].
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The handler refused the transaction.
    #[error("rejected: {0}")]
    Rejected(String),

    /// An engine operation requested by the handler failed.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl From<DbError> for HandlerError {
    fn from(e: DbError) -> Self {
        HandlerError::Engine(EngineError::Storage(e))
    }
}

/// The result type for handler operations.
pub type HandlerResult<T> = Result<T, HandlerError>;

/// Acts on finalised inbound transactions, typically by requesting outbound payments through
/// [`CustodyCtx::schedule`].
///
/// Both methods run in their own nested transaction: writes of a failing call are discarded.
pub trait InboundHandler {
    /// Processes a finalised inbound transaction with a parsed memo.
    fn handle(&self, ctx: &mut CustodyCtx<'_>, tx: &ObservedTx, memo: &Memo) -> HandlerResult<()>;

    /// Sends every coin of `tx` back to its sender.
    fn refund(&self, ctx: &mut CustodyCtx<'_>, tx: &ObservedTx, reason: &str) -> HandlerResult<()> {
        debug!(tx_id = %tx.tx.id, %reason, "refunding inbound");

        for coin in &tx.tx.coins {
            let item = TxOutItem::new(
                tx.tx.chain,
                tx.tx.from_address.clone(),
                coin.clone(),
                tx.tx.id.clone(),
            )
            .with_memo(Memo::refund(&tx.tx.id));
            ctx.schedule(item, 0)?;
        }

        Ok(())
    }
}

/// A handler that accepts every transaction and requests nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHandler;

impl InboundHandler for NoopHandler {
    fn handle(&self, _ctx: &mut CustodyCtx<'_>, tx: &ObservedTx, memo: &Memo) -> HandlerResult<()> {
        debug!(tx_id = %tx.tx.id, kind = ?memo.kind, "ignoring finalised inbound");
        Ok(())
    }
}
