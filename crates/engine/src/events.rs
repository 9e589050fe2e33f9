//! Audit events emitted while processing messages.
//!
//! Events are buffered per message and discarded together with the message's writes if it fails.
//! They are never read back by the engine.

use custody_primitives::{
    asset::{Asset, Coin},
    chain::Chain,
    ids::{NodeAddress, PubKey, TxId},
    txout::TxOutItem,
    types::{Amount, BlockHeight},
    vault::VaultStatus,
};

/// Something that happened to the custody state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustodyEvent {
    /// A vault was credited for an inbound that reached consensus.
    PendingLiquidity {
        /// The inbound transaction.
        tx_id: TxId,
        /// The vault credited.
        vault: PubKey,
        /// The coins credited.
        coins: Vec<Coin>,
    },

    /// An observation reached consensus.
    ConsensusReached {
        /// The observed transaction.
        tx_id: TxId,
        /// The native height of consensus.
        height: BlockHeight,
    },

    /// An inbound became final and was dispatched.
    Finalised {
        /// The observed transaction.
        tx_id: TxId,
        /// The native height of finalisation.
        height: BlockHeight,
    },

    /// An observation was reverted.
    Reverted {
        /// The reverted transaction.
        tx_id: TxId,
        /// The native height of the revert.
        height: BlockHeight,
    },

    /// An outbound payment was appended to a queue.
    OutboundScheduled {
        /// The queue height.
        height: BlockHeight,
        /// The scheduled item.
        item: TxOutItem,
    },

    /// A protocol fee was charged on an outbound.
    Fee {
        /// The inbound the outbound pays out against.
        in_hash: TxId,
        /// The fee in the paid asset.
        coin: Coin,
        /// The native value credited to the reserve.
        reserve_credit: Amount,
    },

    /// Slash points of a validator changed.
    SlashPoints {
        /// The validator.
        node: NodeAddress,
        /// Points added, negative when refunded.
        delta: i64,
        /// Why the points changed.
        reason: String,
    },

    /// Bond was taken from a validator.
    BondSlashed {
        /// The validator.
        node: NodeAddress,
        /// Bond taken.
        amount: Amount,
        /// Why the bond was taken.
        reason: String,
    },

    /// A pool was compensated from slashed bonds.
    PoolSlashed {
        /// The pool's asset.
        asset: Asset,
        /// Asset removed from the pool.
        asset_amount: Amount,
        /// Native asset added to the pool.
        native_amount: Amount,
    },

    /// A vault changed status.
    VaultStatusChanged {
        /// The vault.
        vault: PubKey,
        /// The previous status.
        from: VaultStatus,
        /// The new status.
        to: VaultStatus,
    },

    /// Custody activity on a chain was halted.
    ChainHalted {
        /// The chain.
        chain: Chain,
        /// Height of the halt.
        height: BlockHeight,
    },

    /// A validator was jailed.
    Jailed {
        /// The validator.
        node: NodeAddress,
        /// Height until which the validator is jailed.
        until: BlockHeight,
        /// Why the validator was jailed.
        reason: String,
    },

    /// An outbound that was not signed in time was moved.
    OutboundReassigned {
        /// The inbound the outbound pays out against.
        in_hash: TxId,
        /// The vault that failed to sign.
        from_vault: PubKey,
        /// The vault the outbound was moved to; the same vault when no other could take it.
        to_vault: PubKey,
        /// The queue height of the new item.
        height: BlockHeight,
    },

    /// An outbound was observed leaving a vault.
    OutboundObserved {
        /// The outbound transaction.
        tx_id: TxId,
        /// The vault that paid.
        vault: PubKey,
        /// Whether a scheduled item authorized the payment.
        authorized: bool,
    },
}
