//! Transactions as reported by external-chain observers.

use serde::{Deserialize, Serialize};

use crate::{
    asset::Coin,
    chain::Chain,
    ids::{Address, PubKey, TxId},
    types::{Amount, BlockHeight},
};

/// A transaction on an external chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tx {
    /// The id of the transaction on its chain.
    pub id: TxId,

    /// The chain the transaction was made on.
    pub chain: Chain,

    /// The sender.
    pub from_address: Address,

    /// The recipient.
    pub to_address: Address,

    /// The coins transferred.
    pub coins: Vec<Coin>,

    /// The gas paid by the sender.
    pub gas: Vec<Coin>,

    /// The raw memo attached to the transaction.
    pub memo: String,
}

impl Tx {
    /// Total amount of the chain's gas asset carried by the transaction.
    pub fn gas_asset_value(&self) -> Amount {
        let gas_asset = self.chain.gas_asset();
        self.coins
            .iter()
            .filter(|c| c.asset == gas_asset)
            .fold(0, |acc: Amount, c| acc.saturating_add(c.amount))
    }
}

/// A single validator's report of a transaction it saw on an external chain.
///
/// Two reports are considered the same observation only if they are byte-identical. The
/// `finalise_height` tells whether the observer considers the transaction final: an observation
/// is final once `finalise_height == block_height`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedTx {
    /// The transaction.
    pub tx: Tx,

    /// Public key of the vault the transaction was sent to (inbound) or from (outbound).
    pub observed_pub_key: PubKey,

    /// Height of the external block that included the transaction.
    pub block_height: BlockHeight,

    /// External height at which the observer considers the transaction final.
    pub finalise_height: BlockHeight,
}

impl ObservedTx {
    /// Returns whether the observer reported the transaction as final.
    pub const fn is_final(&self) -> bool {
        self.finalise_height == self.block_height
    }

    /// Returns whether both observations describe the same transaction content, regardless of
    /// whether each was reported as final.
    pub fn same_content(&self, other: &Self) -> bool {
        self.tx == other.tx
            && self.observed_pub_key == other.observed_pub_key
            && self.block_height == other.block_height
    }

    /// Returns the reason this observation is malformed, if any.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.tx.id.is_empty() {
            return Err("empty tx id");
        }
        if self.observed_pub_key.is_empty() {
            return Err("empty observed pubkey");
        }
        if self.tx.coins.is_empty() {
            return Err("no coins");
        }
        if self.finalise_height < self.block_height {
            return Err("finalise height below block height");
        }

        Ok(())
    }
}
