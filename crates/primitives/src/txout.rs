//! Scheduled outbound payments.

use serde::{Deserialize, Serialize};

use crate::{
    asset::Coin,
    chain::Chain,
    ids::{Address, PubKey, TxId},
    types::{Amount, BlockHeight},
};

/// One outbound payment scheduled for some block height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutItem {
    /// The destination chain.
    pub chain: Chain,

    /// The destination address.
    pub to_address: Address,

    /// The vault paying out. `None` on a request means the scheduler picks.
    pub vault_pub_key: Option<PubKey>,

    /// What is sent.
    pub coin: Coin,

    /// Memo attached to the outbound transaction.
    pub memo: String,

    /// Maximum gas the vault may spend.
    pub max_gas: Vec<Coin>,

    /// Gas rate to use when building the transaction.
    pub gas_rate: u64,

    /// The inbound transaction this pays out against, or [`TxId::blank`].
    pub in_hash: TxId,

    /// Set once the outbound has been observed on its chain.
    pub out_hash: Option<TxId>,

    /// Protocol fee deducted from the payment, in the coin's asset.
    pub fee: Amount,

    /// Set when the item was moved to another vault and must no longer be sent.
    pub superseded_at: Option<BlockHeight>,
}

impl TxOutItem {
    /// Creates a new outbound request.
    pub fn new(chain: Chain, to_address: Address, coin: Coin, in_hash: TxId) -> Self {
        Self {
            chain,
            to_address,
            vault_pub_key: None,
            coin,
            memo: String::new(),
            max_gas: Vec::new(),
            gas_rate: 0,
            in_hash,
            out_hash: None,
            fee: 0,
            superseded_at: None,
        }
    }

    /// Sets the memo.
    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = memo.into();
        self
    }

    /// Pins the paying vault.
    pub fn with_vault(mut self, vault: PubKey) -> Self {
        self.vault_pub_key = Some(vault);
        self
    }

    /// Returns whether the item is still waiting to be sent.
    pub const fn is_pending(&self) -> bool {
        self.out_hash.is_none() && self.superseded_at.is_none()
    }

    /// Returns whether both items describe the same payment, ignoring gas, fee and progress.
    pub fn same_action(&self, other: &Self) -> bool {
        self.chain == other.chain
            && self.to_address == other.to_address
            && self.vault_pub_key == other.vault_pub_key
            && self.coin == other.coin
            && self.memo == other.memo
            && self.in_hash == other.in_hash
    }
}

/// The ordered queue of outbound payments for one block height.
///
/// Items are only ever appended; insertion order is scheduling order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOut {
    /// The block height at which the items are to be sent.
    pub height: BlockHeight,

    /// The items.
    pub items: Vec<TxOutItem>,
}

impl TxOut {
    /// Creates an empty bucket.
    pub const fn new(height: BlockHeight) -> Self {
        Self {
            height,
            items: Vec::new(),
        }
    }

    /// Items still waiting to be sent.
    pub fn pending(&self) -> impl Iterator<Item = &TxOutItem> {
        self.items.iter().filter(|item| item.is_pending())
    }
}
