//! Fund-holding vaults.

use std::{collections::BTreeMap, fmt};

use arbitrary::Arbitrary;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    asset::{Asset, Coin},
    chain::Chain,
    ids::{Address, PubKey},
    types::{Amount, BlockHeight},
};

/// Custody model of a vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Arbitrary)]
pub enum VaultType {
    /// Co-controlled by the whole active set through threshold signing.
    SharedCustody,
    /// Controlled by a single node, funded by shared-custody vaults for fast payouts.
    PerNodeCustody,
}

/// Lifecycle status of a vault.
///
/// Statuses only ever advance in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Arbitrary)]
pub enum VaultStatus {
    /// Accepts inbound funds and pays outbound.
    Active,
    /// Being migrated away from; still pays outbound when needed.
    Retiring,
    /// No longer in use.
    Inactive,
}

impl fmt::Display for VaultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VaultStatus::Active => "Active",
            VaultStatus::Retiring => "Retiring",
            VaultStatus::Inactive => "Inactive",
        };
        f.write_str(s)
    }
}

/// Error returned when trying to move a vault's status backwards.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("vault status cannot move from {from} to {to}")]
pub struct InvalidStatusTransition {
    /// The current status.
    pub from: VaultStatus,
    /// The requested status.
    pub to: VaultStatus,
}

/// A vault holding funds on one or more external chains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    /// The vault's public key.
    pub pub_key: PubKey,

    /// The custody model.
    pub vault_type: VaultType,

    /// Current status.
    pub status: VaultStatus,

    /// Height at which the current status was entered.
    pub status_since: BlockHeight,

    /// Balance per asset. Zero balances are removed.
    coins: BTreeMap<Asset, Amount>,

    /// Public keys of the validators that co-own signing rights.
    pub membership: Vec<PubKey>,

    /// The vault's address on each chain.
    pub addresses: BTreeMap<Chain, Address>,

    /// Number of inbound transactions credited to this vault.
    pub inbound_tx_count: u64,

    /// Heights at which funding was sent to this vault and the counterparty leg is still
    /// awaited.
    pending_tx_block_heights: Vec<BlockHeight>,

    /// Set when a slash crossed the pause threshold; a frozen vault is never assigned new
    /// outbound payments.
    pub frozen: bool,
}

impl Vault {
    /// Creates a new vault without funds.
    pub fn new(
        pub_key: PubKey,
        vault_type: VaultType,
        status: VaultStatus,
        status_since: BlockHeight,
        membership: Vec<PubKey>,
    ) -> Self {
        Self {
            pub_key,
            vault_type,
            status,
            status_since,
            coins: BTreeMap::new(),
            membership,
            addresses: BTreeMap::new(),
            inbound_tx_count: 0,
            pending_tx_block_heights: Vec::new(),
            frozen: false,
        }
    }

    /// Sets the vault's address on `chain`.
    pub fn with_address(mut self, chain: Chain, address: Address) -> Self {
        self.addresses.insert(chain, address);
        self
    }

    /// Returns whether the vault is a shared-custody vault.
    pub fn is_shared(&self) -> bool {
        self.vault_type == VaultType::SharedCustody
    }

    /// Returns whether the vault is a per-node-custody vault.
    pub fn is_per_node(&self) -> bool {
        self.vault_type == VaultType::PerNodeCustody
    }

    /// Returns the balance of `asset`.
    pub fn balance(&self, asset: &Asset) -> Amount {
        self.coins.get(asset).copied().unwrap_or_default()
    }

    /// Returns all non-zero balances.
    pub fn coins(&self) -> impl Iterator<Item = Coin> + '_ {
        self.coins
            .iter()
            .map(|(asset, amount)| Coin::new(asset.clone(), *amount))
    }

    /// Returns whether the vault holds any funds.
    pub fn has_funds(&self) -> bool {
        !self.coins.is_empty()
    }

    /// Adds `coins` to the balances.
    pub fn add_funds<'a>(&mut self, coins: impl IntoIterator<Item = &'a Coin>) {
        for coin in coins {
            if coin.amount == 0 {
                continue;
            }
            let entry = self.coins.entry(coin.asset.clone()).or_default();
            *entry = entry.saturating_add(coin.amount);
        }
    }

    /// Subtracts `coin` from the balance, clamped at the available amount.
    ///
    /// Returns the amount actually subtracted.
    pub fn sub_funds(&mut self, coin: &Coin) -> Amount {
        let Some(balance) = self.coins.get_mut(&coin.asset) else {
            return 0;
        };

        let taken = coin.amount.min(*balance);
        *balance -= taken;
        if *balance == 0 {
            self.coins.remove(&coin.asset);
        }

        taken
    }

    /// Returns whether `pub_key` is a member of this vault.
    pub fn contains(&self, pub_key: &PubKey) -> bool {
        self.membership.contains(pub_key)
    }

    /// Returns the vault's address on `chain`, if any.
    pub fn address(&self, chain: Chain) -> Option<&Address> {
        self.addresses.get(&chain)
    }

    /// Advances the status. Moving backwards is rejected; re-entering the same status is a
    /// no-op that keeps the original `status_since`.
    pub fn advance_status(
        &mut self,
        status: VaultStatus,
        height: BlockHeight,
    ) -> Result<(), InvalidStatusTransition> {
        if status < self.status {
            return Err(InvalidStatusTransition {
                from: self.status,
                to: status,
            });
        }

        if status != self.status {
            self.status = status;
            self.status_since = height;
        }

        Ok(())
    }

    /// Heights whose counterparty leg is still awaited.
    pub fn pending_tx_block_heights(&self) -> &[BlockHeight] {
        &self.pending_tx_block_heights
    }

    /// Records that a funding leg was sent at `height`.
    pub fn append_pending_height(&mut self, height: BlockHeight) {
        self.pending_tx_block_heights.push(height);
    }

    /// Clears one pending entry for `height`. Returns whether one was found.
    pub fn remove_pending_height(&mut self, height: BlockHeight) -> bool {
        match self
            .pending_tx_block_heights
            .iter()
            .position(|h| *h == height)
        {
            Some(idx) => {
                self.pending_tx_block_heights.remove(idx);
                true
            }
            None => false,
        }
    }
}
