//! Bonded validators.

use std::fmt;

use arbitrary::Arbitrary;
use serde::{Deserialize, Serialize};

use crate::{
    ids::{NodeAddress, PubKey},
    types::{Amount, BlockHeight},
};

/// Lifecycle status of a validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Arbitrary)]
pub enum NodeStatus {
    /// Bonded but not part of the active set.
    Standby,
    /// Part of the active set: observes, signs and votes.
    Active,
    /// Removed from service.
    Disabled,
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeStatus::Standby => "Standby",
            NodeStatus::Active => "Active",
            NodeStatus::Disabled => "Disabled",
        };
        f.write_str(s)
    }
}

/// Accumulated penalty scores of a validator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlashPoints {
    /// Points accrued for failing to observe.
    pub observation: u64,

    /// Points accrued for failing to sign outbound transactions.
    pub signing: u64,
}

impl SlashPoints {
    /// Total points across both counters.
    pub const fn total(&self) -> u64 {
        self.observation.saturating_add(self.signing)
    }

    /// Reduces both counters by `amount`, stopping at zero.
    pub fn decay(&mut self, amount: u64) {
        self.observation = self.observation.saturating_sub(amount);
        self.signing = self.signing.saturating_sub(amount);
    }
}

/// A bonded validator node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    /// The node's account address.
    pub address: NodeAddress,

    /// The node's public key, as used in vault memberships.
    pub pub_key: PubKey,

    /// Bonded stake in the native asset.
    pub bond: Amount,

    /// Current status.
    pub status: NodeStatus,

    /// Height at which the node last became active.
    pub active_since: BlockHeight,

    /// The node is excluded from new assignments until this height.
    pub jail_until: BlockHeight,

    /// Why the node was last jailed.
    pub jail_reason: String,

    /// Accumulated slash points.
    pub slash_points: SlashPoints,
}

impl Validator {
    /// Creates a new standby validator with the given bond.
    pub fn new(address: NodeAddress, pub_key: PubKey, bond: Amount) -> Self {
        Self {
            address,
            pub_key,
            bond,
            status: NodeStatus::Standby,
            active_since: 0,
            jail_until: 0,
            jail_reason: String::new(),
            slash_points: SlashPoints::default(),
        }
    }

    /// Returns whether the node is currently active.
    pub fn is_active(&self) -> bool {
        self.status == NodeStatus::Active
    }

    /// Returns whether the node is jailed at `height`.
    pub const fn is_jailed(&self, height: BlockHeight) -> bool {
        self.jail_until > height
    }

    /// Reduces the bond by at most `amount` and returns how much was actually taken.
    pub fn reduce_bond(&mut self, amount: Amount) -> Amount {
        let taken = amount.min(self.bond);
        self.bond -= taken;
        taken
    }
}
