//! Liquidity pool balances, as far as the custody core needs them.
//!
//! The swap curve itself lives outside this core; only spot conversion and the balance
//! adjustments made by fee and slash accounting happen here.

use serde::{Deserialize, Serialize};

use crate::{
    asset::Asset,
    types::{mul_div, Amount},
};

/// Balances of a pool pairing the native asset with `asset`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    /// The non-native asset of the pair.
    pub asset: Asset,

    /// Native-asset depth.
    pub balance_native: Amount,

    /// Asset depth.
    pub balance_asset: Amount,
}

impl Pool {
    /// Creates a new pool.
    pub const fn new(asset: Asset, balance_native: Amount, balance_asset: Amount) -> Self {
        Self {
            asset,
            balance_native,
            balance_asset,
        }
    }

    /// Returns whether the pool has depth on both sides.
    pub const fn is_empty(&self) -> bool {
        self.balance_native == 0 || self.balance_asset == 0
    }

    /// Spot value of `amount` of the asset in the native asset.
    pub fn asset_value_in_native(&self, amount: Amount) -> Amount {
        if self.is_empty() {
            return 0;
        }
        mul_div(amount, self.balance_native, self.balance_asset)
    }

    /// Spot value of `amount` of the native asset in the pool's asset.
    pub fn native_value_in_asset(&self, amount: Amount) -> Amount {
        if self.is_empty() {
            return 0;
        }
        mul_div(amount, self.balance_asset, self.balance_native)
    }
}
