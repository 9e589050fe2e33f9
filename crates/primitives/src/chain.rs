//! External chains that the custody core holds funds on.

use std::{fmt, str::FromStr};

use arbitrary::Arbitrary;
use serde::{Deserialize, Serialize};

use crate::{
    asset::Asset,
    errors::ParseError,
    types::{Amount, ONE},
};

/// A chain that the network observes.
///
/// [`Chain::Thor`] is the native chain on which this core executes; every other chain is external.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Arbitrary,
)]
pub enum Chain {
    /// The native chain.
    Thor,
    /// Bitcoin.
    Btc,
    /// Bitcoin Cash.
    Bch,
    /// Litecoin.
    Ltc,
    /// Dogecoin.
    Doge,
    /// Ethereum.
    Eth,
    /// Avalanche C-chain.
    Avax,
    /// Cosmos hub.
    Gaia,
    /// BNB beacon chain.
    Bnb,
}

impl Chain {
    /// All supported chains in their canonical order.
    pub const ALL: [Chain; 9] = [
        Chain::Thor,
        Chain::Btc,
        Chain::Bch,
        Chain::Ltc,
        Chain::Doge,
        Chain::Eth,
        Chain::Avax,
        Chain::Gaia,
        Chain::Bnb,
    ];

    /// Returns the ticker of this chain.
    pub const fn ticker(&self) -> &'static str {
        match self {
            Chain::Thor => "THOR",
            Chain::Btc => "BTC",
            Chain::Bch => "BCH",
            Chain::Ltc => "LTC",
            Chain::Doge => "DOGE",
            Chain::Eth => "ETH",
            Chain::Avax => "AVAX",
            Chain::Gaia => "GAIA",
            Chain::Bnb => "BNB",
        }
    }

    /// Returns whether this is the native chain.
    pub const fn is_native(&self) -> bool {
        matches!(self, Chain::Thor)
    }

    /// Returns the asset used to pay gas on this chain.
    pub fn gas_asset(&self) -> Asset {
        match self {
            Chain::Thor => Asset::native(),
            Chain::Gaia => Asset::new(*self, "ATOM"),
            _ => Asset::new(*self, self.ticker()),
        }
    }

    /// Estimated amount of the gas asset issued per block.
    ///
    /// Used to scale the confirmation depth required before a large inbound is considered final:
    /// an attacker would have to forgo more block rewards than the value they try to double-spend.
    /// Zero means the chain has instant finality and no depth is required.
    pub const fn block_issuance(&self) -> Amount {
        match self {
            Chain::Btc | Chain::Bch => 6 * ONE + ONE / 4,
            Chain::Ltc => 12 * ONE + ONE / 2,
            Chain::Doge => 10_000 * ONE,
            Chain::Thor | Chain::Eth | Chain::Avax | Chain::Gaia | Chain::Bnb => 0,
        }
    }

    /// Number of external confirmations required for `value` of the gas asset, i.e.
    /// `ceil(value / block_issuance)`.
    pub const fn required_confirmations(&self, value: Amount) -> u64 {
        let issuance = self.block_issuance();
        if issuance == 0 {
            return 0;
        }

        value.div_ceil(issuance)
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ticker())
    }
}

impl FromStr for Chain {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        Chain::ALL
            .into_iter()
            .find(|c| c.ticker() == upper)
            .ok_or_else(|| ParseError::UnknownChain(s.to_string()))
    }
}
