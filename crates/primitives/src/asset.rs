//! Assets and coins.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{chain::Chain, errors::ParseError, types::Amount};

/// Symbol of the native asset.
const NATIVE_SYMBOL: &str = "RUNE";

/// An asset identified by the chain it lives on and its symbol, written as `CHAIN.SYMBOL`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Asset {
    /// The chain the asset lives on.
    pub chain: Chain,

    /// The symbol of the asset, uppercase.
    pub symbol: String,
}

impl Asset {
    /// Creates a new asset.
    pub fn new(chain: Chain, symbol: &str) -> Self {
        Self {
            chain,
            symbol: symbol.to_ascii_uppercase(),
        }
    }

    /// The native asset in which bonds, fees and the reserve are denominated.
    pub fn native() -> Self {
        Self::new(Chain::Thor, NATIVE_SYMBOL)
    }

    /// Returns whether this is the native asset.
    pub fn is_native(&self) -> bool {
        self.chain.is_native() && self.symbol == NATIVE_SYMBOL
    }

    /// Returns whether this asset pays gas on its chain.
    pub fn is_gas_asset(&self) -> bool {
        self.chain.gas_asset() == *self
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.chain, self.symbol)
    }
}

impl FromStr for Asset {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (chain, symbol) = s
            .split_once('.')
            .ok_or_else(|| ParseError::MalformedAsset(s.to_string()))?;

        if symbol.is_empty() {
            return Err(ParseError::MalformedAsset(s.to_string()));
        }

        Ok(Self::new(chain.parse()?, symbol))
    }
}

/// An amount of a specific asset.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coin {
    /// The asset.
    pub asset: Asset,

    /// The amount.
    pub amount: Amount,
}

impl Coin {
    /// Creates a new coin.
    pub const fn new(asset: Asset, amount: Amount) -> Self {
        Self { asset, amount }
    }

    /// Returns whether the amount is zero.
    pub const fn is_empty(&self) -> bool {
        self.amount == 0
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.asset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_asset() {
        let asset: Asset = "btc.btc".parse().expect("must parse");
        assert_eq!(asset, Chain::Btc.gas_asset());
        assert!(asset.is_gas_asset());

        let usdt: Asset = "ETH.USDT-0XDAC17".parse().expect("must parse");
        assert!(!usdt.is_gas_asset());
        assert!(!usdt.is_native());

        assert!("BTC".parse::<Asset>().is_err());
        assert!("BTC.".parse::<Asset>().is_err());
        assert!("XYZ.ABC".parse::<Asset>().is_err());
    }

    #[test]
    fn test_native_asset() {
        assert!(Asset::native().is_native());
        assert_eq!(Asset::native().to_string(), "THOR.RUNE");
    }
}
