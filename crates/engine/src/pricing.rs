//! Spot conversion between assets and the native asset.

use custody_db::kv::KvStore;
use custody_primitives::{
    asset::{Asset, Coin},
    types::Amount,
};

use crate::{
    errors::{EngineError, EngineResult},
    store::CustodyStore,
};

/// Converts amounts between an asset and the native asset.
pub trait PricingOracle {
    /// Value of `amount` of `asset` in the native asset.
    fn asset_value_in_rune(&self, asset: &Asset, amount: Amount) -> EngineResult<Amount>;

    /// Value of `amount` of the native asset in `asset`.
    fn rune_value_in_asset(&self, asset: &Asset, amount: Amount) -> EngineResult<Amount>;

    /// Native value of `coin`.
    fn coin_value_in_rune(&self, coin: &Coin) -> EngineResult<Amount> {
        self.asset_value_in_rune(&coin.asset, coin.amount)
    }

    /// Native value of `coin`, zero if its asset has no pool.
    fn coin_value_or_zero(&self, coin: &Coin) -> EngineResult<Amount> {
        match self.coin_value_in_rune(coin) {
            Err(EngineError::MissingPool(_)) => Ok(0),
            res => res,
        }
    }
}

impl<T: KvStore + ?Sized> PricingOracle for T {
    fn asset_value_in_rune(&self, asset: &Asset, amount: Amount) -> EngineResult<Amount> {
        if asset.is_native() {
            return Ok(amount);
        }

        let pool = self
            .pool(asset)?
            .ok_or_else(|| EngineError::MissingPool(asset.clone()))?;
        Ok(pool.asset_value_in_native(amount))
    }

    fn rune_value_in_asset(&self, asset: &Asset, amount: Amount) -> EngineResult<Amount> {
        if asset.is_native() {
            return Ok(amount);
        }

        let pool = self
            .pool(asset)?
            .ok_or_else(|| EngineError::MissingPool(asset.clone()))?;
        Ok(pool.native_value_in_asset(amount))
    }
}

#[cfg(test)]
mod tests {
    use custody_db::inmemory::InMemoryStore;
    use custody_primitives::{asset::Coin, chain::Chain, pool::Pool, types::ONE};

    use super::*;

    #[test]
    fn test_spot_prices_from_stored_pools() {
        let mut store = InMemoryStore::new();
        let btc = Chain::Btc.gas_asset();
        store
            .put_pool(&Pool::new(btc.clone(), 20_000 * ONE, ONE))
            .expect("must store");

        assert_eq!(
            store.asset_value_in_rune(&btc, ONE / 10).expect("priced"),
            2_000 * ONE
        );
        assert_eq!(
            store.rune_value_in_asset(&btc, 200 * ONE).expect("priced"),
            ONE / 100
        );
        assert_eq!(
            store
                .asset_value_in_rune(&Asset::native(), 7)
                .expect("native at par"),
            7
        );

        let err = store
            .asset_value_in_rune(&Chain::Eth.gas_asset(), ONE)
            .expect_err("no pool");
        assert!(matches!(err, EngineError::MissingPool(_)));
        assert_eq!(
            store
                .coin_value_or_zero(&Coin::new(Chain::Eth.gas_asset(), ONE))
                .expect("zero without pool"),
            0
        );
    }
}
