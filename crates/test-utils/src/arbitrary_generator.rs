//! Module to generate arbitrary values for testing.

use arbitrary::{Arbitrary, Unstructured};
use custody_primitives::{
    asset::{Asset, Coin},
    chain::Chain,
    ids::TxId,
    types::{Amount, ONE},
};
use proptest::prelude::*;
use rand::{rngs::OsRng, CryptoRng, RngCore};

/// The default buffer size for the `ArbitraryGenerator`.
const ARB_GEN_LEN: usize = 1024;

/// A generator for producing arbitrary data based on a persistent buffer.
#[derive(Debug)]
pub struct ArbitraryGenerator {
    /// Persistent buffer
    buf: Vec<u8>,
}

impl Default for ArbitraryGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ArbitraryGenerator {
    /// Creates a new `ArbitraryGenerator` with a default buffer size.
    pub fn new() -> Self {
        Self::new_with_size(ARB_GEN_LEN)
    }

    /// Creates a new `ArbitraryGenerator` with a specified buffer size.
    pub fn new_with_size(s: usize) -> Self {
        Self { buf: vec![0u8; s] }
    }

    /// Generates an arbitrary instance of type `T` using the default RNG, [`OsRng`].
    pub fn generate<'a, T>(&'a mut self) -> T
    where
        T: Arbitrary<'a> + Clone,
    {
        self.generate_with_rng::<T, OsRng>(&mut OsRng)
    }

    /// Generates an arbitrary instance of type `T` from the bytes of `rng`.
    pub fn generate_with_rng<'a, T, R>(&'a mut self, rng: &mut R) -> T
    where
        T: Arbitrary<'a> + Clone,
        R: RngCore + CryptoRng,
    {
        rng.fill_bytes(&mut self.buf);
        let mut u = Unstructured::new(&self.buf);
        T::arbitrary(&mut u).expect("Failed to generate arbitrary instance")
    }

    /// Generates a random transaction id.
    pub fn txid(&mut self) -> TxId {
        TxId::from_bytes(self.generate())
    }
}

/// Generates an arbitrary transaction id.
pub fn arb_txid() -> impl Strategy<Value = TxId> {
    any::<[u8; 32]>().prop_map(TxId::from_bytes)
}

/// Generates an arbitrary external chain.
pub fn arb_external_chain() -> impl Strategy<Value = Chain> {
    prop::sample::select(
        Chain::ALL
            .into_iter()
            .filter(|c| !c.is_native())
            .collect::<Vec<_>>(),
    )
}

/// Generates a non-zero amount of at most `max_units` whole units.
pub fn arb_amount(max_units: u64) -> impl Strategy<Value = Amount> {
    1..=max_units.saturating_mul(ONE)
}

/// Generates a coin of the gas asset of an arbitrary external chain.
pub fn arb_gas_coin(max_units: u64) -> impl Strategy<Value = Coin> {
    (arb_external_chain(), arb_amount(max_units))
        .prop_map(|(chain, amount)| Coin::new(chain.gas_asset(), amount))
}

/// Generates an arbitrary asset on `chain`.
pub fn arb_asset_on(chain: Chain) -> impl Strategy<Value = Asset> {
    "[A-Z]{2,5}".prop_map(move |symbol| Asset::new(chain, &symbol))
}
