//! This crate provides test-utilities shared by the crates of the custody core.
//!
//! These utilities are mostly used to generate arbitrary values and deterministic fixtures for
//! testing purposes.

pub mod arbitrary_generator;
pub mod fixtures;

pub mod prelude {
    //! Re-exports of the test utilities.

    pub use crate::{
        arbitrary_generator::{arb_amount, arb_gas_coin, arb_txid, ArbitraryGenerator},
        fixtures::*,
    };
}
