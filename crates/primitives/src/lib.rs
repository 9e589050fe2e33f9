//! This crate contains general types, traits and pure functions that need to be shared across
//! multiple crates of the custody core.
//!
//! It lies at the bottom of the crate-hierarchy in this workspace i.e., it does not depend on any
//! other crate in this workspace.

pub mod asset;
pub mod chain;
pub mod errors;
pub mod ids;
pub mod memo;
pub mod network_fee;
pub mod pool;
pub mod tx;
pub mod txout;
pub mod types;
pub mod validator;
pub mod vault;

pub mod prelude {
    //! Re-exports of the most commonly used primitives.

    pub use crate::{
        asset::{Asset, Coin},
        chain::Chain,
        ids::{Address, NodeAddress, PubKey, TxId},
        memo::{Memo, MemoKind, MemoParser, StandardMemoParser},
        network_fee::NetworkFee,
        pool::Pool,
        tx::{ObservedTx, Tx},
        txout::{TxOut, TxOutItem},
        types::{Amount, BlockHeight, ONE},
        validator::{NodeStatus, SlashPoints, Validator},
        vault::{Vault, VaultStatus, VaultType},
    };
}
