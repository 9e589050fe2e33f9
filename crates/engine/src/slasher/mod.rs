//! The accountability engine.
//!
//! - [`observation`] penalizes active validators that did not observe a transaction that reached
//!   consensus.
//! - [`signing`] penalizes the owners of vaults that did not sign an outbound in time and moves
//!   the outbound to another vault.
//! - [`vault`] takes bond from the members of a vault that lost funds.
//! - [`double_sign`] burns bond of validators that signed two conflicting blocks.

pub mod double_sign;
pub mod observation;
pub mod signing;
pub mod vault;
