//! The state machine that decides what happened to one external transaction.
//!
//! This state machine handles the following:
//!
//! - The collection of validators' copies of the transaction into buckets.
//! - Detecting when a copy is backed by a supermajority of active validators.
//! - Detecting when the transaction is final, either through a supermajority of final copies or
//!   through the external chain's depth.
//! - Tracking the outbound payments produced for the transaction until they are all observed.
//! - Reverting the transaction when its chain drops it before it is final.

pub mod config;
pub mod duties;
pub mod errors;
pub mod events;
pub mod machine;
pub mod state;
#[cfg(test)]
mod tests;
mod transitions;
