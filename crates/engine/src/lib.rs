//! This crate implements the custody core of a cross-chain liquidity network.
//!
//! Bonded validators observe external chains and submit what they saw. The core decides by
//! supermajority which transactions happened, credits the vaults that received funds, schedules
//! the outbound payments requested for them and penalizes validators that fail to observe or to
//! sign. Everything runs against a [`custody_db::kv::KvStore`] through a [`context::CustodyCtx`];
//! [`engine::Engine`] wraps every operation in its own store transaction.

pub mod context;
pub mod engine;
pub mod errata;
pub mod errors;
pub mod events;
pub mod handler;
pub mod ledger;
pub mod pricing;
pub mod scheduler;
pub mod slasher;
pub mod state_machine;
pub mod store;
pub mod validators;
pub mod vaults;
pub mod voter;

#[cfg(test)]
pub(crate) mod testing;

pub mod prelude {
    //! Re-exports of the types embedders need.

    pub use crate::{
        context::CustodyCtx,
        engine::Engine,
        errors::{EngineError, EngineResult, ErrorKind},
        events::CustodyEvent,
        handler::{HandlerError, HandlerResult, InboundHandler, NoopHandler},
        ledger::{IgnoreReason, SubmitOutcome},
        pricing::PricingOracle,
        scheduler::ScheduledOutbound,
        slasher::{double_sign::DoubleSignEvidence, vault::VaultSlash},
        store::CustodyStore,
        voter::state::VoterState,
    };
}
