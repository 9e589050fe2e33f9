//! Generic testing utilities for the engine's state machines.
//!
//! ## Organization
//!
//! - [`transition`] - Value-based transition testing helpers
//! - [`proptest`] - Property-based testing macros
//! - [`world`] - A populated store and contexts over it, for the ledger and scheduler
//!
//! ## Value-Based Testing
//!
//! ```rust,ignore
//! use crate::testing::*;
//!
//! test_transition(
//!     create_sm,
//!     get_state,
//!     &cfg,
//!     Transition {
//!         from_state: VoterState::Pending,
//!         event: VoterEvent::Revert,
//!         expected_state: VoterState::Reverted { consensus_height: None, reverted_height: 10 },
//!         expected_duties: vec![],
//!     },
//! );
//! ```

pub(crate) mod proptest;
pub(crate) mod transition;
pub(crate) mod world;

pub(crate) use transition::{
    test_invalid_transition, test_transition, EventSequence, InvalidTransition, Transition,
};
