//! Errors related to the state transitions in the Observation Voter.

use thiserror::Error;

use crate::voter::{events::VoterEvent, state::VoterState};

/// Errors that can occur in the Observation Voter.
#[derive(Debug, Clone, Error)]
pub enum VoterError {
    /// An invalid event was received for the current state.
    #[error("Received invalid event {event} in state {state}; reason: {reason:?}")]
    InvalidEvent {
        /// The state in which the event was received.
        state: VoterState,
        /// The invalid event that was received.
        event: String,
        /// The reason for the invalidity.
        reason: Option<String>,
    },

    /// The event was already applied.
    #[error("Received a duplicate event {event} in state {state}")]
    Duplicate {
        /// The state in which the duplicate event was received.
        state: VoterState,
        /// The duplicate event.
        event: String,
    },

    /// An event was rejected in the current state.
    ///
    /// This can happen, for example, if the event is no longer relevant due to a state change.
    #[error("Event {event} rejected in state {state}, reason: {reason}")]
    Rejected {
        /// The state in which the event was rejected.
        state: VoterState,
        /// The rejected event.
        event: String,
        /// The reason for the rejection.
        reason: String,
    },
}

impl VoterError {
    pub(super) fn invalid_event(
        state: &VoterState,
        event: &VoterEvent,
        reason: Option<String>,
    ) -> Self {
        VoterError::InvalidEvent {
            state: state.clone(),
            event: event.to_string(),
            reason,
        }
    }

    pub(super) fn duplicate(state: &VoterState, event: &VoterEvent) -> Self {
        VoterError::Duplicate {
            state: state.clone(),
            event: event.to_string(),
        }
    }

    pub(super) fn rejected(
        state: &VoterState,
        event: &VoterEvent,
        reason: impl Into<String>,
    ) -> Self {
        VoterError::Rejected {
            state: state.clone(),
            event: event.to_string(),
            reason: reason.into(),
        }
    }
}

/// The result type for operations in the Observation Voter.
pub type VoterResult<T> = Result<T, VoterError>;
