//! The state machine that collects votes that an external transaction was dropped by its chain.
//!
//! Once a supermajority of active validators agrees, the observation voter of the transaction is
//! reverted. Votes arriving after that are recorded but have no effect.

use std::{collections::BTreeSet, fmt};

use custody_primitives::{
    ids::{NodeAddress, TxId},
    types::BlockHeight,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    state_machine::{SMOutput, StateMachine},
    voter::config::VoterCfg,
};

/// The lifecycle of an errata vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrataState {
    /// Votes are being collected.
    Collecting,

    /// A supermajority voted and the revert was triggered.
    Triggered {
        /// Native height at which the supermajority was reached.
        height: BlockHeight,
    },
}

impl fmt::Display for ErrataState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrataState::Collecting => write!(f, "Collecting"),
            ErrataState::Triggered { height } => write!(f, "Triggered at {height}"),
        }
    }
}

/// The events that affect an errata voter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrataEvent {
    /// A validator voted that the transaction was dropped.
    Vote {
        /// The voting validator.
        signer: NodeAddress,
    },
}

impl fmt::Display for ErrataEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrataEvent::Vote { signer } => write!(f, "Vote from {signer}"),
        }
    }
}

/// The duties emitted by an errata voter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrataDuty {
    /// Revert the observation voter of the transaction.
    RevertObservation {
        /// The dropped transaction.
        tx_id: TxId,
    },
}

/// Errors that can occur in the errata voter.
#[derive(Debug, Clone, Error)]
pub enum ErrataError {
    /// The validator already voted.
    #[error("Received a duplicate event {event} in state {state}")]
    Duplicate {
        /// The state in which the duplicate was received.
        state: ErrataState,
        /// The duplicate event.
        event: String,
    },
}

/// The result type for operations in the errata voter.
pub type ErrataResult<T> = Result<T, ErrataError>;

/// Votes that one external transaction was dropped by its chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrataVoter {
    tx_id: TxId,
    signers: BTreeSet<NodeAddress>,
    state: ErrataState,
}

impl ErrataVoter {
    /// Creates an empty errata voter for `tx_id`.
    pub const fn new(tx_id: TxId) -> Self {
        Self {
            tx_id,
            signers: BTreeSet::new(),
            state: ErrataState::Collecting,
        }
    }

    /// The id of the dropped transaction.
    pub const fn tx_id(&self) -> &TxId {
        &self.tx_id
    }

    /// The current state.
    pub const fn state(&self) -> &ErrataState {
        &self.state
    }

    /// The validators that voted.
    pub const fn signers(&self) -> &BTreeSet<NodeAddress> {
        &self.signers
    }
}

impl StateMachine for ErrataVoter {
    type Config = VoterCfg;
    type Duty = ErrataDuty;
    type Event = ErrataEvent;
    type Error = ErrataError;

    fn process_event(
        &mut self,
        cfg: &Self::Config,
        event: Self::Event,
    ) -> ErrataResult<SMOutput<ErrataDuty>> {
        let ErrataEvent::Vote { signer } = &event;
        if self.signers.contains(signer) {
            return Err(ErrataError::Duplicate {
                state: self.state.clone(),
                event: event.to_string(),
            });
        }

        let ErrataEvent::Vote { signer } = event;
        self.signers.insert(signer);

        if self.state != ErrataState::Collecting {
            return Ok(SMOutput::new());
        }

        let active = self
            .signers
            .iter()
            .filter(|s| cfg.active_signers.contains(*s))
            .count();
        if !cfg.is_consensus(active) {
            return Ok(SMOutput::new());
        }

        self.state = ErrataState::Triggered { height: cfg.height };
        Ok(SMOutput::with_duties(vec![ErrataDuty::RevertObservation {
            tx_id: self.tx_id.clone(),
        }]))
    }
}
