//! Generic state machine infrastructure for the custody engine.
//!
//! The voters that decide what happened on external chains are state machines: each one reacts
//! to events and emits duties that the surrounding ledger performs against the store.

/// Generic output from any state machine after processing an event.
///
/// The type parameter ensures that each state machine can only emit duties that are appropriate
/// for that state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SMOutput<D> {
    /// The duties that need to be performed by the caller.
    pub duties: Vec<D>,
}

impl<D> Default for SMOutput<D> {
    fn default() -> Self {
        Self { duties: Vec::new() }
    }
}

impl<D> SMOutput<D> {
    /// Creates a new empty output.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an output with the given duties.
    pub const fn with_duties(duties: Vec<D>) -> Self {
        Self { duties }
    }

    /// Returns whether no duty was emitted.
    pub fn is_empty(&self) -> bool {
        self.duties.is_empty()
    }
}

/// Trait for all state machines in the custody engine.
///
/// Each implementation specifies its own configuration, duty, event and error types.
pub trait StateMachine {
    /// Configuration the machine needs to process an event, e.g. the current active set.
    type Config;

    /// The type of duties this state machine can emit.
    type Duty;

    /// The type of events this state machine can process.
    type Event;

    /// The error type returned when event processing fails.
    type Error;

    /// Processes an event and returns the duties to perform, or an error.
    ///
    /// On error the machine is left unchanged.
    fn process_event(
        &mut self,
        cfg: &Self::Config,
        event: Self::Event,
    ) -> Result<SMOutput<Self::Duty>, Self::Error>;
}
