//! State transition functions of the Observation Voter.

mod lifecycle;
mod observe;
