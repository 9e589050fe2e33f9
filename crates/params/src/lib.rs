//! This crate contains the consensus-critical parameters that dictate the behavior of the custody
//! core in a way that ensures that all validators come to the same resulting state.
//!
//! Every parameter has a hard-coded default. A [`governance::GovernanceSource`] may override
//! individual values at runtime; invalid overrides are ignored.

mod default;
pub mod errors;
pub mod governance;
pub mod protocol;

pub mod prelude {
    //! Re-exports of the parameter types.

    pub use crate::{
        errors::{ParamsError, ParamsResult},
        governance::{GovernanceSource, MimirOverrides, NoOverrides, ParamKey},
        protocol::ProtocolParams,
    };
}
