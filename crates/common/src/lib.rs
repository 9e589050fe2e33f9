//! Crate includes reusable utils for embedders of the custody core.
//! Such as initializing the tracing framework and whatever else.

pub mod logging;

// Re-export tracing crate for convenience.
pub use tracing;
