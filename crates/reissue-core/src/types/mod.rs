//! Type definitions shared across Reissue crates

mod disposition;
mod error_behavior;
mod runtime_config;

pub use disposition::*;
pub use error_behavior::*;
pub use runtime_config::*;
