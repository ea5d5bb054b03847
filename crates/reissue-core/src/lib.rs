//! # reissue-core
//!
//! Core library for Reissue providing:
//! - Shared retry vocabulary (dispositions, connection error-behavior flags)
//! - Runtime configuration types and the hierarchical loader
//! - Error types
//! - Logging bootstrap

pub mod config;
pub mod error;
pub mod logging;
pub mod types;
pub mod utils;

pub use config::HierarchicalConfigLoader;
pub use error::{Error, Result};
pub use types::{Disposition, ErrorBehavior, RuntimeConfig};
pub use utils::get_home_dir;
