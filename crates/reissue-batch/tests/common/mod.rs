//! Common test utilities for reissue-batch
//!
//! - Mock transport, connections, requests and sessions
//! - A presenter that holds notices until the test dismisses them
//! - Builders for outcomes and managers

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod builders;
pub mod mocks;

pub use builders::*;
pub use mocks::*;
