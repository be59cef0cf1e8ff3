//! Common test utilities
//!
//! This module is shared across all integration tests

pub mod fixtures;
pub mod recorder;

#[allow(unused_imports)]
pub use fixtures::{engine_config, Harness};
#[allow(unused_imports)]
pub use recorder::RecordingSink;
