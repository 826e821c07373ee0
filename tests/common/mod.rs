//! Common test utilities and helpers
//!
//! Shared by the integration tests:
//! - Binary invocation with an isolated environment (via `shapely_build`)
//! - Source tree fixtures (via `helpers`)

pub(crate) mod helpers;

pub(crate) use helpers::shapely_build;
