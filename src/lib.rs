//! shapely-build internal library code
//!
//! Builds Shapely with its optional GEOS speedups extension, falling back
//! to a pure-Python build when no working C toolchain is available.

pub mod capability;
pub mod config;
pub mod debug;
pub mod env_vars;
pub mod extensions;
pub mod metadata;
pub mod orchestrator;
pub mod package;
pub mod platform;
pub mod runtime;
pub mod source;

#[cfg(test)]
mod test_utils;

// Re-export common types for convenience
pub use capability::{BuildConfiguration, DataFiles, HostInfo, detect_capabilities};
pub use config::Config;
pub use debug::{debug_log, init_debug, is_debug_enabled};
pub use extensions::{BuildError, BuildFailure, BuildOutcome, ToolchainErrorKind};
pub use metadata::PackageMetadata;
pub use orchestrator::{BuildReport, BuildState, ConsoleReporter, Orchestrator, Reporter};
pub use package::{BuildMode, PackagingOperation, SetupPackager};
pub use runtime::{Implementation, RuntimeInfo, detect_runtime};
pub use source::{PrepareOutcome, SourceGenerationError, SourcePreparer};
