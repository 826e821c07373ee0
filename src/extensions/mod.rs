//! Native extension building
//!
//! Compiles the speedups module with the host C toolchain. Toolchain
//! problems are reported as a failed [`BuildOutcome`] so packaging can
//! continue without the extension:
//! - [`compiler`] drives `cc` for a single extension
//! - [`builder`] decides which errors are recoverable and builds every extension

pub mod builder;
pub mod compiler;
pub mod types;

pub use builder::{CatchPolicy, ResilientBuildCommand, build_with_guard};
pub use compiler::{CCompiler, CompilerSettings, ExtensionCompiler};
pub use types::{
    BuildError, BuildFailure, BuildOutcome, BuildPaths, BuiltExtension, ExtensionDescriptor,
    ToolchainErrorKind,
};
