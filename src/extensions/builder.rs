//! Resilient extension building
//!
//! Wraps an [`ExtensionCompiler`] in a catch/translate boundary. Errors that
//! mean "this host cannot build native code" become a
//! [`BuildOutcome::Failed`]; every other error propagates untouched so real
//! bugs are not mistaken for a missing toolchain.

use super::compiler::ExtensionCompiler;
use super::types::{
    BuildError, BuildFailure, BuildOutcome, BuildPaths, BuiltExtension, ExtensionDescriptor,
    ToolchainErrorKind,
};

/// Which toolchain error kinds are converted into a failed outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatchPolicy {
    catch_io: bool,
}

impl CatchPolicy {
    /// Compiler, exec and platform errors only
    #[must_use]
    pub const fn toolchain() -> Self {
        Self { catch_io: false }
    }

    /// Toolchain errors plus generic I/O errors from the compiler driver
    #[must_use]
    pub const fn with_io() -> Self {
        Self { catch_io: true }
    }

    /// Policy for a build configuration's `catch_io_errors` flag
    #[must_use]
    pub const fn from_flag(catch_io: bool) -> Self {
        Self { catch_io }
    }

    /// Check whether `kind` is intercepted
    #[must_use]
    pub const fn catches(self, kind: ToolchainErrorKind) -> bool {
        match kind {
            ToolchainErrorKind::Compiler
            | ToolchainErrorKind::Exec
            | ToolchainErrorKind::Platform => true,
            ToolchainErrorKind::Io => self.catch_io,
        }
    }
}

/// Run `step`, translating caught toolchain errors into a [`BuildFailure`]
///
/// Returns `Ok(Ok(value))` on success, `Ok(Err(failure))` for a caught
/// error, and `Err` for everything else.
///
/// # Errors
///
/// Propagates any error the policy does not catch.
pub fn build_with_guard<T>(
    policy: CatchPolicy,
    step: impl FnOnce() -> Result<T, BuildError>,
) -> Result<Result<T, BuildFailure>, BuildError> {
    match step() {
        Ok(value) => Ok(Ok(value)),
        Err(err) => match err.toolchain_kind() {
            Some(kind) if policy.catches(kind) => {
                crate::debug!("intercepted {kind}: {err}");
                Ok(Err(BuildFailure {
                    kind,
                    message: err.to_string(),
                }))
            }
            _ => Err(err),
        },
    }
}

/// Extension build step that tolerates a missing toolchain
///
/// The top-level run guards toolchain preparation with the base policy;
/// each extension is then built under its own guard, which also honors
/// I/O widening.
#[derive(Debug)]
pub struct ResilientBuildCommand<C> {
    compiler: C,
    policy: CatchPolicy,
    paths: BuildPaths,
}

impl<C: ExtensionCompiler> ResilientBuildCommand<C> {
    /// Create a build command around `compiler`
    #[must_use]
    pub const fn new(compiler: C, policy: CatchPolicy, paths: BuildPaths) -> Self {
        Self {
            compiler,
            policy,
            paths,
        }
    }

    /// Directories this command writes to
    #[must_use]
    pub const fn paths(&self) -> &BuildPaths {
        &self.paths
    }

    /// Build every extension, stopping at the first caught failure
    ///
    /// Extensions built before a failure keep their artifacts on disk; they
    /// are simply not reported, since the attempt as a whole failed.
    ///
    /// # Errors
    ///
    /// Returns errors the catch policy does not cover.
    pub fn run(&mut self, extensions: &[ExtensionDescriptor]) -> Result<BuildOutcome, BuildError> {
        if extensions.is_empty() {
            return Ok(BuildOutcome::Succeeded(Vec::new()));
        }

        let compiler = &mut self.compiler;
        if let Err(failure) = build_with_guard(CatchPolicy::toolchain(), || compiler.prepare())? {
            return Ok(BuildOutcome::Failed(failure));
        }

        let mut built = Vec::with_capacity(extensions.len());
        for ext in extensions {
            match self.build_extension(ext)? {
                Ok(extension) => built.push(extension),
                Err(failure) => return Ok(BuildOutcome::Failed(failure)),
            }
        }

        Ok(BuildOutcome::Succeeded(built))
    }

    /// Build a single extension under its own guard
    ///
    /// # Errors
    ///
    /// Returns errors the catch policy does not cover.
    pub fn build_extension(
        &self,
        ext: &ExtensionDescriptor,
    ) -> Result<Result<BuiltExtension, BuildFailure>, BuildError> {
        build_with_guard(self.policy, || self.compiler.build_extension(ext, &self.paths))
    }
}
