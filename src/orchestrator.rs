//! Build orchestration
//!
//! Runs packaging with the speedups extension, and if the toolchain turns
//! out to be unusable, runs it once more without any extension. The two
//! attempts are strictly sequential and the second one is final: whatever
//! goes wrong there is returned to the caller.
//!
//! ```text
//! NotStarted -> NativeAttemptRunning -> NativeSucceeded
//!                                    -> NativeFailed -> FallbackAttemptRunning
//! FallbackAttemptRunning -> FallbackSucceeded
//!                        -> FallbackFailed
//! ```

use crate::capability::BuildConfiguration;
use crate::extensions::{
    BuildError, BuildFailure, BuildOutcome, BuiltExtension, ExtensionDescriptor,
};
use crate::package::{BuildMode, PackagePlan, PackagingOperation};

/// Shown after a failed native attempt and again after the fallback succeeds
pub const BUILD_EXT_WARNING: &str =
    "Warning: The C extension could not be compiled, speedups are not enabled.";

/// States of a packaging run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildState {
    NotStarted,
    NativeAttemptRunning,
    NativeSucceeded,
    NativeFailed,
    FallbackAttemptRunning,
    FallbackSucceeded,
    FallbackFailed,
}

impl BuildState {
    /// Check whether the state machine allows `self -> next`
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::NotStarted, Self::NativeAttemptRunning)
                | (
                    Self::NativeAttemptRunning,
                    Self::NativeSucceeded | Self::NativeFailed
                )
                | (Self::NativeFailed, Self::FallbackAttemptRunning)
                | (
                    Self::FallbackAttemptRunning,
                    Self::FallbackSucceeded | Self::FallbackFailed
                )
        )
    }

    /// Check whether no further transition is possible
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::NativeSucceeded | Self::FallbackSucceeded | Self::FallbackFailed
        )
    }
}

/// User-facing progress output
pub trait Reporter {
    /// Informational line
    fn info(&mut self, message: &str);
    /// Warning line
    fn warn(&mut self, message: &str);
}

/// Reporter printing to standard output
///
/// Warnings share the stream with progress lines so the fallback block
/// reads in order on a combined terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn info(&mut self, message: &str) {
        println!("{message}");
    }

    fn warn(&mut self, message: &str) {
        println!("{message}");
    }
}

/// How a packaging run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    /// Kind of install produced
    pub mode: BuildMode,
    /// Why the native attempt was abandoned, if it was
    pub native_failure: Option<BuildFailure>,
    /// Every state visited, starting with `NotStarted`
    pub history: Vec<BuildState>,
    /// Extensions in the final install
    pub extensions: Vec<BuiltExtension>,
}

impl BuildReport {
    /// Number of times the run entered `state`
    #[must_use]
    pub fn visits(&self, state: BuildState) -> usize {
        self.history.iter().filter(|s| **s == state).count()
    }
}

/// Drives one or two packaging attempts
#[derive(Debug)]
pub struct Orchestrator {
    config: BuildConfiguration,
    extensions: Vec<ExtensionDescriptor>,
    state: BuildState,
    history: Vec<BuildState>,
}

impl Orchestrator {
    /// Create an orchestrator for a configuration
    ///
    /// The extension list is the speedups module when the configuration
    /// enables it, and empty otherwise.
    #[must_use]
    pub fn new(config: BuildConfiguration) -> Self {
        let extensions = match (&config.native_library_name, config.extension_enabled) {
            (Some(library), true) => vec![ExtensionDescriptor::speedups(library)],
            _ => Vec::new(),
        };
        Self::with_extensions(config, extensions)
    }

    /// Create an orchestrator with an explicit extension list
    ///
    /// The list is ignored when the configuration disables extensions.
    #[must_use]
    pub fn with_extensions(
        config: BuildConfiguration,
        extensions: Vec<ExtensionDescriptor>,
    ) -> Self {
        let extensions = if config.extension_enabled {
            extensions
        } else {
            Vec::new()
        };
        Self {
            config,
            extensions,
            state: BuildState::NotStarted,
            history: vec![BuildState::NotStarted],
        }
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> BuildState {
        self.state
    }

    /// Extensions the native attempt will build
    #[must_use]
    pub fn extensions(&self) -> &[ExtensionDescriptor] {
        &self.extensions
    }

    fn advance(&mut self, next: BuildState) -> Result<(), BuildError> {
        if !self.state.can_transition_to(next) {
            return Err(BuildError::Other(anyhow::anyhow!(
                "invalid build state transition {:?} -> {next:?}",
                self.state
            )));
        }
        crate::debug!("build state {:?} -> {next:?}", self.state);
        self.state = next;
        self.history.push(next);
        Ok(())
    }

    fn report(
        &self,
        mode: BuildMode,
        native_failure: Option<BuildFailure>,
        extensions: Vec<BuiltExtension>,
    ) -> BuildReport {
        BuildReport {
            mode,
            native_failure,
            history: self.history.clone(),
            extensions,
        }
    }

    /// Run the native attempt and, if the toolchain fails, the fallback
    ///
    /// # Errors
    ///
    /// Returns errors from the native attempt that are not toolchain
    /// failures, and every error of the fallback attempt. A fallback that
    /// still reports a failed build becomes `BuildError::Unrecoverable`.
    pub fn run(
        &mut self,
        packager: &mut impl PackagingOperation,
        reporter: &mut impl Reporter,
    ) -> Result<BuildReport, BuildError> {
        self.advance(BuildState::NativeAttemptRunning)?;

        let native = packager.package(&PackagePlan {
            mode: BuildMode::Native,
            extensions: &self.extensions,
            data_files: &self.config.extra_data_files,
        })?;

        let failure = match native {
            BuildOutcome::Succeeded(built) => {
                self.advance(BuildState::NativeSucceeded)?;
                return Ok(self.report(BuildMode::Native, None, built));
            }
            BuildOutcome::Failed(failure) => failure,
        };

        self.advance(BuildState::NativeFailed)?;
        reporter.warn(&failure.message);
        reporter.warn(BUILD_EXT_WARNING);
        reporter.warn("Failure information, if any, is above.");
        reporter.warn("I'm retrying the build without the C extension now.");

        self.advance(BuildState::FallbackAttemptRunning)?;
        let fallback = packager.package(&PackagePlan {
            mode: BuildMode::PurePython,
            extensions: &[],
            data_files: &self.config.extra_data_files,
        });

        match fallback {
            Ok(BuildOutcome::Succeeded(built)) => {
                self.advance(BuildState::FallbackSucceeded)?;
                reporter.warn(BUILD_EXT_WARNING);
                reporter.info("Plain-Python installation succeeded.");
                Ok(self.report(BuildMode::PurePython, Some(failure), built))
            }
            Ok(BuildOutcome::Failed(second)) => {
                self.advance(BuildState::FallbackFailed)?;
                Err(BuildError::Unrecoverable(second))
            }
            Err(err) => {
                self.advance(BuildState::FallbackFailed)?;
                Err(err)
            }
        }
    }
}
