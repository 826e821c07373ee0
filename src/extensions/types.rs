//! Extension type definitions
//!
//! The speedups module is described by a constant [`ExtensionDescriptor`].
//! Building it yields a [`BuildOutcome`]; toolchain problems that mean
//! "no usable compiler or library here" are a `Failed` outcome rather than
//! an error, so the caller can fall back to a pure-Python install.

use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Dotted module name of the speedups extension
pub const SPEEDUPS_MODULE: &str = "shapely.speedups._speedups";

/// Generated C source of the speedups extension
pub const SPEEDUPS_SOURCE: &str = "shapely/speedups/_speedups.c";

/// Static description of a native module to build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionDescriptor {
    /// Dotted module name
    pub name: String,
    /// C sources, relative to the source tree
    pub sources: Vec<PathBuf>,
    /// Libraries passed to the linker as `-l<name>`
    pub libraries: Vec<String>,
}

impl ExtensionDescriptor {
    /// The speedups module linked against `library`
    #[must_use]
    pub fn speedups(library: &str) -> Self {
        Self {
            name: SPEEDUPS_MODULE.to_string(),
            sources: vec![PathBuf::from(SPEEDUPS_SOURCE)],
            libraries: vec![library.to_string()],
        }
    }

    /// Relative install path of the built module, e.g. `shapely/speedups/_speedups.so`
    #[must_use]
    pub fn module_path(&self, suffix: &str) -> PathBuf {
        let mut path: PathBuf = self.name.split('.').collect();
        let file_name = format!(
            "{}{suffix}",
            path.file_name()
                .map_or_else(String::new, |n| n.to_string_lossy().into_owned())
        );
        path.set_file_name(file_name);
        path
    }
}

/// Class of toolchain failure recognized as "cannot build here"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolchainErrorKind {
    /// The compiler or linker ran and failed
    Compiler,
    /// An external command could not be executed
    Exec,
    /// The platform has no usable toolchain configuration
    Platform,
    /// Generic I/O failure from the compiler driver
    Io,
}

impl ToolchainErrorKind {
    /// Every recognized kind
    pub const ALL: [Self; 4] = [Self::Compiler, Self::Exec, Self::Platform, Self::Io];

    /// Get a human-readable description
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Compiler => "compiler error",
            Self::Exec => "command execution error",
            Self::Platform => "platform configuration error",
            Self::Io => "I/O error",
        }
    }
}

impl std::fmt::Display for ToolchainErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// Why a native build attempt gave up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildFailure {
    /// Kind of the intercepted toolchain error
    pub kind: ToolchainErrorKind,
    /// Message of the intercepted error
    pub message: String,
}

impl std::fmt::Display for BuildFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// A successfully built extension module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltExtension {
    /// Dotted module name
    pub name: String,
    /// Path of the produced shared library
    pub path: PathBuf,
    /// Compile and link time
    pub duration: Duration,
}

/// Result of one build or packaging attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    /// Everything requested was built
    Succeeded(Vec<BuiltExtension>),
    /// A recognized toolchain failure stopped the build
    Failed(BuildFailure),
}

impl BuildOutcome {
    /// Check if the attempt succeeded
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }
}

/// Errors raised while building or packaging
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("compiler failed: {0}")]
    Compiler(String),

    #[error("command could not be executed: {0}")]
    Exec(String),

    #[error("platform has no usable toolchain: {0}")]
    Platform(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("build failed and no fallback is left: {0}")]
    Unrecoverable(BuildFailure),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BuildError {
    /// Toolchain kind of this error, if it is one
    #[must_use]
    pub const fn toolchain_kind(&self) -> Option<ToolchainErrorKind> {
        match self {
            Self::Compiler(_) => Some(ToolchainErrorKind::Compiler),
            Self::Exec(_) => Some(ToolchainErrorKind::Exec),
            Self::Platform(_) => Some(ToolchainErrorKind::Platform),
            Self::Io(_) => Some(ToolchainErrorKind::Io),
            Self::Unrecoverable(_) | Self::Other(_) => None,
        }
    }

    /// Construct an error of a given toolchain kind (used by test doubles and wrappers)
    #[must_use]
    pub fn of_kind(kind: ToolchainErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            ToolchainErrorKind::Compiler => Self::Compiler(message),
            ToolchainErrorKind::Exec => Self::Exec(message),
            ToolchainErrorKind::Platform => Self::Platform(message),
            ToolchainErrorKind::Io => Self::Io(std::io::Error::other(message)),
        }
    }
}

/// Directories a build writes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPaths {
    /// Source tree root
    pub source_dir: PathBuf,
    /// Object files and other intermediates
    pub temp_dir: PathBuf,
    /// Where built modules are placed (at their module path)
    pub output_dir: PathBuf,
}

impl BuildPaths {
    /// Standard layout under a build directory
    #[must_use]
    pub fn new(source_dir: &Path, build_dir: &Path) -> Self {
        Self {
            source_dir: source_dir.to_path_buf(),
            temp_dir: build_dir.join("temp.native"),
            output_dir: build_dir.join("ext"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speedups_descriptor() {
        let ext = ExtensionDescriptor::speedups("geos_c");
        assert_eq!(ext.name, "shapely.speedups._speedups");
        assert_eq!(ext.sources, vec![PathBuf::from("shapely/speedups/_speedups.c")]);
        assert_eq!(ext.libraries, vec!["geos_c"]);
    }

    #[test]
    fn module_path_uses_suffix() {
        let ext = ExtensionDescriptor::speedups("geos");
        assert_eq!(
            ext.module_path(".pyd"),
            ["shapely", "speedups", "_speedups.pyd"].iter().collect::<PathBuf>()
        );
    }

    #[test]
    fn toolchain_kinds_round_trip_through_errors() {
        for kind in ToolchainErrorKind::ALL {
            let err = BuildError::of_kind(kind, "boom");
            assert_eq!(err.toolchain_kind(), Some(kind));
            assert!(err.to_string().contains("boom"));
        }
    }

    #[test]
    fn other_errors_have_no_kind() {
        let err = BuildError::Other(anyhow::anyhow!("bug"));
        assert_eq!(err.toolchain_kind(), None);

        let err = BuildError::Unrecoverable(BuildFailure {
            kind: ToolchainErrorKind::Compiler,
            message: "no cc".to_string(),
        });
        assert_eq!(err.toolchain_kind(), None);
    }
}
