//! Host runtime detection
//!
//! Identifies the interpreter implementation and version the package is
//! being built for. The interpreter is always asked, and environment
//! overrides replace the implementation and version it reports. Detection
//! never fails: anything it cannot learn is left as `None` and callers treat
//! that as "capability unknown".

use std::path::PathBuf;
use std::process::Command;

/// Interpreter implementation types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Implementation {
    /// Reference implementation (`CPython`)
    CPython,
    /// `PyPy` (JIT, no C extension support for this package)
    PyPy,
    /// `Jython` (JVM)
    Jython,
    /// `IronPython` (.NET)
    IronPython,
    /// Unknown or custom implementation
    Unknown(String),
}

impl std::str::FromStr for Implementation {
    type Err = std::convert::Infallible;

    /// Parse implementation from string (always succeeds; unknown names return `Unknown`).
    ///
    /// # Examples
    ///
    /// ```
    /// use shapely_build::runtime::Implementation;
    /// use std::str::FromStr;
    ///
    /// assert_eq!(Implementation::from_str("PyPy").unwrap(), Implementation::PyPy);
    /// assert_eq!(
    ///     Implementation::from_str("custom").unwrap(),
    ///     Implementation::Unknown("custom".into())
    /// );
    /// ```
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let normalized = name.trim().to_lowercase();

        Ok(match normalized.as_str() {
            "cpython" | "python" => Self::CPython,
            name if name.starts_with("pypy") => Self::PyPy,
            name if name.starts_with("jython") => Self::Jython,
            name if name.starts_with("ironpython") => Self::IronPython,
            _ => Self::Unknown(normalized),
        })
    }
}

impl Implementation {
    /// Check if the implementation can load C extensions built against its headers.
    ///
    /// Unknown implementations are given the benefit of the doubt.
    #[inline]
    pub const fn supports_native_extensions(&self) -> bool {
        !matches!(self, Self::PyPy | Self::Jython | Self::IronPython)
    }

    /// Get implementation name as string
    #[inline]
    pub fn as_str(&self) -> &str {
        match self {
            Self::CPython => "CPython",
            Self::PyPy => "PyPy",
            Self::Jython => "Jython",
            Self::IronPython => "IronPython",
            Self::Unknown(name) => name,
        }
    }
}

impl std::fmt::Display for Implementation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What is known about the host interpreter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeInfo {
    /// `None` when the interpreter has no implementation query (pre-2.6) or could not be run
    pub implementation: Option<Implementation>,
    /// Dotted version, e.g. "2.7.18"
    pub version: Option<String>,
    /// Full version banner (`sys.version`), used to spot 64-bit Windows builds
    pub banner: Option<String>,
    /// Directory holding `Python.h`
    pub include_dir: Option<PathBuf>,
}

// Prints an empty first line when `platform.python_implementation` is missing.
const QUERY_SCRIPT: &str = "import platform, sys\n\
f = getattr(platform, 'python_implementation', None)\n\
print(f and f() or '')\n\
print(platform.python_version())\n\
print(sys.version.replace('\\n', ' '))\n\
try:\n    import sysconfig\n    inc = sysconfig.get_paths()['include']\n\
except Exception:\n    from distutils import sysconfig\n    inc = sysconfig.get_python_inc()\n\
print(inc)\n";

/// Detect the host runtime
///
/// The interpreter is always asked; `SHAPELY_PYTHON_IMPLEMENTATION` and
/// `SHAPELY_PYTHON_VERSION` then replace what it reported. The banner and
/// include directory only ever come from the interpreter.
#[must_use]
pub fn detect_runtime(python: &str) -> RuntimeInfo {
    apply_overrides(
        query_interpreter(python).unwrap_or_default(),
        crate::env_vars::python_implementation().as_deref(),
        crate::env_vars::python_version(),
    )
}

/// Replace the implementation and version of a detected runtime
#[must_use]
pub fn apply_overrides(
    mut info: RuntimeInfo,
    implementation: Option<&str>,
    version: Option<String>,
) -> RuntimeInfo {
    use std::str::FromStr;

    if let Some(name) = implementation {
        crate::debug!("runtime implementation from environment: {name}");
        let Ok(implementation) = Implementation::from_str(name);
        info.implementation = Some(implementation);
    }
    if version.is_some() {
        info.version = version;
    }
    info
}

/// Ask the interpreter about itself
fn query_interpreter(python: &str) -> Option<RuntimeInfo> {
    let output = Command::new(python)
        .args(["-c", QUERY_SCRIPT])
        .output()
        .inspect_err(|e| crate::debug!("could not run {python}: {e}"))
        .ok()?;

    if !output.status.success() {
        crate::debug!("{python} exited with {}", output.status);
        return None;
    }

    Some(parse_query_output(&String::from_utf8_lossy(&output.stdout)))
}

/// Parse the query script output (implementation, version, banner, include dir)
#[must_use]
pub fn parse_query_output(stdout: &str) -> RuntimeInfo {
    use std::str::FromStr;

    let mut lines = stdout.lines().map(str::trim);
    let non_empty = |s: Option<&str>| s.filter(|s| !s.is_empty()).map(ToString::to_string);

    let implementation = non_empty(lines.next()).map(|name| {
        let Ok(implementation) = Implementation::from_str(&name);
        implementation
    });

    RuntimeInfo {
        implementation,
        version: non_empty(lines.next()),
        banner: non_empty(lines.next()),
        include_dir: non_empty(lines.next()).map(PathBuf::from),
    }
}

/// Parse a dotted runtime version leniently ("2.6" -> 2.6.0, "2.7.18+" -> 2.7.18)
#[must_use]
pub fn parse_version(version: &str) -> Option<semver::Version> {
    let mut parts = version.trim().split('.').map(|part| {
        part.chars()
            .take_while(char::is_ascii_digit)
            .collect::<String>()
            .parse::<u64>()
            .ok()
    });

    let major = parts.next().flatten()?;
    let minor = parts.next().flatten().unwrap_or(0);
    let patch = parts.next().flatten().unwrap_or(0);

    Some(semver::Version::new(major, minor, patch))
}

/// Check whether `version` is at least `major.minor`
#[must_use]
pub fn version_at_least(version: &str, major: u64, minor: u64) -> bool {
    parse_version(version).is_some_and(|v| v >= semver::Version::new(major, minor, 0))
}
