//! Build capability detection
//!
//! Decides once, up front, whether the native speedups module is worth
//! attempting and what it links against. The result is an immutable
//! [`BuildConfiguration`] handed to the orchestrator; nothing downstream
//! looks at the host again.

use crate::config::ExtensionConfig;
use crate::platform;
use crate::runtime::RuntimeInfo;
use serde::Serialize;

/// GEOS C API library name on Windows builds
pub const WINDOWS_GEOS_LIBRARY: &str = "geos";

/// GEOS C API library name everywhere else
pub const DEFAULT_GEOS_LIBRARY: &str = "geos_c";

/// Everything the capability check needs to know about the host
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostInfo {
    /// Interpreter details (may be entirely unknown)
    pub runtime: RuntimeInfo,
    /// OS identifier in `sys.platform` format
    pub os: String,
}

impl HostInfo {
    /// Inspect the current process environment
    #[must_use]
    pub fn detect(python: &str) -> Self {
        Self {
            runtime: crate::runtime::detect_runtime(python),
            os: platform::os_identifier(),
        }
    }
}

/// Extra files installed alongside the package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataFiles {
    /// Install directory, relative to the data root
    pub destination: String,
    /// Glob relative to the source tree
    pub source_glob: String,
}

/// Immutable result of capability detection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildConfiguration {
    /// Whether the native extension should be attempted at all
    pub extension_enabled: bool,
    /// GEOS library to link; `None` when the extension is disabled
    pub native_library_name: Option<String>,
    /// Bundled data files, in install order
    pub extra_data_files: Vec<DataFiles>,
    /// Also treat compiler-driver I/O errors as a missing toolchain
    pub catch_io_errors: bool,
}

impl BuildConfiguration {
    /// Apply `[extension]` overrides from the config file and the `--no-speedups` flag
    #[must_use]
    pub fn with_overrides(mut self, overrides: &ExtensionConfig, force_disabled: bool) -> Self {
        if force_disabled || overrides.enabled == Some(false) {
            self.extension_enabled = false;
            self.native_library_name = None;
        }

        if self.extension_enabled
            && let Some(library) = &overrides.library
        {
            self.native_library_name = Some(library.clone());
        }

        if let Some(catch_io) = overrides.catch_io_errors {
            self.catch_io_errors = catch_io;
        }

        self
    }
}

/// Compute the build configuration for a host
///
/// Runtimes without C extension support short-circuit with the extension
/// disabled. An unknown runtime is assumed capable; a failed compile is
/// recovered from later anyway.
#[must_use]
pub fn detect_capabilities(host: &HostInfo) -> BuildConfiguration {
    let extra_data_files = data_files_for(host);
    let catch_io_errors = widens_io_errors(host);

    if let Some(implementation) = &host.runtime.implementation
        && !implementation.supports_native_extensions()
    {
        crate::debug!("{implementation} cannot load C extensions, skipping speedups");
        return BuildConfiguration {
            extension_enabled: false,
            native_library_name: None,
            extra_data_files,
            catch_io_errors,
        };
    }

    if host.runtime.implementation.is_none() {
        crate::debug!("runtime implementation unknown, assuming C extension support");
    }

    BuildConfiguration {
        extension_enabled: true,
        native_library_name: Some(library_name_for(&host.os).to_string()),
        extra_data_files,
        catch_io_errors,
    }
}

/// GEOS library name for an OS identifier
#[must_use]
pub fn library_name_for(os: &str) -> &'static str {
    if platform::is_windows(os) {
        WINDOWS_GEOS_LIBRARY
    } else {
        DEFAULT_GEOS_LIBRARY
    }
}

fn data_files_for(host: &HostInfo) -> Vec<DataFiles> {
    if !platform::is_windows(&host.os) {
        return Vec::new();
    }

    let glob = platform::windows_dll_glob(
        host.runtime.banner.as_deref(),
        host.runtime.version.as_deref(),
    );

    vec![DataFiles {
        destination: platform::DLL_DESTINATION.to_string(),
        source_glob: glob.to_string(),
    }]
}

// MSVC9-era compiler lookup reports a missing compiler as a plain I/O error.
fn widens_io_errors(host: &HostInfo) -> bool {
    platform::is_windows(&host.os)
        && host
            .runtime
            .version
            .as_deref()
            .is_some_and(|v| crate::runtime::version_at_least(v, 2, 6))
}
