//! Configuration file management
//!
//! Reads the optional `shapely-build.toml` from the source tree or the
//! user's config directory. Every field is optional; unset values fall back
//! to environment variables and then to built-in defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the per-project config file, looked up in the source directory
pub const CONFIG_FILE_NAME: &str = "shapely-build.toml";

/// Application configuration loaded from TOML files
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Package metadata sources
    #[serde(default)]
    pub package: PackageConfig,

    /// Native extension settings
    #[serde(default)]
    pub extension: ExtensionConfig,

    /// External tools and flags
    #[serde(default)]
    pub toolchain: ToolchainConfig,
}

/// `[package]` table
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PackageConfig {
    /// Distribution name (default "Shapely")
    #[serde(default)]
    pub name: Option<String>,

    /// File holding `__version__` (default `shapely/__init__.py`)
    #[serde(default)]
    pub version_file: Option<String>,

    /// Readme file (default `README.rst`)
    #[serde(default)]
    pub readme: Option<String>,

    /// Changelog file (default `CHANGES.txt`)
    #[serde(default)]
    pub changes: Option<String>,
}

/// `[extension]` table
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ExtensionConfig {
    /// Set to `false` to never attempt the native build
    #[serde(default)]
    pub enabled: Option<bool>,

    /// Override the GEOS library name picked per platform
    #[serde(default)]
    pub library: Option<String>,

    /// Treat I/O errors from the compiler driver as a missing toolchain
    #[serde(default)]
    pub catch_io_errors: Option<bool>,

    /// Extra header search paths
    #[serde(default)]
    pub include_dirs: Vec<String>,

    /// Extra library search paths
    #[serde(default)]
    pub library_dirs: Vec<String>,
}

/// `[toolchain]` table
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ToolchainConfig {
    /// C compiler executable
    #[serde(default)]
    pub cc: Option<String>,

    /// Extra compile flags
    #[serde(default)]
    pub cflags: Vec<String>,

    /// Extra link flags
    #[serde(default)]
    pub ldflags: Vec<String>,

    /// Source generator executable (default `cython`)
    #[serde(default)]
    pub cython: Option<String>,

    /// Interpreter queried for host runtime details (default `python`)
    #[serde(default)]
    pub python: Option<String>,
}

impl Config {
    /// Load configuration for a source tree.
    /// Priority: `<source_dir>/shapely-build.toml` -> user config -> defaults
    ///
    /// # Errors
    ///
    /// Returns an error if an existing config file cannot be parsed.
    pub fn load(source_dir: &Path) -> Result<Self> {
        Self::load_with_options(source_dir, None, false)
    }

    /// Load configuration with custom options.
    ///
    /// # Arguments
    /// * `source_dir` - Source tree searched for `shapely-build.toml`
    /// * `custom_path` - Optional explicit config file (overrides the search)
    /// * `skip_rc` - If true, skip loading config files (return default config)
    ///
    /// # Errors
    ///
    /// Returns an error if the custom file is missing, or if any existing
    /// config file fails to parse.
    pub fn load_with_options(
        source_dir: &Path,
        custom_path: Option<&Path>,
        skip_rc: bool,
    ) -> Result<Self> {
        if skip_rc {
            return Ok(Self::default());
        }

        if let Some(path) = custom_path {
            return Self::load_from(path);
        }

        let local = source_dir.join(CONFIG_FILE_NAME);
        if local.is_file() {
            return Self::load_from(&local);
        }

        if let Some(config_dir) = Self::user_config_dir() {
            let config_path = config_dir.join("config.toml");
            if config_path.is_file() {
                return Self::load_from(&config_path);
            }
        }

        Ok(Self::default())
    }

    fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Parse TOML config text
    ///
    /// # Errors
    ///
    /// Returns an error on invalid TOML or unknown keys.
    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    fn user_config_dir() -> Option<PathBuf> {
        // Check XDG_CONFIG_HOME first
        if let Ok(xdg_config) = env::var("XDG_CONFIG_HOME") {
            return Some(PathBuf::from(xdg_config).join("shapely-build"));
        }

        // Fall back to ~/.config/shapely-build
        dirs::home_dir().map(|home| home.join(".config").join("shapely-build"))
    }

    /// Compiler executable: `CC` env var -> config
    #[must_use]
    pub fn cc(&self) -> Option<String> {
        crate::env_vars::cc().or_else(|| self.toolchain.cc.clone())
    }

    /// Compile flags: config flags followed by `CFLAGS`
    #[must_use]
    pub fn cflags(&self) -> Vec<String> {
        let mut flags = self.toolchain.cflags.clone();
        if let Some(env_flags) = crate::env_vars::cflags() {
            flags.extend(crate::env_vars::split_flags(&env_flags));
        }
        flags
    }

    /// Link flags: config flags followed by `LDFLAGS`
    #[must_use]
    pub fn ldflags(&self) -> Vec<String> {
        let mut flags = self.toolchain.ldflags.clone();
        if let Some(env_flags) = crate::env_vars::ldflags() {
            flags.extend(crate::env_vars::split_flags(&env_flags));
        }
        flags
    }

    /// Source generator: `CYTHON` env var -> config -> `cython`
    #[must_use]
    pub fn cython(&self) -> String {
        crate::env_vars::cython()
            .or_else(|| self.toolchain.cython.clone())
            .unwrap_or_else(|| "cython".to_string())
    }

    /// Queried interpreter: `SHAPELY_PYTHON` env var -> config -> `python`
    #[must_use]
    pub fn python(&self) -> String {
        crate::env_vars::python()
            .or_else(|| self.toolchain.python.clone())
            .unwrap_or_else(|| "python".to_string())
    }
}
