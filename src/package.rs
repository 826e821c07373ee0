//! Packaging operation
//!
//! Stages a distribution into the build directory:
//! ```text
//! build/
//!   temp.native/   object files (native attempt only, never cleaned)
//!   ext/           linked extension modules
//!   lib/           packages + extension modules, ready to install
//!   data/DLLs/     bundled data files
//!   PKG-INFO
//! ```
//! The same operation serves both attempts; the fallback attempt simply
//! passes no extensions.

use crate::capability::DataFiles;
use crate::extensions::{
    BuildError, BuildOutcome, BuiltExtension, ExtensionCompiler, ExtensionDescriptor,
    ResilientBuildCommand,
};
use crate::metadata::PackageMetadata;
use anyhow::Context;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Which kind of install an attempt produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    /// With the compiled speedups module
    Native,
    /// Pure-Python, no extensions
    PurePython,
}

impl std::fmt::Display for BuildMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Native => f.write_str("native"),
            Self::PurePython => f.write_str("pure-Python"),
        }
    }
}

/// Arguments of one packaging run
#[derive(Debug, Clone, Copy)]
pub struct PackagePlan<'a> {
    /// Attempt being run
    pub mode: BuildMode,
    /// Extensions to build; empty for a pure-Python install
    pub extensions: &'a [ExtensionDescriptor],
    /// Data files to bundle
    pub data_files: &'a [DataFiles],
}

/// A complete packaging run
pub trait PackagingOperation {
    /// Run packaging once
    ///
    /// # Errors
    ///
    /// Returns any error the extension build step does not translate into a
    /// failed outcome, and all staging errors.
    fn package(&mut self, plan: &PackagePlan<'_>) -> Result<BuildOutcome, BuildError>;
}

/// Packaging into a local build directory
#[derive(Debug)]
pub struct SetupPackager<C> {
    source_dir: PathBuf,
    build_dir: PathBuf,
    metadata: PackageMetadata,
    command: ResilientBuildCommand<C>,
    verbose: bool,
}

impl<C: ExtensionCompiler> SetupPackager<C> {
    /// Create a packager; `command` must write below `build_dir`
    #[must_use]
    pub fn new(
        source_dir: &Path,
        build_dir: &Path,
        metadata: PackageMetadata,
        command: ResilientBuildCommand<C>,
        verbose: bool,
    ) -> Self {
        Self {
            source_dir: source_dir.to_path_buf(),
            build_dir: build_dir.to_path_buf(),
            metadata,
            command,
            verbose,
        }
    }

    fn lib_dir(&self) -> PathBuf {
        self.build_dir.join("lib")
    }

    fn copy(&self, from: &Path, to: &Path) -> anyhow::Result<()> {
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        if self.verbose {
            println!("  copying {} -> {}", from.display(), to.display());
        }
        fs::copy(from, to).with_context(|| {
            format!("Failed to copy {} to {}", from.display(), to.display())
        })?;
        Ok(())
    }

    /// Copy each package's modules into `lib/`
    fn stage_packages(&self) -> anyhow::Result<usize> {
        let mut copied = 0;
        for package in &self.metadata.packages {
            let relative: PathBuf = package.split('.').collect();
            let package_dir = self.source_dir.join(&relative);

            for entry in WalkDir::new(&package_dir)
                .min_depth(1)
                .max_depth(1)
                .sort_by_file_name()
            {
                let entry = entry.with_context(|| {
                    format!("Failed to read package directory: {}", package_dir.display())
                })?;
                let path = entry.path();
                if entry.file_type().is_file()
                    && path.extension().is_some_and(|ext| ext == "py")
                {
                    self.copy(path, &self.lib_dir().join(&relative).join(entry.file_name()))?;
                    copied += 1;
                }
            }
        }
        Ok(copied)
    }

    /// Copy built modules into `lib/` at their module path
    fn stage_extensions(&self, built: &[BuiltExtension]) -> anyhow::Result<()> {
        let output_dir = &self.command.paths().output_dir;
        for extension in built {
            let relative = extension
                .path
                .strip_prefix(output_dir)
                .with_context(|| {
                    format!(
                        "Extension {} was built outside {}",
                        extension.name,
                        output_dir.display()
                    )
                })?;
            self.copy(&extension.path, &self.lib_dir().join(relative))?;
        }
        Ok(())
    }

    fn stage_data_files(&self, data_files: &[DataFiles]) -> anyhow::Result<()> {
        for spec in data_files {
            let target_dir = self.build_dir.join("data").join(&spec.destination);
            for file in expand_glob(&self.source_dir, &spec.source_glob)? {
                let Some(name) = file.file_name() else {
                    continue;
                };
                self.copy(&file, &target_dir.join(name))?;
            }
        }
        Ok(())
    }

    fn write_pkg_info(&self) -> anyhow::Result<()> {
        let path = self.build_dir.join("PKG-INFO");
        fs::create_dir_all(&self.build_dir)
            .with_context(|| format!("Failed to create {}", self.build_dir.display()))?;
        fs::write(&path, self.metadata.pkg_info())
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}

impl<C: ExtensionCompiler> PackagingOperation for SetupPackager<C> {
    fn package(&mut self, plan: &PackagePlan<'_>) -> Result<BuildOutcome, BuildError> {
        println!(
            "Packaging {} {} ({} build)",
            self.metadata.name, self.metadata.version, plan.mode
        );

        let built = match self.command.run(plan.extensions)? {
            BuildOutcome::Succeeded(built) => built,
            failed @ BuildOutcome::Failed(_) => return Ok(failed),
        };

        let modules = self.stage_packages()?;
        crate::debug!("staged {modules} modules");
        self.stage_extensions(&built)?;
        self.stage_data_files(plan.data_files)?;
        self.write_pkg_info()?;

        Ok(BuildOutcome::Succeeded(built))
    }
}

/// Expand a `dir/*.ext` style glob relative to `root`
///
/// Only the last component may contain `*` or `?`. A missing directory
/// matches nothing. Results are sorted.
///
/// # Errors
///
/// Returns an error if the pattern is malformed or the directory cannot be read.
pub fn expand_glob(root: &Path, pattern: &str) -> anyhow::Result<Vec<PathBuf>> {
    let pattern_path = Path::new(pattern);
    let file_pattern = pattern_path
        .file_name()
        .with_context(|| format!("Glob has no file pattern: {pattern}"))?
        .to_string_lossy();
    let dir = root.join(pattern_path.parent().unwrap_or_else(|| Path::new("")));

    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let regex = glob_regex(&file_pattern)?;
    let mut matches = Vec::new();
    for entry in WalkDir::new(&dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to read {}", dir.display()))?;
        if entry.file_type().is_file() && regex.is_match(&entry.file_name().to_string_lossy()) {
            matches.push(entry.into_path());
        }
    }
    Ok(matches)
}

fn glob_regex(file_pattern: &str) -> anyhow::Result<Regex> {
    let body = regex::escape(file_pattern)
        .replace(r"\*", ".*")
        .replace(r"\?", ".");
    Regex::new(&format!("^{body}$")).with_context(|| format!("Invalid glob: {file_pattern}"))
}
