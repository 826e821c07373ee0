//! Speedups source generation
//!
//! A development checkout ships `MANIFEST.in` and only the `.pyx` interface
//! definition; released source distributions already contain the generated
//! C file. When the marker is present the C source is regenerated with
//! `cython`, and its absence afterwards is fatal: no build, native or not,
//! should produce a distribution without it.

use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

/// Marker file present only in development checkouts
pub const MANIFEST_MARKER: &str = "MANIFEST.in";

/// Interface definition the speedups source is generated from
pub const SPEEDUPS_INTERFACE: &str = "shapely/speedups/_speedups.pyx";

/// Errors that stop source generation
#[derive(Debug, Error)]
pub enum SourceGenerationError {
    #[error("source generation failed: could not run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("source generation failed: {tool} exited with {status}\n{stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("source generation failed: {} was not generated", path.display())]
    MissingOutput { path: PathBuf },
}

/// What the preparer did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrepareOutcome {
    /// No marker, the source tree is used as is
    Skipped,
    /// The C source was regenerated at this path
    Generated(PathBuf),
}

/// Regenerates the speedups C source in development checkouts
#[derive(Debug, Clone)]
pub struct SourcePreparer {
    source_dir: PathBuf,
    tool: String,
    interface: PathBuf,
    generated: PathBuf,
}

impl SourcePreparer {
    /// Preparer for the standard speedups layout under `source_dir`
    #[must_use]
    pub fn new(source_dir: &Path, tool: impl Into<String>) -> Self {
        Self {
            source_dir: source_dir.to_path_buf(),
            tool: tool.into(),
            interface: PathBuf::from(SPEEDUPS_INTERFACE),
            generated: PathBuf::from(crate::extensions::types::SPEEDUPS_SOURCE),
        }
    }

    /// Check whether this tree needs source generation
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.source_dir.join(MANIFEST_MARKER).exists()
    }

    /// Regenerate the C source if the manifest marker is present
    ///
    /// # Errors
    ///
    /// Returns an error when the tool cannot be run, exits non-zero, or
    /// leaves no generated file behind.
    pub fn prepare(&self) -> Result<PrepareOutcome, SourceGenerationError> {
        if !self.is_required() {
            crate::debug!("no {MANIFEST_MARKER}, using shipped C source");
            return Ok(PrepareOutcome::Skipped);
        }

        println!("Generating {} from {}", self.generated.display(), self.interface.display());

        let output = Command::new(&self.tool)
            .arg(&self.interface)
            .current_dir(&self.source_dir)
            .output()
            .map_err(|source| SourceGenerationError::Spawn {
                tool: self.tool.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(SourceGenerationError::ToolFailed {
                tool: self.tool.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
            });
        }

        let generated = self.source_dir.join(&self.generated);
        if !generated.exists() {
            return Err(SourceGenerationError::MissingOutput { path: generated });
        }

        Ok(PrepareOutcome::Generated(generated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::assertions::assert_error_contains;
    use crate::test_utils::fixtures::create_source_tree;
    use std::fs;

    #[test]
    fn no_marker_is_a_no_op() {
        let (_temp, source_dir) = create_source_tree();
        let preparer = SourcePreparer::new(&source_dir, "/nonexistent/cython");

        assert!(!preparer.is_required());
        assert_eq!(preparer.prepare().unwrap(), PrepareOutcome::Skipped);
    }

    #[test]
    fn missing_tool_is_fatal() {
        let (_temp, source_dir) = create_source_tree();
        fs::write(source_dir.join(MANIFEST_MARKER), "include *.txt\n").unwrap();

        let err = SourcePreparer::new(&source_dir, "/nonexistent/cython")
            .prepare()
            .unwrap_err();

        assert!(matches!(err, SourceGenerationError::Spawn { .. }));
        assert!(err.to_string().starts_with("source generation failed"));
        assert_error_contains(&err.to_string(), "/nonexistent/cython");
    }

    #[cfg(unix)]
    #[test]
    fn failing_tool_is_fatal() {
        let (_temp, source_dir) = create_source_tree();
        fs::write(source_dir.join(MANIFEST_MARKER), "").unwrap();

        let err = SourcePreparer::new(&source_dir, "false").prepare().unwrap_err();

        assert!(matches!(err, SourceGenerationError::ToolFailed { .. }));
        assert_error_contains(&err.to_string(), "source generation failed");
    }

    #[cfg(unix)]
    #[test]
    fn tool_that_produces_nothing_is_fatal() {
        let (_temp, source_dir) = create_source_tree();
        fs::write(source_dir.join(MANIFEST_MARKER), "").unwrap();
        fs::remove_file(source_dir.join("shapely/speedups/_speedups.c")).unwrap();

        // `true` succeeds without writing anything
        let err = SourcePreparer::new(&source_dir, "true").prepare().unwrap_err();

        assert!(matches!(err, SourceGenerationError::MissingOutput { .. }));
        assert_error_contains(&err.to_string(), "_speedups.c was not generated");
    }

    #[cfg(unix)]
    #[test]
    fn existing_output_after_tool_run_succeeds() {
        let (_temp, source_dir) = create_source_tree();
        fs::write(source_dir.join(MANIFEST_MARKER), "").unwrap();

        let outcome = SourcePreparer::new(&source_dir, "true").prepare().unwrap();

        assert_eq!(
            outcome,
            PrepareOutcome::Generated(source_dir.join("shapely/speedups/_speedups.c"))
        );
    }
}
