//! Shared test utilities for shapely-build tests
//!
//! Fixtures that lay out a minimal Shapely source tree in a temp directory.

#[cfg(test)]
pub(crate) mod fixtures {
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// Version written into the fixture's `shapely/__init__.py`
    pub(crate) const FIXTURE_VERSION: &str = "1.2.7";

    /// Write `contents` to `root/relative`, creating parent directories
    pub(crate) fn write_file(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create fixture directory");
        }
        fs::write(&path, contents).expect("Failed to write fixture file");
    }

    /// Create a source distribution layout: packages, generated C source, docs
    pub(crate) fn create_source_tree() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path().to_path_buf();

        write_file(
            &root,
            "shapely/__init__.py",
            &format!("from shapely.geos import lgeos\n\n__version__ = \"{FIXTURE_VERSION}\"\n"),
        );
        write_file(&root, "shapely/geos.py", "lgeos = None\n");
        write_file(&root, "shapely/geometry/__init__.py", "");
        write_file(&root, "shapely/geometry/point.py", "class Point(object):\n    pass\n");
        write_file(&root, "shapely/speedups/__init__.py", "available = False\n");
        write_file(&root, "shapely/speedups/_speedups.pyx", "# cython source\n");
        write_file(&root, "shapely/speedups/_speedups.c", "/* generated */\n");
        write_file(&root, "shapely/tests/__init__.py", "");
        write_file(&root, "README.rst", "Shapely\n=======\n\nGeometric objects.\n");
        write_file(
            &root,
            "CHANGES.txt",
            "Changes\n=======\n\n1.2.7 (2010-11-05)\n------------------\n- Fixes.\n",
        );

        (temp_dir, root)
    }

    /// Add bundled Windows DLLs to a fixture tree
    pub(crate) fn add_windows_dlls(root: &Path, dir: &str) {
        write_file(root, &format!("{dir}/geos.dll"), "MZ");
        write_file(root, &format!("{dir}/geos_c.dll"), "MZ");
        write_file(root, &format!("{dir}/README.txt"), "not a dll");
    }
}

#[cfg(test)]
pub(crate) mod assertions {
    /// Assert that an error message contains a specific substring
    pub(crate) fn assert_error_contains(error_msg: &str, expected_text: &str) {
        assert!(
            error_msg.to_lowercase().contains(&expected_text.to_lowercase()),
            "Error message '{error_msg}' does not contain '{expected_text}'"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_source_tree() {
        let (_temp, root) = fixtures::create_source_tree();
        assert!(root.join("shapely/__init__.py").exists());
        assert!(root.join("shapely/speedups/_speedups.c").exists());
        assert!(!root.join("MANIFEST.in").exists());
    }

    #[test]
    fn test_assert_error_contains() {
        assertions::assert_error_contains("Source Generation Failed: boom", "source generation");
    }
}
