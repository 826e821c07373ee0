//! Shared test helpers and utilities

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Variables the build reads; cleared so the host environment cannot leak in
const BUILD_ENV_VARS: [&str; 8] = [
    "CC",
    "CFLAGS",
    "LDFLAGS",
    "CYTHON",
    "SHAPELY_PYTHON",
    "SHAPELY_PYTHON_IMPLEMENTATION",
    "SHAPELY_PYTHON_VERSION",
    "SHAPELY_BUILD_DEBUG",
];

/// A `shapely-build` command with the build variables cleared
///
/// The runtime is pinned to `CPython` 2.6.6 and the queried interpreter does
/// not exist, so no include directory is found unless a test sets
/// `SHAPELY_PYTHON` itself.
pub(crate) fn shapely_build() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_shapely-build"));
    for var in BUILD_ENV_VARS {
        cmd.env_remove(var);
    }
    cmd.env("SHAPELY_PYTHON", "/nonexistent/bin/shapely-build-test-python")
        .env("SHAPELY_PYTHON_IMPLEMENTATION", "CPython")
        .env("SHAPELY_PYTHON_VERSION", "2.6.6");
    cmd
}

/// Write `contents` to `root/relative`, creating parent directories
pub(crate) fn write_file(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create fixture directory");
    }
    fs::write(&path, contents).expect("Failed to write fixture file");
}

/// Create a released-style source tree (generated C source, no `MANIFEST.in`)
pub(crate) fn create_source_tree() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let root = temp_dir.path().to_path_buf();

    write_file(&root, "shapely/__init__.py", "__version__ = \"1.2.7\"\n");
    write_file(&root, "shapely/geometry/__init__.py", "");
    write_file(&root, "shapely/speedups/__init__.py", "");
    write_file(&root, "shapely/speedups/_speedups.pyx", "# cython\n");
    write_file(&root, "shapely/speedups/_speedups.c", "int x;\n");
    write_file(&root, "README.rst", "Shapely\n=======\n");
    write_file(&root, "CHANGES.txt", "Changes\n-------\n- 1.2.7\n");

    (temp_dir, root)
}

/// Run a command and return (success, stdout, stderr)
pub(crate) fn run(cmd: &mut Command) -> (bool, String, String) {
    let output = cmd.output().expect("Failed to execute shapely-build");
    (
        output.status.success(),
        String::from_utf8_lossy(&output.stdout).into_owned(),
        String::from_utf8_lossy(&output.stderr).into_owned(),
    )
}
