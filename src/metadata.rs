//! Package metadata
//!
//! Static distribution metadata plus the few values read from the source
//! tree: the version from `shapely/__init__.py`, the long description from
//! the readme and changelog, and the list of packages.

use crate::config::PackageConfig;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

const DEFAULT_NAME: &str = "Shapely";
const DEFAULT_VERSION_FILE: &str = "shapely/__init__.py";
const DEFAULT_README: &str = "README.rst";
const DEFAULT_CHANGES: &str = "CHANGES.txt";

/// File the parsed version is written back to
pub const VERSION_FILE: &str = "VERSION.txt";

/// Trove classifiers
pub const CLASSIFIERS: [&str; 7] = [
    "Development Status :: 5 - Production/Stable",
    "Intended Audience :: Developers",
    "Intended Audience :: Science/Research",
    "License :: OSI Approved :: BSD License",
    "Operating System :: OS Independent",
    "Programming Language :: Python",
    "Topic :: Scientific/Engineering :: GIS",
];

/// Errors while assembling metadata
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No __version__ assignment found in {}", path.display())]
    MissingVersion { path: PathBuf },
}

/// Distribution metadata (metadata version 1.2)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageMetadata {
    pub name: String,
    pub version: String,
    pub summary: String,
    pub license: String,
    pub keywords: String,
    pub author: String,
    pub author_email: String,
    pub maintainer: String,
    pub maintainer_email: String,
    pub url: String,
    pub requires_python: String,
    pub requires_external: String,
    pub long_description: String,
    /// Dotted package names, sorted
    pub packages: Vec<String>,
}

impl PackageMetadata {
    /// Read metadata from a source tree
    ///
    /// # Errors
    ///
    /// Returns an error if the version file, readme or changelog cannot be read,
    /// or if no version is declared.
    pub fn load(source_dir: &Path, config: &PackageConfig) -> Result<Self, MetadataError> {
        let version_file = source_dir.join(
            config
                .version_file
                .as_deref()
                .unwrap_or(DEFAULT_VERSION_FILE),
        );
        let readme = source_dir.join(config.readme.as_deref().unwrap_or(DEFAULT_README));
        let changes = source_dir.join(config.changes.as_deref().unwrap_or(DEFAULT_CHANGES));

        let version = parse_version(&read(&version_file)?)
            .ok_or(MetadataError::MissingVersion { path: version_file })?;

        Ok(Self {
            name: config
                .name
                .clone()
                .unwrap_or_else(|| DEFAULT_NAME.to_string()),
            version,
            summary: "Geometric objects, predicates, and operations".to_string(),
            license: "BSD".to_string(),
            keywords: "geometry topology gis".to_string(),
            author: "Sean Gillies".to_string(),
            author_email: "sean.gillies@gmail.com".to_string(),
            maintainer: "Sean Gillies".to_string(),
            maintainer_email: "sean.gillies@gmail.com".to_string(),
            url: "https://github.com/sgillies/shapely".to_string(),
            requires_python: ">=2.5,<3".to_string(),
            requires_external: "libgeos_c (>=3.1)".to_string(),
            long_description: long_description(&read(&readme)?, &read(&changes)?),
            packages: find_packages(source_dir),
        })
    }

    /// Write `VERSION.txt` next to the sources
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_version_file(&self, source_dir: &Path) -> Result<PathBuf, MetadataError> {
        let path = source_dir.join(VERSION_FILE);
        fs::write(&path, &self.version).map_err(|source| MetadataError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// Render the `PKG-INFO` file
    #[must_use]
    pub fn pkg_info(&self) -> String {
        let mut out = String::new();
        let mut field = |key: &str, value: &str| {
            // writeln! into a String cannot fail
            writeln!(out, "{key}: {value}").ok();
        };

        field("Metadata-Version", "1.2");
        field("Name", &self.name);
        field("Version", &self.version);
        field("Summary", &self.summary);
        field("Home-page", &self.url);
        field("Author", &self.author);
        field("Author-email", &self.author_email);
        field("Maintainer", &self.maintainer);
        field("Maintainer-email", &self.maintainer_email);
        field("License", &self.license);
        field("Description", &fold_description(&self.long_description));
        field("Keywords", &self.keywords);
        field("Platform", "UNKNOWN");
        for classifier in CLASSIFIERS {
            field("Classifier", classifier);
        }
        field("Requires-Python", &self.requires_python);
        field("Requires-External", &self.requires_external);

        out
    }
}

fn read(path: &Path) -> Result<String, MetadataError> {
    fs::read_to_string(path).map_err(|source| MetadataError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Extract `__version__` from module source
///
/// The last assignment wins; quotes and surrounding whitespace are stripped.
#[must_use]
pub fn parse_version(source: &str) -> Option<String> {
    source
        .lines()
        .filter(|line| line.contains("__version__"))
        .filter_map(|line| line.split('=').nth(1))
        .map(|value| value.trim().trim_matches('"').trim_matches('\'').to_string())
        .last()
}

/// Readme followed by the changelog minus its first line
#[must_use]
pub fn long_description(readme: &str, changes: &str) -> String {
    let changes = changes.split_once('\n').map_or("", |(_, rest)| rest);
    format!("{readme}\n{changes}")
}

/// Indent continuation lines the way `PKG-INFO` readers expect
fn fold_description(text: &str) -> String {
    text.trim_end().replace('\n', "\n        ")
}

/// Find every importable package under `root`
///
/// A directory is a package when it and all its parents below `root`
/// contain `__init__.py`. Hidden directories and `build`/`dist` are skipped.
#[must_use]
pub fn find_packages(root: &Path) -> Vec<String> {
    let mut packages: Vec<String> = WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            entry.file_type().is_dir()
                && !name.starts_with('.')
                && !(entry.depth() == 1 && (name == "build" || name == "dist"))
                && entry.path().join("__init__.py").is_file()
        })
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let relative = entry.path().strip_prefix(root).ok()?;
            let parts: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            Some(parts.join("."))
        })
        .collect();

    packages.sort();
    packages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::{FIXTURE_VERSION, create_source_tree, write_file};

    #[test]
    fn parse_double_quoted_version() {
        assert_eq!(
            parse_version("import os\n__version__ = \"1.2.7\"\n"),
            Some("1.2.7".to_string())
        );
    }

    #[test]
    fn parse_single_quoted_version() {
        assert_eq!(
            parse_version("__version__='1.3.0b1'\n"),
            Some("1.3.0b1".to_string())
        );
    }

    #[test]
    fn last_version_assignment_wins() {
        assert_eq!(
            parse_version("__version__ = '1.0'\n__version__ = '1.1'\n"),
            Some("1.1".to_string())
        );
    }

    #[test]
    fn no_version() {
        assert_eq!(parse_version("x = 1\n"), None);
    }

    #[test]
    fn long_description_skips_changes_header() {
        let text = long_description("Shapely\n", "Changes\n=======\n- one\n");
        assert_eq!(text, "Shapely\n\n=======\n- one\n");
    }

    #[test]
    fn long_description_with_single_line_changes() {
        assert_eq!(long_description("R", "Changes"), "R\n");
    }

    #[test]
    fn finds_nested_packages() {
        let (_temp, root) = create_source_tree();
        // Not a package: no __init__.py in the parent
        write_file(&root, "scripts/helpers/__init__.py", "");
        write_file(&root, "build/lib/shapely/__init__.py", "");

        assert_eq!(
            find_packages(&root),
            vec![
                "shapely",
                "shapely.geometry",
                "shapely.speedups",
                "shapely.tests"
            ]
        );
    }

    #[test]
    fn load_from_source_tree() {
        let (_temp, root) = create_source_tree();
        let metadata = PackageMetadata::load(&root, &PackageConfig::default()).unwrap();

        assert_eq!(metadata.name, "Shapely");
        assert_eq!(metadata.version, FIXTURE_VERSION);
        assert!(metadata.long_description.starts_with("Shapely\n"));
        assert!(!metadata.long_description.contains("Changes\n"));
        assert!(metadata.packages.contains(&"shapely.speedups".to_string()));
    }

    #[test]
    fn missing_version_is_an_error() {
        let (_temp, root) = create_source_tree();
        write_file(&root, "shapely/__init__.py", "# nothing here\n");

        let err = PackageMetadata::load(&root, &PackageConfig::default()).unwrap_err();
        assert!(matches!(err, MetadataError::MissingVersion { .. }));
    }

    #[test]
    fn missing_readme_is_an_error() {
        let (_temp, root) = create_source_tree();
        fs::remove_file(root.join("README.rst")).unwrap();

        let err = PackageMetadata::load(&root, &PackageConfig::default()).unwrap_err();
        assert!(err.to_string().contains("README.rst"));
    }

    #[test]
    fn writes_version_file() {
        let (_temp, root) = create_source_tree();
        let metadata = PackageMetadata::load(&root, &PackageConfig::default()).unwrap();

        let path = metadata.write_version_file(&root).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), FIXTURE_VERSION);
    }

    #[test]
    fn pkg_info_fields() {
        let (_temp, root) = create_source_tree();
        let metadata = PackageMetadata::load(&root, &PackageConfig::default()).unwrap();
        let pkg_info = metadata.pkg_info();

        assert!(pkg_info.starts_with("Metadata-Version: 1.2\nName: Shapely\n"));
        assert!(pkg_info.contains(&format!("Version: {FIXTURE_VERSION}\n")));
        assert!(pkg_info.contains("Requires-External: libgeos_c (>=3.1)\n"));
        assert!(pkg_info.contains("Requires-Python: >=2.5,<3\n"));
        assert!(pkg_info.contains("Description: Shapely\n        =======\n"));
        assert_eq!(pkg_info.matches("Classifier: ").count(), CLASSIFIERS.len());
    }
}
