//! Metadata command - print the `PKG-INFO` a build would write

use anyhow::{Context, Result};
use shapely_build::metadata::PackageMetadata;

use super::SourceOptions;

pub(crate) fn run(source: &SourceOptions) -> Result<()> {
    let config = source.load_config()?;
    let metadata = PackageMetadata::load(&source.source_dir, &config.package)
        .context("Failed to read package metadata")?;

    print!("{}", metadata.pkg_info());
    Ok(())
}
