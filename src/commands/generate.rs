//! Generate command - regenerate the speedups C source only

use anyhow::Result;
use shapely_build::source::{MANIFEST_MARKER, PrepareOutcome, SourcePreparer};

use super::SourceOptions;

pub(crate) fn run(source: &SourceOptions) -> Result<()> {
    let config = source.load_config()?;

    match SourcePreparer::new(&source.source_dir, config.cython()).prepare()? {
        PrepareOutcome::Skipped => {
            println!("No {MANIFEST_MARKER} found, shipped C source is used as is");
        }
        PrepareOutcome::Generated(path) => println!("Generated {}", path.display()),
    }

    Ok(())
}
