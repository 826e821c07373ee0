//! Subcommand implementations

pub(crate) mod build;
pub(crate) mod detect;
pub(crate) mod generate;
pub(crate) mod metadata;

use anyhow::Result;
use shapely_build::Config;
use std::path::{Path, PathBuf};

/// Where to find the source tree and its configuration
#[derive(Debug, Clone)]
pub(crate) struct SourceOptions {
    pub source_dir: PathBuf,
    pub config: Option<PathBuf>,
    pub no_config: bool,
}

impl SourceOptions {
    /// Load the configuration these options point at
    pub(crate) fn load_config(&self) -> Result<Config> {
        let config = Config::load_with_options(
            &self.source_dir,
            self.config.as_deref(),
            self.no_config,
        )?;
        shapely_build::debug!("loaded config: {config:?}");
        Ok(config)
    }

    /// Resolve a config path relative to the source tree
    pub(crate) fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.source_dir.join(path)
        }
    }
}
