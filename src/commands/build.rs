//! Build command
//!
//! The full pipeline: metadata, source generation, capability detection,
//! then packaging with the speedups extension and, if the toolchain fails,
//! without it.

use anyhow::{Context, Result};
use std::path::PathBuf;

use shapely_build::capability::{HostInfo, detect_capabilities};
use shapely_build::extensions::{
    BuildPaths, CCompiler, CatchPolicy, CompilerSettings, ResilientBuildCommand,
};
use shapely_build::metadata::PackageMetadata;
use shapely_build::orchestrator::{ConsoleReporter, Orchestrator};
use shapely_build::package::{BuildMode, SetupPackager};
use shapely_build::source::SourcePreparer;

use super::SourceOptions;

/// Options for `shapely-build build`
#[derive(Debug, Clone)]
pub(crate) struct BuildOptions {
    pub source: SourceOptions,
    pub build_dir: Option<PathBuf>,
    pub no_speedups: bool,
    pub verbose: bool,
}

/// Run the build pipeline
pub(crate) fn run(options: &BuildOptions) -> Result<()> {
    let source_dir = &options.source.source_dir;
    let config = options.source.load_config()?;

    let metadata = PackageMetadata::load(source_dir, &config.package)
        .context("Failed to read package metadata")?;
    metadata.write_version_file(source_dir)?;
    println!("{} {}", metadata.name, metadata.version);

    // Runs before any packaging, and its failure is never recovered from
    SourcePreparer::new(source_dir, config.cython()).prepare()?;

    let host = HostInfo::detect(&config.python());
    let build_config =
        detect_capabilities(&host).with_overrides(&config.extension, options.no_speedups);
    shapely_build::debug!("build configuration: {build_config:?}");

    if !build_config.extension_enabled {
        println!("Speedups extension disabled for this runtime");
    }

    let mut include_dirs: Vec<PathBuf> = host.runtime.include_dir.clone().into_iter().collect();
    include_dirs.extend(
        config
            .extension
            .include_dirs
            .iter()
            .map(|dir| options.source.resolve(dir)),
    );
    let library_dirs = config
        .extension
        .library_dirs
        .iter()
        .map(|dir| options.source.resolve(dir))
        .collect();

    let compiler = CCompiler::new(
        CompilerSettings {
            cc: config.cc(),
            cflags: config.cflags(),
            ldflags: config.ldflags(),
            include_dirs,
            library_dirs,
            os: host.os.clone(),
        },
        options.verbose,
    );

    let build_dir = options
        .build_dir
        .clone()
        .unwrap_or_else(|| source_dir.join("build"));
    let command = ResilientBuildCommand::new(
        compiler,
        CatchPolicy::from_flag(build_config.catch_io_errors),
        BuildPaths::new(source_dir, &build_dir),
    );
    let mut packager =
        SetupPackager::new(source_dir, &build_dir, metadata, command, options.verbose);

    let report = Orchestrator::new(build_config).run(&mut packager, &mut ConsoleReporter)?;

    match report.mode {
        BuildMode::Native => {
            for ext in &report.extensions {
                println!(
                    "Built {} ({:.2}s)",
                    ext.name,
                    ext.duration.as_secs_f64()
                );
            }
            println!("Build complete: {}", build_dir.display());
        }
        BuildMode::PurePython => {
            println!("Build complete without speedups: {}", build_dir.display());
        }
    }

    Ok(())
}
