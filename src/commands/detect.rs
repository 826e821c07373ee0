//! Detect command - show what a build on this host would attempt

use anyhow::Result;
use serde::Serialize;

use shapely_build::capability::{BuildConfiguration, HostInfo, detect_capabilities};

use super::SourceOptions;

#[derive(Debug, Serialize)]
struct DetectReport<'a> {
    os: &'a str,
    implementation: Option<&'a str>,
    version: Option<&'a str>,
    configuration: &'a BuildConfiguration,
}

/// Print the host runtime and the resulting build configuration
pub(crate) fn run(source: &SourceOptions, no_speedups: bool, json: bool) -> Result<()> {
    let config = source.load_config()?;
    let host = HostInfo::detect(&config.python());
    let build_config = detect_capabilities(&host).with_overrides(&config.extension, no_speedups);

    let implementation = host.runtime.implementation.as_ref().map(|i| i.as_str());
    let version = host.runtime.version.as_deref();

    if json {
        let report = DetectReport {
            os: &host.os,
            implementation,
            version,
            configuration: &build_config,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Platform        {}", host.os);
    println!("Implementation  {}", implementation.unwrap_or("unknown"));
    println!("Version         {}", version.unwrap_or("unknown"));
    println!();
    println!(
        "Speedups        {}",
        if build_config.extension_enabled {
            "enabled"
        } else {
            "disabled"
        }
    );
    if let Some(library) = &build_config.native_library_name {
        println!("GEOS library    {library}");
    }
    for data in &build_config.extra_data_files {
        println!("Data files      {} -> {}", data.source_glob, data.destination);
    }
    println!(
        "I/O errors      {}",
        if build_config.catch_io_errors {
            "fall back"
        } else {
            "fatal"
        }
    );

    Ok(())
}
