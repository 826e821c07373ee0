//! shapely-build command-line interface
//!
//! Builds Shapely, with the GEOS speedups extension when the host can
//! compile it and without it otherwise.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use commands::SourceOptions;
use commands::build::BuildOptions;

/// Display an error with optional backtrace information
fn display_error(err: &anyhow::Error, backtrace_enabled: bool) {
    eprintln!("error: {err}");

    // Show error chain
    let mut source = err.source();
    while let Some(err) = source {
        eprintln!("caused by: {err}");
        source = err.source();
    }

    if backtrace_enabled {
        let backtrace = err.backtrace();
        if backtrace.status() == std::backtrace::BacktraceStatus::Captured {
            eprintln!("\nBacktrace:");
            eprintln!("{backtrace}");
        } else {
            eprintln!("\nBacktrace not captured; set RUST_BACKTRACE=1");
        }
    }
}

#[derive(Parser)]
#[command(name = "shapely-build")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build Shapely with optional GEOS speedups", long_about = None)]
pub(crate) struct Cli {
    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Show a backtrace with errors
    #[arg(long, global = true)]
    backtrace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct SourceArgs {
    /// Source tree root
    #[arg(long, default_value = ".")]
    source_dir: PathBuf,

    /// Config file to use instead of the searched ones
    #[arg(long, conflicts_with = "no_config")]
    config: Option<PathBuf>,

    /// Ignore all config files
    #[arg(long)]
    no_config: bool,
}

impl From<SourceArgs> for SourceOptions {
    fn from(args: SourceArgs) -> Self {
        Self {
            source_dir: args.source_dir,
            config: args.config,
            no_config: args.no_config,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build the package, falling back to pure Python if speedups cannot be compiled
    Build {
        #[command(flatten)]
        source: SourceArgs,

        /// Output directory (default: <source-dir>/build)
        #[arg(long)]
        build_dir: Option<PathBuf>,

        /// Do not attempt the C extension
        #[arg(long)]
        no_speedups: bool,

        /// Show compiler commands and copied files
        #[arg(long)]
        verbose: bool,
    },

    /// Show the detected runtime and build configuration
    Detect {
        #[command(flatten)]
        source: SourceArgs,

        /// Do not attempt the C extension
        #[arg(long)]
        no_speedups: bool,

        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Regenerate the speedups C source in a development checkout
    Generate {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Print the PKG-INFO a build would write
    Metadata {
        #[command(flatten)]
        source: SourceArgs,
    },
}

fn main() {
    let cli = Cli::parse();

    shapely_build::init_debug(cli.debug);
    let backtrace = cli.backtrace;

    let result = match cli.command {
        Commands::Build {
            source,
            build_dir,
            no_speedups,
            verbose,
        } => commands::build::run(&BuildOptions {
            source: source.into(),
            build_dir,
            no_speedups,
            verbose,
        }),
        Commands::Detect {
            source,
            no_speedups,
            json,
        } => commands::detect::run(&source.into(), no_speedups, json),
        Commands::Generate { source } => commands::generate::run(&source.into()),
        Commands::Metadata { source } => commands::metadata::run(&source.into()),
    };

    if let Err(e) = result {
        display_error(&e, backtrace);
        process::exit(1);
    }
}

mod commands;
