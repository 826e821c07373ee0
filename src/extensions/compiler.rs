//! C Extension Compiling
//!
//! Compiles and links one extension module with the system C compiler.
//! It's the equivalent of:
//! ```bash
//! cc -fPIC -I<python include> -c shapely/speedups/_speedups.c -o temp/_speedups.o
//! cc -shared temp/_speedups.o -lgeos_c -o shapely/speedups/_speedups.so
//! ```
//!
//! Failures are reported as typed [`BuildError`]s; deciding which of them
//! are survivable is left to [`super::ResilientBuildCommand`].

use super::types::{BuildError, BuildPaths, BuiltExtension, ExtensionDescriptor};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

/// Compilers tried, in order, when none is configured
const COMPILER_CANDIDATES: [&str; 3] = ["cc", "gcc", "clang"];

/// The compile-and-link step the resilient build command drives
pub trait ExtensionCompiler {
    /// Locate and validate the toolchain before any extension is built
    ///
    /// # Errors
    ///
    /// Returns `BuildError::Platform` when no usable compiler exists.
    fn prepare(&mut self) -> Result<(), BuildError>;

    /// Compile and link one extension
    ///
    /// # Errors
    ///
    /// Returns `Exec` when a tool cannot be started, `Compiler` when it
    /// fails, and `Io` when build directories cannot be written.
    fn build_extension(
        &self,
        ext: &ExtensionDescriptor,
        paths: &BuildPaths,
    ) -> Result<BuiltExtension, BuildError>;
}

/// Settings for [`CCompiler`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompilerSettings {
    /// Explicit compiler (`CC` or config); searched on `PATH` when unset
    pub cc: Option<String>,
    /// Extra compile flags
    pub cflags: Vec<String>,
    /// Extra link flags
    pub ldflags: Vec<String>,
    /// Header search paths (the interpreter's include dir goes here)
    pub include_dirs: Vec<PathBuf>,
    /// Library search paths
    pub library_dirs: Vec<PathBuf>,
    /// Target OS identifier, decides flags and the module suffix
    pub os: String,
}

/// Compiler program plus the words that precede every argument (`ccache gcc`)
#[derive(Debug, Clone, PartialEq, Eq)]
struct CompilerCommand {
    program: PathBuf,
    prefix_args: Vec<String>,
}

impl CompilerCommand {
    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.prefix_args);
        cmd
    }
}

/// System C compiler driver
#[derive(Debug)]
pub struct CCompiler {
    settings: CompilerSettings,
    /// Resolved compiler, set by `prepare`
    cc: Option<CompilerCommand>,
    /// Enable verbose output
    verbose: bool,
}

impl CCompiler {
    /// Create a compiler driver; nothing is looked up until [`ExtensionCompiler::prepare`]
    #[must_use]
    pub const fn new(settings: CompilerSettings, verbose: bool) -> Self {
        Self {
            settings,
            cc: None,
            verbose,
        }
    }

    /// Find a C compiler executable
    ///
    /// Checks the configured compiler first, then `cc`, `gcc`, `clang` on `PATH`.
    /// A configured compiler may carry leading words, e.g. `ccache gcc`.
    fn find_compiler(&self) -> Result<CompilerCommand, BuildError> {
        if let Some(cc) = &self.settings.cc {
            let mut words = crate::env_vars::split_flags(cc).into_iter();
            let program = words.next().ok_or_else(|| {
                BuildError::Platform("configured C compiler is blank".to_string())
            })?;
            // Spawning a bad path later surfaces as an Exec error
            return Ok(CompilerCommand {
                program: PathBuf::from(program),
                prefix_args: words.collect(),
            });
        }

        COMPILER_CANDIDATES
            .iter()
            .find_map(|name| find_on_path(name))
            .map(|program| CompilerCommand {
                program,
                prefix_args: Vec::new(),
            })
            .ok_or_else(|| {
                BuildError::Platform(
                    "no C compiler found on PATH (tried cc, gcc, clang); set CC to choose one"
                        .to_string(),
                )
            })
    }

    fn compile_command(&self, cc: &CompilerCommand, source: &Path, object: &Path) -> Command {
        let mut cmd = cc.command();
        if !crate::platform::is_windows(&self.settings.os) {
            cmd.arg("-fPIC");
        }
        for dir in &self.settings.include_dirs {
            cmd.arg(format!("-I{}", dir.display()));
        }
        cmd.args(&self.settings.cflags);
        cmd.arg("-c").arg(source).arg("-o").arg(object);
        cmd
    }

    fn link_command(
        &self,
        cc: &CompilerCommand,
        objects: &[PathBuf],
        ext: &ExtensionDescriptor,
        output: &Path,
    ) -> Command {
        let mut cmd = cc.command();
        if crate::platform::is_darwin(&self.settings.os) {
            // Python C-API symbols resolve when the interpreter loads the module
            cmd.args(["-bundle", "-undefined", "dynamic_lookup"]);
        } else {
            cmd.arg("-shared");
        }
        cmd.args(objects);
        for dir in &self.settings.library_dirs {
            cmd.arg(format!("-L{}", dir.display()));
        }
        for library in &ext.libraries {
            cmd.arg(format!("-l{library}"));
        }
        cmd.args(&self.settings.ldflags);
        cmd.arg("-o").arg(output);
        cmd
    }

    /// Run one toolchain command, mapping spawn failures and bad exits
    fn run(&self, mut cmd: Command, step: &str) -> Result<(), BuildError> {
        let program = cmd.get_program().to_string_lossy().into_owned();

        if self.verbose {
            let args: Vec<String> = cmd
                .get_args()
                .map(|a| a.to_string_lossy().into_owned())
                .collect();
            println!("  Running: {program} {}", args.join(" "));
        }

        let output = cmd
            .output()
            .map_err(|e| BuildError::Exec(format!("failed to run {program}: {e}")))?;

        if self.verbose {
            print!("{}", String::from_utf8_lossy(&output.stdout));
        }

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(BuildError::Compiler(format!(
            "{step} failed with exit code {}:\n{}",
            output
                .status
                .code()
                .map_or_else(|| "unknown".to_string(), |c| c.to_string()),
            stderr.trim_end()
        )))
    }
}

impl ExtensionCompiler for CCompiler {
    fn prepare(&mut self) -> Result<(), BuildError> {
        let cc = self.find_compiler()?;
        crate::debug!("using C compiler {} {:?}", cc.program.display(), cc.prefix_args);
        self.cc = Some(cc);
        Ok(())
    }

    fn build_extension(
        &self,
        ext: &ExtensionDescriptor,
        paths: &BuildPaths,
    ) -> Result<BuiltExtension, BuildError> {
        let start_time = Instant::now();
        let cc = self
            .cc
            .as_ref()
            .ok_or_else(|| BuildError::Platform("C compiler was not prepared".to_string()))?;

        if self.verbose {
            println!("Building extension {}", ext.name);
        }

        // Step 1: compile each source into temp/
        let mut objects = Vec::with_capacity(ext.sources.len());
        for source in &ext.sources {
            let object = paths.temp_dir.join(source).with_extension("o");
            if let Some(parent) = object.parent() {
                fs::create_dir_all(parent)?;
            }

            let cmd = self.compile_command(cc, &paths.source_dir.join(source), &object);
            self.run(cmd, &format!("compiling {}", source.display()))?;
            objects.push(object);
        }

        // Step 2: link the shared module at its module path
        let suffix = crate::platform::extension_suffix(&self.settings.os);
        let output = paths.output_dir.join(ext.module_path(suffix));
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)?;
        }

        let cmd = self.link_command(cc, &objects, ext, &output);
        self.run(cmd, &format!("linking {}", ext.name))?;

        Ok(BuiltExtension {
            name: ext.name.clone(),
            path: output,
            duration: start_time.elapsed(),
        })
    }
}

/// Look up an executable on `PATH`
fn find_on_path(name: &str) -> Option<PathBuf> {
    let path_var = env::var_os("PATH")?;
    env::split_paths(&path_var).find_map(|dir| {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
        let exe = candidate.with_extension(env::consts::EXE_EXTENSION);
        (!env::consts::EXE_EXTENSION.is_empty() && exe.is_file()).then_some(exe)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extensions::types::ToolchainErrorKind;
    use tempfile::TempDir;

    fn settings(cc: Option<&str>) -> CompilerSettings {
        CompilerSettings {
            cc: cc.map(ToString::to_string),
            os: "linux2".to_string(),
            ..CompilerSettings::default()
        }
    }

    fn plain_cc() -> CompilerCommand {
        CompilerCommand {
            program: PathBuf::from("cc"),
            prefix_args: Vec::new(),
        }
    }

    fn args_of(cmd: &Command) -> Vec<String> {
        cmd.get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    fn layout(temp: &TempDir) -> BuildPaths {
        let source_dir = temp.path().join("src");
        fs::create_dir_all(source_dir.join("shapely/speedups")).unwrap();
        fs::write(source_dir.join("shapely/speedups/_speedups.c"), "int x;\n").unwrap();
        BuildPaths::new(&source_dir, &temp.path().join("build"))
    }

    #[test]
    fn configured_compiler_is_used_verbatim() {
        let mut compiler = CCompiler::new(settings(Some("/opt/cc/bin/my-cc")), false);
        compiler.prepare().unwrap();
        assert_eq!(
            compiler.cc,
            Some(CompilerCommand {
                program: PathBuf::from("/opt/cc/bin/my-cc"),
                prefix_args: Vec::new(),
            })
        );
    }

    #[test]
    fn configured_launcher_words_prefix_every_command() {
        let mut compiler = CCompiler::new(settings(Some("ccache  gcc -m64")), false);
        compiler.prepare().unwrap();
        let cc = compiler.cc.clone().unwrap();
        assert_eq!(cc.program, PathBuf::from("ccache"));

        let cmd = compiler.compile_command(&cc, Path::new("a.c"), Path::new("a.o"));
        assert_eq!(cmd.get_program(), "ccache");
        assert_eq!(
            args_of(&cmd),
            vec!["gcc", "-m64", "-fPIC", "-c", "a.c", "-o", "a.o"]
        );
    }

    #[test]
    fn blank_configured_compiler_is_a_platform_error() {
        let mut compiler = CCompiler::new(settings(Some("   ")), false);
        let err = compiler.prepare().unwrap_err();
        assert_eq!(err.toolchain_kind(), Some(ToolchainErrorKind::Platform));
    }

    #[test]
    fn unprepared_compiler_is_a_platform_error() {
        let temp = TempDir::new().unwrap();
        let compiler = CCompiler::new(settings(None), false);
        let err = compiler
            .build_extension(&ExtensionDescriptor::speedups("geos_c"), &layout(&temp))
            .unwrap_err();
        assert_eq!(err.toolchain_kind(), Some(ToolchainErrorKind::Platform));
    }

    #[test]
    fn missing_compiler_executable_is_an_exec_error() {
        let temp = TempDir::new().unwrap();
        let mut compiler =
            CCompiler::new(settings(Some("/nonexistent/shapely-build-test-cc")), false);
        compiler.prepare().unwrap();

        let err = compiler
            .build_extension(&ExtensionDescriptor::speedups("geos_c"), &layout(&temp))
            .unwrap_err();
        assert_eq!(err.toolchain_kind(), Some(ToolchainErrorKind::Exec));
        assert!(err.to_string().contains("shapely-build-test-cc"));
    }

    #[cfg(unix)]
    #[test]
    fn failing_compiler_is_a_compiler_error() {
        let temp = TempDir::new().unwrap();
        // `false` starts fine and always exits 1
        let mut compiler = CCompiler::new(settings(Some("false")), false);
        compiler.prepare().unwrap();

        let err = compiler
            .build_extension(&ExtensionDescriptor::speedups("geos_c"), &layout(&temp))
            .unwrap_err();
        assert_eq!(err.toolchain_kind(), Some(ToolchainErrorKind::Compiler));
        assert!(err.to_string().contains("compiling"));
    }

    #[cfg(unix)]
    #[test]
    fn successful_toolchain_reports_module_path() {
        let temp = TempDir::new().unwrap();
        // `true` accepts any arguments; the link output is never checked here
        let mut compiler = CCompiler::new(settings(Some("true")), false);
        compiler.prepare().unwrap();

        let paths = layout(&temp);
        let built = compiler
            .build_extension(&ExtensionDescriptor::speedups("geos_c"), &paths)
            .unwrap();
        assert_eq!(built.name, "shapely.speedups._speedups");
        assert_eq!(
            built.path,
            paths.output_dir.join("shapely/speedups/_speedups.so")
        );
        assert!(paths.temp_dir.join("shapely/speedups").is_dir());
    }

    #[test]
    fn link_command_passes_libraries() {
        let mut config = settings(Some("cc"));
        config.library_dirs = vec![PathBuf::from("/opt/geos/lib")];
        config.ldflags = vec!["-Wl,-rpath,/opt/geos/lib".to_string()];
        let compiler = CCompiler::new(config, false);

        let cmd = compiler.link_command(
            &plain_cc(),
            &[PathBuf::from("a.o")],
            &ExtensionDescriptor::speedups("geos_c"),
            Path::new("out.so"),
        );
        assert_eq!(
            args_of(&cmd),
            vec![
                "-shared",
                "a.o",
                "-L/opt/geos/lib",
                "-lgeos_c",
                "-Wl,-rpath,/opt/geos/lib",
                "-o",
                "out.so"
            ]
        );
    }

    #[test]
    fn darwin_links_a_bundle_with_dynamic_lookup() {
        let mut config = settings(Some("cc"));
        config.os = "darwin".to_string();
        let compiler = CCompiler::new(config, false);

        let cmd = compiler.link_command(
            &plain_cc(),
            &[PathBuf::from("a.o")],
            &ExtensionDescriptor::speedups("geos_c"),
            Path::new("out.so"),
        );
        assert_eq!(
            args_of(&cmd),
            vec![
                "-bundle",
                "-undefined",
                "dynamic_lookup",
                "a.o",
                "-lgeos_c",
                "-o",
                "out.so"
            ]
        );
    }
}
