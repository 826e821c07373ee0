//! Platform identification
//!
//! Maps the build host onto the interpreter's `sys.platform` naming
//! ("win32", "linux2", "darwin") and picks the DLL bundle shipped with
//! Windows distributions.

use std::env;

/// Identifier used for every Windows build, 32- or 64-bit
pub const WINDOWS: &str = "win32";

/// Destination directory for bundled Windows DLLs
pub const DLL_DESTINATION: &str = "DLLs";

/// Detect the current OS identifier in `sys.platform` format
///
/// Examples: "win32", "linux2", "darwin", "freebsd"
#[must_use]
pub fn os_identifier() -> String {
    match env::consts::OS {
        "windows" => WINDOWS.to_string(),
        "linux" => "linux2".to_string(),
        "macos" => "darwin".to_string(),
        other => other.to_string(),
    }
}

/// Check whether an OS identifier names the Windows family
#[must_use]
pub fn is_windows(os: &str) -> bool {
    os == WINDOWS
}

/// Check whether an OS identifier names macOS
#[must_use]
pub fn is_darwin(os: &str) -> bool {
    os == "darwin"
}

/// File name suffix of a loadable extension module on `os`
#[must_use]
pub fn extension_suffix(os: &str) -> &'static str {
    if is_windows(os) { ".pyd" } else { ".so" }
}

/// Select the DLL glob bundled on Windows
///
/// 64-bit runtimes announce `(AMD64)` in their version banner; 2.5.x was
/// built with VC7; everything else uses the 32-bit VC9 set.
#[must_use]
pub fn windows_dll_glob(banner: Option<&str>, version: Option<&str>) -> &'static str {
    if banner.is_some_and(|b| b.contains("(AMD64)")) {
        "DLLs_AMD64_VC9/*.dll"
    } else if version.is_some_and(|v| v.starts_with("2.5.")) {
        "DLLs_x86_VC7/*.dll"
    } else {
        "DLLs_x86_VC9/*.dll"
    }
}
