//! Debug logging utilities
//!
//! Debug output is off unless `--debug` is passed or `SHAPELY_BUILD_DEBUG`
//! is set. When disabled, the `debug!` macro only checks a flag.

use std::sync::OnceLock;

static DEBUG_ENABLED: OnceLock<bool> = OnceLock::new();

/// Initialize debug mode from the command-line flag, falling back to the environment.
///
/// Only the first call has an effect.
pub fn init_debug(flag: bool) {
    let enabled = flag || crate::env_vars::debug_requested();
    if DEBUG_ENABLED.set(enabled).is_err() {
        debug_log("debug mode already initialized");
    }
}

/// Check if debug mode is enabled
pub fn is_debug_enabled() -> bool {
    DEBUG_ENABLED.get().copied().unwrap_or(false)
}

/// Print a debug message if debug mode is enabled
pub fn debug_log(message: &str) {
    if is_debug_enabled() {
        eprintln!("[DEBUG] {message}");
    }
}

/// Macro for convenient debug logging
///
/// Usage: `debug!("compiling {}", source.display())`
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        if $crate::debug::is_debug_enabled() {
            eprintln!("[DEBUG] {}", format_args!($($arg)*));
        }
    };
}
