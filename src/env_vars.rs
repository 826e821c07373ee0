//! Build environment variable handling.
//!
//! Each accessor returns `None` when the variable is unset or empty, so
//! callers can chain `.or(config_value)` fallbacks.

use std::env;

// Helper for boolean environment variables that accept "1", "true", "yes"
fn is_enabled(var: &str) -> bool {
    env::var(var).ok().is_some_and(|s| {
        let s = s.to_lowercase();
        s == "1" || s == "true" || s == "yes"
    })
}

fn non_empty(var: &str) -> Option<String> {
    env::var(var).ok().filter(|s| !s.trim().is_empty())
}

// Toolchain configuration - standard compiler variables

/// Get C compiler override (`CC`).
pub fn cc() -> Option<String> {
    non_empty("CC")
}

/// Get extra compiler flags (`CFLAGS`).
pub fn cflags() -> Option<String> {
    non_empty("CFLAGS")
}

/// Get extra linker flags (`LDFLAGS`).
pub fn ldflags() -> Option<String> {
    non_empty("LDFLAGS")
}

/// Get source generator executable (`CYTHON`).
pub fn cython() -> Option<String> {
    non_empty("CYTHON")
}

// Host runtime - lets packagers describe the target interpreter without running it

/// Get interpreter queried for runtime details (`SHAPELY_PYTHON`).
pub fn python() -> Option<String> {
    non_empty("SHAPELY_PYTHON")
}

/// Get runtime implementation override (`SHAPELY_PYTHON_IMPLEMENTATION`), e.g. "PyPy".
pub fn python_implementation() -> Option<String> {
    non_empty("SHAPELY_PYTHON_IMPLEMENTATION")
}

/// Get runtime version override (`SHAPELY_PYTHON_VERSION`), e.g. "2.7.18".
pub fn python_version() -> Option<String> {
    non_empty("SHAPELY_PYTHON_VERSION")
}

/// Check whether debug output was requested (`SHAPELY_BUILD_DEBUG`).
pub fn debug_requested() -> bool {
    is_enabled("SHAPELY_BUILD_DEBUG")
}

/// Split a flags variable the way a shell would for simple cases (whitespace only).
#[must_use]
pub fn split_flags(flags: &str) -> Vec<String> {
    flags.split_whitespace().map(ToString::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_flags_on_whitespace() {
        assert_eq!(
            split_flags("  -O2 -Wall\t-I/usr/include "),
            vec!["-O2", "-Wall", "-I/usr/include"]
        );
        assert!(split_flags("   ").is_empty());
    }

    #[test]
    fn unset_variable_is_none() {
        assert!(non_empty("SHAPELY_BUILD_SURELY_UNSET_VARIABLE_42").is_none());
        assert!(!is_enabled("SHAPELY_BUILD_SURELY_UNSET_VARIABLE_42"));
    }
}
