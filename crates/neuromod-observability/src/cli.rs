// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! CLI argument parsing for per-crate debug flags
//!
//! Supports flags like `--debug-neuromod-synapse` to raise one crate to debug level.

use std::collections::HashMap;
use std::env;

use crate::KNOWN_CRATES;

/// Environment variable holding comma-separated crate names (or `all`)
pub const DEBUG_ENV_VAR: &str = "NEUROMOD_DEBUG";

/// Parse debug flags from command-line arguments
///
/// # Example
/// ```rust
/// use neuromod_observability::CrateDebugFlags;
///
/// let flags = CrateDebugFlags::from_args(std::env::args());
/// if flags.is_enabled("neuromod-synapse") {
///     // debug logging for the synapse crate
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct CrateDebugFlags {
    pub enabled_crates: HashMap<String, bool>,
}

impl CrateDebugFlags {
    /// Parse debug flags from command-line arguments
    ///
    /// Looks for arguments matching `--debug-{crate-name}`.
    /// Also supports `--debug-all` to enable all known crates.
    pub fn from_args<I>(args: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut flags = CrateDebugFlags::default();

        for arg in args {
            if arg == "--debug-all" {
                flags.enable_all();
                continue;
            }

            if let Some(crate_name) = arg.strip_prefix("--debug-") {
                flags.enable(crate_name);
            }
        }

        flags
    }

    /// Merge a `NEUROMOD_DEBUG`-style value: `all` or comma-separated crate names
    pub fn merge_env_value(&mut self, value: &str) {
        if value.trim() == "all" {
            self.enable_all();
            return;
        }
        for crate_name in value.split(',') {
            let crate_name = crate_name.trim();
            if !crate_name.is_empty() {
                self.enable(crate_name);
            }
        }
    }

    pub fn enable(&mut self, crate_name: &str) {
        self.enabled_crates.insert(crate_name.to_string(), true);
    }

    fn enable_all(&mut self) {
        for crate_name in KNOWN_CRATES {
            self.enable(crate_name);
        }
    }

    /// Check if debug is enabled for a specific crate
    pub fn is_enabled(&self, crate_name: &str) -> bool {
        self.enabled_crates.contains_key(crate_name)
    }

    /// Get all enabled crates, sorted
    pub fn enabled_crates(&self) -> Vec<&String> {
        let mut crates: Vec<&String> = self.enabled_crates.keys().collect();
        crates.sort();
        crates
    }

    /// Check if debug is enabled for any crate
    pub fn any_enabled(&self) -> bool {
        !self.enabled_crates.is_empty()
    }

    /// Returns `tracing::Level::DEBUG` if enabled, `tracing::Level::INFO` otherwise.
    pub fn log_level(&self, crate_name: &str) -> tracing::Level {
        if self.is_enabled(crate_name) {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Create an `EnvFilter` directive string from the debug flags
    ///
    /// Tracing targets use the crate's module path, so `neuromod-synapse` becomes
    /// `neuromod_synapse=debug`. `default_level` applies to everything else.
    pub fn to_filter_string(&self, default_level: &str) -> String {
        let mut filters: Vec<String> = self
            .enabled_crates()
            .into_iter()
            .map(|crate_name| format!("{}=debug", crate_name.replace('-', "_")))
            .collect();
        filters.push(default_level.to_lowercase());
        filters.join(",")
    }
}

/// Debug flags from command-line arguments plus the `NEUROMOD_DEBUG` environment variable
pub fn parse_debug_flags() -> CrateDebugFlags {
    let mut flags = CrateDebugFlags::from_args(env::args());
    if let Ok(value) = env::var(DEBUG_ENV_VAR) {
        flags.merge_env_value(&value);
    }
    flags
}

/// Generate help text for debug flags
pub fn debug_flags_help() -> String {
    format!(
        r#"Debug Flags:
  --debug-all                    Enable debug logging for all crates
  --debug-{{crate-name}}          Enable debug logging for specific crate

Available crates:
  {}

Environment Variable:
  NEUROMOD_DEBUG={{crate-name}}[,{{crate-name}}]  Enable debug for crates (comma-separated)
  NEUROMOD_DEBUG=all                               Enable debug for all crates

Examples:
  --debug-neuromod-synapse
  NEUROMOD_DEBUG=neuromod-synapse,neuromod-config
"#,
        KNOWN_CRATES.join(", ")
    )
}
