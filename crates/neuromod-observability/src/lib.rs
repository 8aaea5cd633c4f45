// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # neuromod-observability
//!
//! Logging setup shared by the neuromodulation crates, with per-crate debug flag support.
//!
//! ## Features
//! - `file-logging`: Timestamped run folders with daily log rotation (desktop only)

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod config;
pub mod init;

// Re-export commonly used items
pub use cli::*;
pub use config::*;
pub use init::*;

/// Crates accepted by `--debug-{crate}` and `NEUROMOD_DEBUG`
pub const KNOWN_CRATES: &[&str] = &["neuromod-synapse", "neuromod-config", "neuromod-observability"];
