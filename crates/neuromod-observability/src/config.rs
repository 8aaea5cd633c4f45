// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Logging configuration types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Console/file line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level for everything not raised by a debug flag (trace, debug, info, warn, error)
    pub level: String,

    pub format: LogFormat,

    /// Base directory for run folders; `None` logs to the console only
    pub log_dir: Option<PathBuf>,

    /// Keep this many most recent run folders
    pub retention_runs: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            format: LogFormat::Full,
            log_dir: None,
            retention_runs: 10,
        }
    }
}

impl LoggingConfig {
    /// Console-only configuration at `level`
    pub fn console(level: impl Into<String>) -> Self {
        LoggingConfig {
            level: level.into(),
            ..Default::default()
        }
    }
}
