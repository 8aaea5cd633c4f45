// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Logging initialization
//!
//! Console output always; with the `file-logging` feature and a `log_dir`, also a
//! timestamped run folder with daily rotation:
//! ```text
//! ./logs/
//!   └── run_20250101_120000/
//!       └── neuromod.log
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;
use crate::config::{LogFormat, LoggingConfig};

const RUN_FOLDER_PREFIX: &str = "run_";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Logging initialization result
///
/// Keep it alive for the lifetime of the program; dropping it flushes file output.
pub struct LoggingGuard {
    #[cfg(feature = "file-logging")]
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
    log_dir: Option<PathBuf>,
}

impl LoggingGuard {
    /// Run folder receiving log files, if file logging is active
    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }
}

/// Build the `EnvFilter` for `config.level` raised by `debug_flags`
pub fn build_filter(debug_flags: &CrateDebugFlags, config: &LoggingConfig) -> Result<EnvFilter> {
    let directives = debug_flags.to_filter_string(&config.level);
    EnvFilter::try_new(&directives)
        .with_context(|| format!("Invalid log filter: {}", directives))
}

/// Install the global subscriber
///
/// # Errors
///
/// Fails if the level is not a valid filter, the run folder cannot be created, or a
/// global subscriber is already installed.
pub fn init_logging(debug_flags: &CrateDebugFlags, config: &LoggingConfig) -> Result<LoggingGuard> {
    let mut layers: Vec<BoxedLayer> = Vec::new();

    // Console layer (human-readable)
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(debug_flags.any_enabled())
        .with_file(false)
        .with_line_number(false);
    let console_layer = match config.format {
        LogFormat::Full => console_layer
            .with_filter(build_filter(debug_flags, config)?)
            .boxed(),
        LogFormat::Compact => console_layer
            .compact()
            .with_filter(build_filter(debug_flags, config)?)
            .boxed(),
    };
    layers.push(console_layer);

    #[cfg(feature = "file-logging")]
    let (file_guard, log_dir) = match &config.log_dir {
        Some(base) => {
            let (layer, guard, run_folder) = file_layer(debug_flags, config, base)?;
            layers.push(layer);
            (Some(guard), Some(run_folder))
        }
        None => (None, None),
    };
    #[cfg(not(feature = "file-logging"))]
    let log_dir: Option<PathBuf> = None;

    Registry::default()
        .with(layers)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    #[cfg(not(feature = "file-logging"))]
    if config.log_dir.is_some() {
        tracing::warn!("log_dir is set but file logging is not compiled in; logging to console only");
    }

    Ok(LoggingGuard {
        #[cfg(feature = "file-logging")]
        _file_guard: file_guard,
        log_dir,
    })
}

#[cfg(feature = "file-logging")]
fn file_layer(
    debug_flags: &CrateDebugFlags,
    config: &LoggingConfig,
    base: &Path,
) -> Result<(BoxedLayer, tracing_appender::non_blocking::WorkerGuard, PathBuf)> {
    use chrono::Utc;
    use tracing_appender::rolling;

    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let run_folder = base.join(format!("{}{}", RUN_FOLDER_PREFIX, timestamp));
    std::fs::create_dir_all(&run_folder)
        .with_context(|| format!("Failed to create log directory: {}", run_folder.display()))?;

    // the new run folder counts towards retention
    prune_run_folders(base, config.retention_runs.max(1))?;

    let appender = rolling::daily(&run_folder, "neuromod.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_filter(build_filter(debug_flags, config)?)
        .boxed();

    Ok((layer, guard, run_folder))
}

/// Delete all but the `keep` most recent `run_*` folders under `base_log_dir`
///
/// Run folder names sort chronologically. Returns the number of folders removed.
pub fn prune_run_folders(base_log_dir: &Path, keep: usize) -> Result<usize> {
    if !base_log_dir.exists() {
        return Ok(0);
    }

    let mut runs: Vec<PathBuf> = Vec::new();
    for entry in std::fs::read_dir(base_log_dir)
        .with_context(|| format!("Failed to read log directory: {}", base_log_dir.display()))?
    {
        let path = entry?.path();
        let is_run = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(RUN_FOLDER_PREFIX));
        if path.is_dir() && is_run {
            runs.push(path);
        }
    }

    // Sort oldest first
    runs.sort();

    let excess = runs.len().saturating_sub(keep);
    let mut removed = 0;
    for path in runs.iter().take(excess) {
        if let Err(e) = std::fs::remove_dir_all(path) {
            eprintln!("Warning: Failed to remove old log directory {}: {}", path.display(), e);
        } else {
            removed += 1;
        }
    }
    Ok(removed)
}
