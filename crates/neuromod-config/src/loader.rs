// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! This module implements the 3-tier configuration loading system:
//! 1. TOML file (base defaults)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{validate_config, ConfigError, ConfigResult, NeuromodConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// File name searched for when no explicit path is given
pub const CONFIG_FILE_NAME: &str = "neuromod_configuration.toml";

/// Find the configuration file
///
/// Search order:
/// 1. `NEUROMOD_CONFIG_PATH` environment variable
/// 2. Current working directory
/// 3. Up to 5 parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("NEUROMOD_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        } else {
            return Err(ConfigError::FileNotFound(format!(
                "Config file specified by NEUROMOD_CONFIG_PATH not found: {}",
                path.display()
            )));
        }
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));
        for ancestor in cwd.ancestors().skip(1).take(5) {
            search_paths.push(ancestor.join(CONFIG_FILE_NAME));
        }
    }

    if let Some(path) = search_paths.iter().find(|p| p.exists()) {
        return Ok(path.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "'{}' not found in any of these locations:\n{}\n\nSet NEUROMOD_CONFIG_PATH to specify a custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration from TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if config file is not found, contains invalid TOML, or fails validation
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<NeuromodConfig> {
    let config_file = if let Some(path) = config_path {
        path.to_path_buf()
    } else {
        find_config_file()?
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: NeuromodConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    validate_config(&config)?;
    Ok(config)
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `NEUROMOD_LOG_LEVEL` -> `system.log_level`
/// - `NEUROMOD_MAX_MODULATION` -> `modulation.max_modulation`
/// - `NEUROMOD_IDENTITY_CONVENTION` -> `modulation.identity_convention`
/// - `NEUROMOD_STAMP_FILTER` -> `modulation.stamp_filter`
/// - `NEUROMOD_WORKERS` -> `driver.workers`
/// - `NEUROMOD_PARTITION_SIZE` -> `driver.partition_size`
pub fn apply_environment_overrides(config: &mut NeuromodConfig) {
    if let Ok(value) = env::var("NEUROMOD_LOG_LEVEL") {
        config.system.log_level = value;
    }
    if let Ok(value) = env::var("NEUROMOD_MAX_MODULATION") {
        if let Ok(max_modulation) = value.parse::<f64>() {
            config.modulation.max_modulation = max_modulation;
        }
    }
    if let Ok(value) = env::var("NEUROMOD_IDENTITY_CONVENTION") {
        config.modulation.identity_convention = value;
    }
    if let Ok(value) = env::var("NEUROMOD_STAMP_FILTER") {
        config.modulation.stamp_filter = value;
    }
    if let Ok(value) = env::var("NEUROMOD_WORKERS") {
        if let Ok(workers) = value.parse::<usize>() {
            config.driver.workers = workers;
        }
    }
    if let Ok(value) = env::var("NEUROMOD_PARTITION_SIZE") {
        if let Ok(size) = value.parse::<usize>() {
            config.driver.partition_size = size;
        }
    }
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - HashMap of CLI arguments (e.g., `{"log_level": "debug", "workers": "4"}`)
pub fn apply_cli_overrides(config: &mut NeuromodConfig, cli_args: &HashMap<String, String>) {
    if let Some(value) = cli_args.get("debug") {
        config.system.debug = value.to_lowercase() == "true" || value == "1";
    }
    if let Some(value) = cli_args.get("log_level") {
        config.system.log_level = value.clone();
    }
    if let Some(value) = cli_args.get("max_modulation") {
        if let Ok(max_modulation) = value.parse::<f64>() {
            config.modulation.max_modulation = max_modulation;
        }
    }
    if let Some(value) = cli_args.get("identity_convention") {
        config.modulation.identity_convention = value.clone();
    }
    if let Some(value) = cli_args.get("stamp_filter") {
        config.modulation.stamp_filter = value.clone();
    }
    if let Some(value) = cli_args.get("workers") {
        if let Ok(workers) = value.parse::<usize>() {
            config.driver.workers = workers;
        }
    }
    if let Some(value) = cli_args.get("partition_size") {
        if let Ok(size) = value.parse::<usize>() {
            config.driver.partition_size = size;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_find_config_file_env_var() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("custom_config.toml");
        File::create(&config_path).unwrap();

        env::set_var("NEUROMOD_CONFIG_PATH", config_path.to_str().unwrap());
        let result = find_config_file();
        env::remove_var("NEUROMOD_CONFIG_PATH");

        assert_eq!(result.unwrap(), config_path);
    }

    #[test]
    fn test_find_config_file_env_var_missing() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        env::set_var("NEUROMOD_CONFIG_PATH", "/nonexistent/neuromod.toml");
        let result = find_config_file();
        env::remove_var("NEUROMOD_CONFIG_PATH");

        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_config_with_models() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[modulation]").unwrap();
        writeln!(file, "max_modulation = 10.0").unwrap();
        writeln!(file, "stamp_filter = \"drop_odd\"").unwrap();
        writeln!(file, "[driver]").unwrap();
        writeln!(file, "partition_size = 64").unwrap();
        writeln!(file, "[[synapse_models]]").unwrap();
        writeln!(file, "name = \"exitmod_synapse\"").unwrap();
        writeln!(file, "base = \"d1_synapse\"").unwrap();
        writeln!(file, "alpha = 3.0").unwrap();
        writeln!(file, "source = 7").unwrap();

        let config = load_config(Some(&config_path), None).unwrap();

        assert_eq!(config.modulation.max_modulation, 10.0);
        assert_eq!(config.modulation.stamp_filter, "drop_odd");
        assert_eq!(config.modulation.identity_convention, "literal");
        assert_eq!(config.driver.partition_size, 64);
        assert_eq!(config.synapse_models.len(), 1);
        assert_eq!(config.synapse_models[0].alpha, Some(3.0));
        assert_eq!(config.synapse_models[0].source, Some(7));
        assert_eq!(config.synapse_models[0].max_modulation, None);
    }

    #[test]
    fn test_load_config_rejects_invalid_values() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[modulation]").unwrap();
        writeln!(file, "max_modulation = -2.0").unwrap();

        let result = load_config(Some(&config_path), None);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_load_config_rejects_bad_toml() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[modulation").unwrap();

        let result = load_config(Some(&config_path), None);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_environment_overrides() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let mut config = NeuromodConfig::default();

        env::set_var("NEUROMOD_MAX_MODULATION", "50");
        env::set_var("NEUROMOD_WORKERS", "4");

        apply_environment_overrides(&mut config);

        env::remove_var("NEUROMOD_MAX_MODULATION");
        env::remove_var("NEUROMOD_WORKERS");

        assert_eq!(config.modulation.max_modulation, 50.0);
        assert_eq!(config.driver.workers, 4);
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = NeuromodConfig::default();
        let mut cli_args = HashMap::new();
        cli_args.insert("identity_convention".to_string(), "unmodulated".to_string());
        cli_args.insert("partition_size".to_string(), "16".to_string());
        cli_args.insert("workers".to_string(), "not-a-number".to_string());

        apply_cli_overrides(&mut config, &cli_args);

        assert_eq!(config.modulation.identity_convention, "unmodulated");
        assert_eq!(config.driver.partition_size, 16);
        assert_eq!(config.driver.workers, 0);
    }

    #[test]
    fn test_override_precedence() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[system]").unwrap();
        writeln!(file, "log_level = \"warn\"").unwrap();
        writeln!(file, "[driver]").unwrap();
        writeln!(file, "workers = 2").unwrap();

        env::set_var("NEUROMOD_LOG_LEVEL", "debug");
        env::set_var("NEUROMOD_WORKERS", "8");

        let mut cli_args = HashMap::new();
        cli_args.insert("log_level".to_string(), "trace".to_string());

        let config = load_config(Some(&config_path), Some(&cli_args)).unwrap();

        env::remove_var("NEUROMOD_LOG_LEVEL");
        env::remove_var("NEUROMOD_WORKERS");

        // CLI wins for log level, env wins for workers (no CLI override)
        assert_eq!(config.system.log_level, "trace");
        assert_eq!(config.driver.workers, 8);
    }
}
