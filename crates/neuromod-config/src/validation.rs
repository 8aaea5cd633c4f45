// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! This module provides validation logic to ensure configuration values are
//! consistent and within valid ranges. All problems are collected and reported
//! together.

use std::collections::HashSet;

use crate::types::{IDENTITY_CONVENTIONS, LOG_LEVELS, STAMP_FILTERS};
use crate::{ConfigError, ConfigResult, NeuromodConfig};

/// Validation errors that can occur during config validation
#[derive(Debug, Clone)]
pub enum ConfigValidationError {
    MissingRequired { field: String },
    InvalidValue { field: String, reason: String },
    DuplicateModel { name: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRequired { field } => {
                write!(f, "Missing required configuration: {}", field)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
            Self::DuplicateModel { name } => {
                write!(f, "Synapse model '{}' is defined more than once", name)
            }
        }
    }
}

/// Validate the complete configuration
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every violation found
pub fn validate_config(config: &NeuromodConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_system(config, &mut errors);
    validate_modulation(config, &mut errors);
    validate_driver(config, &mut errors);
    validate_synapse_models(config, &mut errors);

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> ConfigValidationError {
    ConfigValidationError::InvalidValue {
        field: field.into(),
        reason: reason.into(),
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn validate_system(config: &NeuromodConfig, errors: &mut Vec<ConfigValidationError>) {
    if !LOG_LEVELS.contains(&config.system.log_level.to_lowercase().as_str()) {
        errors.push(invalid(
            "system.log_level",
            format!("must be one of {}", LOG_LEVELS.join(", ")),
        ));
    }
}

fn validate_modulation(config: &NeuromodConfig, errors: &mut Vec<ConfigValidationError>) {
    let modulation = &config.modulation;

    if !is_positive(modulation.max_modulation) {
        errors.push(invalid("modulation.max_modulation", "must be positive"));
    }
    if !IDENTITY_CONVENTIONS.contains(&modulation.identity_convention.as_str()) {
        errors.push(invalid(
            "modulation.identity_convention",
            format!("must be one of {}", IDENTITY_CONVENTIONS.join(", ")),
        ));
    }
    if !STAMP_FILTERS.contains(&modulation.stamp_filter.as_str()) {
        errors.push(invalid(
            "modulation.stamp_filter",
            format!("must be one of {}", STAMP_FILTERS.join(", ")),
        ));
    }
    for (field, scale) in [
        ("modulation.identity_scale", modulation.identity_scale),
        ("modulation.saturating_scale", modulation.saturating_scale),
    ] {
        if let Some(scale) = scale {
            if !is_positive(scale) {
                errors.push(invalid(field, "must be positive"));
            }
        }
    }
}

fn validate_driver(config: &NeuromodConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.driver.partition_size == 0 {
        errors.push(invalid("driver.partition_size", "must be at least 1"));
    }
}

fn validate_synapse_models(config: &NeuromodConfig, errors: &mut Vec<ConfigValidationError>) {
    let mut seen = HashSet::new();

    for (i, model) in config.synapse_models.iter().enumerate() {
        let prefix = format!("synapse_models[{}]", i);

        if model.name.is_empty() {
            errors.push(ConfigValidationError::MissingRequired {
                field: format!("{}.name", prefix),
            });
        } else if !seen.insert(model.name.as_str()) {
            errors.push(ConfigValidationError::DuplicateModel {
                name: model.name.clone(),
            });
        }
        if model.base.is_empty() {
            errors.push(ConfigValidationError::MissingRequired {
                field: format!("{}.base", prefix),
            });
        }
        if let Some(alpha) = model.alpha {
            if !alpha.is_finite() || alpha < 0.0 {
                errors.push(invalid(format!("{}.alpha", prefix), "must be non-negative"));
            }
        }
        if let Some(max_modulation) = model.max_modulation {
            if !is_positive(max_modulation) {
                errors.push(invalid(
                    format!("{}.max_modulation", prefix),
                    "must be positive",
                ));
            }
        }
    }
}
