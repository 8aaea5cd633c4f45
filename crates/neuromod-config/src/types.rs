// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `neuromod_configuration.toml`.

use serde::{Deserialize, Serialize};

/// Accepted values of `modulation.identity_convention`
pub const IDENTITY_CONVENTIONS: &[&str] = &["literal", "unmodulated"];

/// Accepted values of `modulation.stamp_filter`
pub const STAMP_FILTERS: &[&str] = &["deliver_all", "drop_odd"];

/// Accepted values of `system.log_level`
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct NeuromodConfig {
    pub system: SystemConfig,
    pub modulation: ModulationConfig,
    pub driver: DriverConfig,
    pub synapse_models: Vec<SynapseModelConfig>,
}

/// System-level configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SystemConfig {
    pub debug: bool,
    pub log_level: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            debug: false,
            log_level: "info".to_string(),
        }
    }
}

/// Defaults applied to every registered synapse type
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModulationConfig {
    /// Saturation constant of the built-in types
    pub max_modulation: f64,
    /// `literal` (f(r) = r) or `unmodulated` (f(r) = 1) for the base type
    pub identity_convention: String,
    /// `deliver_all` or `drop_odd`
    pub stamp_filter: String,
    /// Ratio scale of the identity type (variant default when unset)
    pub identity_scale: Option<f64>,
    /// Ratio scale of the saturating types (variant default when unset)
    pub saturating_scale: Option<f64>,
}

impl Default for ModulationConfig {
    fn default() -> Self {
        Self {
            max_modulation: 1.0,
            identity_convention: "literal".to_string(),
            stamp_filter: "deliver_all".to_string(),
            identity_scale: None,
            saturating_scale: None,
        }
    }
}

/// Update driver configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Worker threads for partition updates (0 = rayon default)
    pub workers: usize,
    /// Synapses per partition
    pub partition_size: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            partition_size: 1024,
        }
    }
}

/// A synapse type derived from a registered one
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SynapseModelConfig {
    pub name: String,
    pub base: String,
    pub alpha: Option<f64>,
    pub max_modulation: Option<f64>,
    /// Node id of the volume transmitter to bind
    pub source: Option<u64>,
    pub baseline_weight: Option<f64>,
}
