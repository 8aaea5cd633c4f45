// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Synapse type registry
//!
//! A synapse type (model) fixes the modulation rule of its instances and owns the
//! shared parameters they are updated with. Three types are built in:
//!
//! | name                 | modulation                  |
//! |----------------------|-----------------------------|
//! | `modulatory_synapse` | identity                    |
//! | `d1_synapse`         | `1 + alpha * ratio`         |
//! | `d2_synapse`         | `1 - alpha * ratio`         |
//!
//! Further types are derived with [`SynapseModelRegistry::copy_model`]. Each derived
//! type gets its own shared parameters, starting from a copy of its base's.

use std::sync::Arc;

use ahash::AHashMap;
use neuromod_config::{ModulationConfig, NeuromodConfig, SynapseModelConfig};
use serde_json::json;
use tracing::info;

use crate::delivery::StampFilter;
use crate::error::{ModulationError, Result};
use crate::function::{IdentityConvention, ModulationFunction, ModulationRule};
use crate::params::SharedModulationParameters;
use crate::source::NodeDirectory;
use crate::status::{keys, read_value, StatusDict};
use crate::synapse::{ModulatedSynapse, DEFAULT_BASELINE_WEIGHT};

pub const MODULATORY_SYNAPSE: &str = "modulatory_synapse";
pub const D1_SYNAPSE: &str = "d1_synapse";
pub const D2_SYNAPSE: &str = "d2_synapse";

const SCALE_KEY: &str = "scale";
const STAMP_FILTER_KEY: &str = "stamp_filter";

/// One registered synapse type
#[derive(Debug, Clone)]
pub struct SynapseModel {
    name: String,
    rule: ModulationRule,
    default_baseline_weight: f64,
    params: Arc<SharedModulationParameters>,
}

impl SynapseModel {
    pub fn new(name: impl Into<String>, rule: ModulationRule) -> Self {
        let name = name.into();
        let params = SharedModulationParameters::shared(name.clone());
        Self {
            name,
            rule,
            default_baseline_weight: DEFAULT_BASELINE_WEIGHT,
            params,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rule(&self) -> &ModulationRule {
        &self.rule
    }

    pub fn default_baseline_weight(&self) -> f64 {
        self.default_baseline_weight
    }

    /// Shared parameters of this type
    pub fn params(&self) -> &Arc<SharedModulationParameters> {
        &self.params
    }

    pub fn create_synapse(&self) -> ModulatedSynapse {
        ModulatedSynapse::with_baseline_weight(self.rule, self.default_baseline_weight)
    }

    pub fn create_synapse_with_weight(&self, baseline_weight: f64) -> ModulatedSynapse {
        ModulatedSynapse::with_baseline_weight(self.rule, baseline_weight)
    }

    pub fn get_status(&self) -> StatusDict {
        let mut d = self.params.get_status();
        d.insert(keys::BASELINE_WEIGHT.into(), json!(self.default_baseline_weight));
        if let Some(alpha) = self.rule.function.alpha() {
            d.insert(keys::ALPHA.into(), json!(alpha));
        }
        d.insert(SCALE_KEY.into(), json!(self.rule.scale));
        d.insert(STAMP_FILTER_KEY.into(), json!(self.rule.stamp_filter));
        d
    }

    /// Update type-level defaults and shared parameters.
    ///
    /// Rule changes (`alpha`, `scale`, `stamp_filter`, `baseline_weight`) apply to
    /// synapses created afterwards. Nothing is written unless every key validates.
    pub fn set_status(&mut self, d: &StatusDict, directory: &NodeDirectory) -> Result<()> {
        let mut rule = self.rule;
        if let Some(alpha) = read_value::<f64>(d, keys::ALPHA)? {
            rule.function = rule.function.with_alpha(alpha)?;
        }
        if let Some(scale) = read_value::<f64>(d, SCALE_KEY)? {
            rule = rule.with_scale(scale)?;
        }
        if let Some(filter) = read_value::<StampFilter>(d, STAMP_FILTER_KEY)? {
            rule = rule.with_stamp_filter(filter);
        }
        let baseline = read_value::<f64>(d, keys::BASELINE_WEIGHT)?;

        self.params.set_status(d, directory)?;

        self.rule = rule;
        if let Some(baseline) = baseline {
            self.default_baseline_weight = baseline;
        }
        Ok(())
    }
}

/// Registry of synapse types by name
#[derive(Debug, Default)]
pub struct SynapseModelRegistry {
    models: AHashMap<String, SynapseModel>,
}

impl SynapseModelRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the three built-in types with default rules
    pub fn with_builtin_models() -> Self {
        let mut registry = Self::new();
        for model in builtin_models(&ModulationConfig::default()) {
            registry.models.insert(model.name.clone(), model);
        }
        registry
    }

    /// Built-in types with defaults from `config`, then every `[[synapse_models]]` entry
    /// derived in file order.
    ///
    /// Sources referenced by id must already be present in `directory`.
    pub fn from_config(config: &NeuromodConfig, directory: &NodeDirectory) -> Result<Self> {
        let mut registry = Self::new();
        for model in builtin_models(&config.modulation) {
            if config.modulation.max_modulation != model.params.saturation() {
                model.params.set_saturation(config.modulation.max_modulation)?;
            }
            registry.register(model)?;
        }
        for entry in &config.synapse_models {
            registry.copy_model(&entry.base, &entry.name, &entry_status(entry), directory)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, model: SynapseModel) -> Result<()> {
        if self.models.contains_key(&model.name) {
            return Err(ModulationError::DuplicateModel(model.name));
        }
        info!("registered synapse type '{}'", model.name);
        self.models.insert(model.name.clone(), model);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&SynapseModel> {
        self.models
            .get(name)
            .ok_or_else(|| ModulationError::UnknownModel(name.to_string()))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut SynapseModel> {
        self.models
            .get_mut(name)
            .ok_or_else(|| ModulationError::UnknownModel(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Registered type names, sorted
    pub fn model_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.models.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Derive `new_name` from `base` and apply `status` to the new type.
    ///
    /// Nothing is registered if `status` fails validation.
    pub fn copy_model(
        &mut self,
        base: &str,
        new_name: &str,
        status: &StatusDict,
        directory: &NodeDirectory,
    ) -> Result<&SynapseModel> {
        if self.contains(new_name) {
            return Err(ModulationError::DuplicateModel(new_name.to_string()));
        }
        let base_model = self.get(base)?;
        let mut model = SynapseModel {
            name: new_name.to_string(),
            rule: base_model.rule,
            default_baseline_weight: base_model.default_baseline_weight,
            params: Arc::new(base_model.params.duplicate(new_name)),
        };
        model.set_status(status, directory)?;

        info!("derived synapse type '{}' from '{}'", new_name, base);
        self.models.insert(new_name.to_string(), model);
        self.get(new_name)
    }

    /// New synapse of type `name` with the type's default baseline weight
    pub fn create_synapse(&self, name: &str) -> Result<ModulatedSynapse> {
        Ok(self.get(name)?.create_synapse())
    }

    pub fn get_model_status(&self, name: &str) -> Result<StatusDict> {
        Ok(self.get(name)?.get_status())
    }

    pub fn set_model_status(
        &mut self,
        name: &str,
        status: &StatusDict,
        directory: &NodeDirectory,
    ) -> Result<()> {
        self.get_mut(name)?.set_status(status, directory)
    }
}

fn builtin_models(modulation: &ModulationConfig) -> Vec<SynapseModel> {
    let convention = match modulation.identity_convention.as_str() {
        "unmodulated" => IdentityConvention::Unmodulated,
        _ => IdentityConvention::Literal,
    };
    let stamp_filter = match modulation.stamp_filter.as_str() {
        "drop_odd" => StampFilter::DropOdd,
        _ => StampFilter::DeliverAll,
    };

    let identity = ModulationFunction::Identity { convention };
    let increase = ModulationFunction::SaturatingIncrease {
        alpha: crate::function::DEFAULT_ALPHA,
    };
    let decrease = ModulationFunction::SaturatingDecrease {
        alpha: crate::function::DEFAULT_ALPHA,
    };

    [
        (MODULATORY_SYNAPSE, identity, modulation.identity_scale),
        (D1_SYNAPSE, increase, modulation.saturating_scale),
        (D2_SYNAPSE, decrease, modulation.saturating_scale),
    ]
    .into_iter()
    .map(|(name, function, scale)| {
        let mut rule = ModulationRule::new(function).with_stamp_filter(stamp_filter);
        if let Some(scale) = scale {
            rule.scale = scale;
        }
        SynapseModel::new(name, rule)
    })
    .collect()
}

fn entry_status(entry: &SynapseModelConfig) -> StatusDict {
    let mut d = StatusDict::new();
    if let Some(alpha) = entry.alpha {
        d.insert(keys::ALPHA.into(), json!(alpha));
    }
    if let Some(max_modulation) = entry.max_modulation {
        d.insert(keys::MAX_MODULATION.into(), json!(max_modulation));
    }
    if let Some(source) = entry.source {
        d.insert(keys::SOURCE.into(), json!(source));
    }
    if let Some(baseline) = entry.baseline_weight {
        d.insert(keys::BASELINE_WEIGHT.into(), json!(baseline));
    }
    d
}
