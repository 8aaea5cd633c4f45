// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Parameters shared by every synapse of one type
//!
//! Architecture: configure first, then update
//! - Written through `configure` / `set_status` during the configuration phase
//! - Read concurrently by all update workers while an [`UpdatePhase`] guard is held
//! - Thread-safe via Arc<RwLock>; a configure attempt during an update phase is
//!   reported as [`ModulationError::ConfigureDuringUpdate`] instead of blocking

use std::fmt;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ModulationError, Result};
use crate::source::{HostNode, ModulationSource, NodeDirectory, NodeId, SpikeCounter};
use crate::status::{keys, read_source, read_value, source_value, SourceSetting, StatusDict};

/// Default normaliser: one modulatory event per interval saturates the ratio
pub const DEFAULT_SATURATION: f64 = 1.0;

/// Plain view of a synapse type's shared parameters
///
/// Fields are public so hosts can restore persisted state directly; validation
/// happens in [`SharedModulationParameters::configure`].
#[derive(Clone)]
pub struct ModulationParams {
    /// Name of the synapse type these parameters belong to
    pub model: String,
    pub source: Option<Arc<dyn ModulationSource>>,
    /// Maximum plausible aggregate event count per interval
    pub saturation: f64,
}

impl fmt::Debug for ModulationParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModulationParams")
            .field("model", &self.model)
            .field("source", &self.source.as_ref().map(|s| s.source_id()))
            .field("saturation", &self.saturation)
            .finish()
    }
}

impl ModulationParams {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            source: None,
            saturation: DEFAULT_SATURATION,
        }
    }

    pub fn with_source(mut self, source: Arc<dyn ModulationSource>, saturation: f64) -> Self {
        self.source = Some(source);
        self.saturation = saturation;
        self
    }

    fn bound_source(&self) -> Result<&Arc<dyn ModulationSource>> {
        self.source.as_ref().ok_or_else(|| ModulationError::Unconfigured {
            model: self.model.clone(),
        })
    }

    pub fn interval_length(&self) -> Result<u64> {
        Ok(self.bound_source()?.interval_length())
    }

    /// Take the bound source's batch for the interval that just ended
    pub fn drain_batch(&self) -> Result<Vec<SpikeCounter>> {
        Ok(self.bound_source()?.drain_interval_batch())
    }

    /// `scale * total_events / (interval_length * saturation)`
    pub fn modulation_ratio(&self, total_events: f64, scale: f64) -> Result<f64> {
        let interval_length = self.interval_length()?;
        let denominator = interval_length as f64 * self.saturation;
        if denominator == 0.0 {
            return Err(ModulationError::DivisionByZero {
                interval_length,
                saturation: self.saturation,
            });
        }
        Ok(scale * total_events / denominator)
    }

    pub fn snapshot(&self) -> ParamsSnapshot {
        ParamsSnapshot {
            source: self.source.as_ref().map(|s| s.source_id()),
            saturation: self.saturation,
        }
    }
}

/// Read-only introspection view of shared parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamsSnapshot {
    pub source: Option<NodeId>,
    pub saturation: f64,
}

impl ParamsSnapshot {
    pub fn to_status(&self) -> StatusDict {
        let mut d = StatusDict::new();
        d.insert(keys::SOURCE.into(), source_value(self.source));
        d.insert(keys::MAX_MODULATION.into(), self.saturation.into());
        d
    }
}

/// Read guard held by the update driver for one whole interval
pub type UpdatePhase<'a> = RwLockReadGuard<'a, ModulationParams>;

/// Shared parameters of one synapse type
pub struct SharedModulationParameters {
    inner: RwLock<ModulationParams>,
}

impl fmt::Debug for SharedModulationParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_read() {
            Some(params) => fmt::Debug::fmt(&*params, f),
            None => f.write_str("SharedModulationParameters { <locked> }"),
        }
    }
}

impl SharedModulationParameters {
    pub fn new(model: impl Into<String>) -> Self {
        Self::from_params(ModulationParams::new(model))
    }

    pub fn from_params(params: ModulationParams) -> Self {
        Self {
            inner: RwLock::new(params),
        }
    }

    /// Convenience constructor returning the shared handle
    pub fn shared(model: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::new(model))
    }

    /// Independent copy under a new type name, keeping source and saturation
    pub fn duplicate(&self, model: impl Into<String>) -> Self {
        let mut params = self.inner.read().clone();
        params.model = model.into();
        Self::from_params(params)
    }

    pub fn model(&self) -> String {
        self.inner.read().model.clone()
    }

    /// Bind `node` as modulation source and set the saturation constant.
    ///
    /// # Errors
    ///
    /// - `InvalidSource` if `node` is not a modulation source
    /// - `InvalidParameter` if `saturation` is not a finite positive number
    /// - `ConfigureDuringUpdate` if an update phase currently holds the parameters
    pub fn configure(&self, node: Arc<dyn HostNode>, saturation: f64) -> Result<()> {
        let id = node.node_id();
        let model_name = node.model_name().to_string();
        let source = node.as_modulation_source().ok_or_else(|| {
            ModulationError::InvalidSource(format!("{} is a '{}' node", id, model_name))
        })?;
        self.bind(source, saturation)
    }

    /// Bind an already resolved source; same validation as [`Self::configure`]
    pub fn bind(&self, source: Arc<dyn ModulationSource>, saturation: f64) -> Result<()> {
        validate_saturation(saturation)?;
        let mut params = self.write()?;
        source.bind();
        info!(
            "synapse type '{}' bound to volume transmitter {} (interval {} steps, max_modulation {})",
            params.model,
            source.source_id(),
            source.interval_length(),
            saturation
        );
        params.source = Some(source);
        params.saturation = saturation;
        Ok(())
    }

    pub fn set_saturation(&self, saturation: f64) -> Result<()> {
        validate_saturation(saturation)?;
        self.write()?.saturation = saturation;
        Ok(())
    }

    pub fn saturation(&self) -> f64 {
        self.inner.read().saturation
    }

    pub fn is_configured(&self) -> bool {
        self.inner.read().source.is_some()
    }

    pub fn current_interval_length(&self) -> Result<u64> {
        self.inner.read().interval_length()
    }

    pub fn snapshot_for_status(&self) -> ParamsSnapshot {
        self.inner.read().snapshot()
    }

    /// Enter the update phase. `configure` fails until the guard is dropped.
    pub fn begin_update_phase(&self) -> UpdatePhase<'_> {
        self.inner.read()
    }

    pub fn get_status(&self) -> StatusDict {
        let params = self.inner.read();
        let mut d = params.snapshot().to_status();
        d.insert(keys::SYNAPSE_MODEL.into(), params.model.clone().into());
        d
    }

    /// Apply `source` and `max_modulation` from a status dictionary.
    ///
    /// Both keys are validated before either is written. `"none"` is accepted as a
    /// source only while no source is bound, so an unbound type's status can be
    /// written back; a bound source cannot be removed.
    pub fn set_status(&self, d: &StatusDict, directory: &NodeDirectory) -> Result<()> {
        let saturation = read_value::<f64>(d, keys::MAX_MODULATION)?;
        let source = match read_source(d)? {
            Some(SourceSetting::Node(id)) => Some(directory.resolve_source(id)?),
            Some(SourceSetting::Unbound) if self.is_configured() => {
                return Err(ModulationError::InvalidSource(
                    "a bound source cannot be removed".to_string(),
                ))
            }
            Some(SourceSetting::Unbound) | None => None,
        };

        match (source, saturation) {
            (Some(source), saturation) => {
                let saturation = saturation.unwrap_or_else(|| self.saturation());
                self.bind(source, saturation)
            }
            (None, Some(saturation)) => self.set_saturation(saturation),
            (None, None) => Ok(()),
        }
    }

    fn write(&self) -> Result<parking_lot::RwLockWriteGuard<'_, ModulationParams>> {
        self.inner.try_write().ok_or_else(|| {
            // update phases hold shared guards, so a read still succeeds here
            ModulationError::ConfigureDuringUpdate {
                model: self.inner.try_read().map(|p| p.model.clone()).unwrap_or_default(),
            }
        })
    }
}

fn validate_saturation(saturation: f64) -> Result<()> {
    if !saturation.is_finite() || saturation <= 0.0 {
        return Err(ModulationError::invalid_parameter(
            keys::MAX_MODULATION,
            format!("must be a finite positive number, got {}", saturation),
        ));
    }
    Ok(())
}
