// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Status dictionaries
//!
//! Synapses, synapse types and volume transmitters expose their parameters as
//! JSON objects. Keys that are absent from a dictionary passed to `set_status` are
//! left untouched.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ModulationError, Result};
use crate::source::NodeId;

/// Mapping-based status surface
pub type StatusDict = serde_json::Map<String, Value>;

/// Value reported for `source` when no volume transmitter is bound
pub const NO_SOURCE: &str = "none";

pub mod keys {
    pub const BASELINE_WEIGHT: &str = "baseline_weight";
    pub const WEIGHT: &str = "weight";
    pub const ALPHA: &str = "alpha";
    pub const SIZE_OF: &str = "size_of";
    pub const SOURCE: &str = "source";
    pub const MAX_MODULATION: &str = "max_modulation";
    pub const SYNAPSE_MODEL: &str = "synapse_model";
}

/// Read an optional typed value from a status dictionary
pub fn read_value<T: DeserializeOwned>(d: &StatusDict, key: &str) -> Result<Option<T>> {
    match d.get(key) {
        None => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| ModulationError::invalid_parameter(key, e.to_string())),
    }
}

/// Value written to the `source` key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceSetting {
    /// The [`NO_SOURCE`] sentinel
    Unbound,
    Node(NodeId),
}

/// Read the `source` key as a node id or the `"none"` sentinel.
///
/// Anything else (negative numbers, other strings) is rejected with
/// [`ModulationError::InvalidSource`].
pub fn read_source(d: &StatusDict) -> Result<Option<SourceSetting>> {
    match d.get(keys::SOURCE) {
        None => Ok(None),
        Some(Value::String(s)) if s == NO_SOURCE => Ok(Some(SourceSetting::Unbound)),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(|id| Some(SourceSetting::Node(NodeId(id))))
            .ok_or_else(|| ModulationError::InvalidSource(format!("'{}' is not a node id", n))),
        Some(other) => Err(ModulationError::InvalidSource(format!(
            "'{}' is not a node id",
            other
        ))),
    }
}

/// Status representation of an optional source
pub fn source_value(source: Option<NodeId>) -> Value {
    match source {
        Some(id) => Value::from(id.0),
        None => Value::from(NO_SOURCE),
    }
}
