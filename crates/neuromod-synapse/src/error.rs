// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for neuromodulated synapse operations

use crate::source::NodeId;

/// Errors raised by the modulation engine, the model registry and the status surface.
///
/// Every variant is recoverable by the caller. Operations that return one of these
/// leave synapse and parameter state exactly as it was before the call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModulationError {
    /// Update attempted before a modulation source was bound to the synapse type
    #[error("No volume transmitter has been assigned to synapse type '{model}'")]
    Unconfigured { model: String },

    /// The referenced host node does not implement the modulation source contract
    #[error("Modulatory source must be a volume transmitter: {0}")]
    InvalidSource(String),

    /// A parameter value is outside its valid range
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// `interval_length * saturation` evaluated to zero
    #[error("Modulation ratio undefined: interval length {interval_length} x saturation {saturation} is zero")]
    DivisionByZero {
        interval_length: u64,
        saturation: f64,
    },

    /// `configure` was called while an update phase holds the parameters
    #[error("Cannot configure synapse type '{model}' while an update phase is active")]
    ConfigureDuringUpdate { model: String },

    /// The source's interval length cannot change once a synapse type is bound to it
    #[error("Interval length of volume transmitter {0} is fixed after binding")]
    IntervalFrozen(NodeId),

    /// No synapse model registered under this name
    #[error("Unknown synapse model: {0}")]
    UnknownModel(String),

    /// A synapse model with this name already exists
    #[error("Synapse model already registered: {0}")]
    DuplicateModel(String),
}

impl ModulationError {
    pub(crate) fn invalid_parameter(name: &str, reason: impl Into<String>) -> Self {
        ModulationError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for modulation operations
pub type Result<T> = core::result::Result<T, ModulationError>;
