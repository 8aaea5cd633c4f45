// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Modulation functions
//!
//! Pure mappings from the modulation ratio to a weight multiplier. The variant is
//! fixed per synapse type; there is no per-call dispatch beyond one `match`.

use serde::{Deserialize, Serialize};

use crate::delivery::StampFilter;
use crate::error::{ModulationError, Result};

/// Default gain of the saturating variants
pub const DEFAULT_ALPHA: f64 = 1.0;

/// Ratio scale used by the identity variant unless overridden
pub const IDENTITY_SCALE: f64 = 1.0;

/// Ratio scale used by the saturating variants unless overridden
pub const SATURATING_SCALE: f64 = 2.0;

/// How the un-modulated base type treats the ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityConvention {
    /// `f(r) = r`: weight follows the ratio and collapses to zero without activity
    #[default]
    Literal,
    /// `f(r) = 1`: weight stays at baseline regardless of activity
    Unmodulated,
}

/// Weight multiplier as a function of the modulation ratio
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModulationFunction {
    Identity {
        #[serde(default)]
        convention: IdentityConvention,
    },
    /// `1 + alpha * r` (D1-like)
    SaturatingIncrease {
        #[serde(default = "default_alpha")]
        alpha: f64,
    },
    /// `1 - alpha * r` (D2-like)
    SaturatingDecrease {
        #[serde(default = "default_alpha")]
        alpha: f64,
    },
}

fn default_alpha() -> f64 {
    DEFAULT_ALPHA
}

impl Default for ModulationFunction {
    fn default() -> Self {
        ModulationFunction::Identity {
            convention: IdentityConvention::Literal,
        }
    }
}

impl ModulationFunction {
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn saturating_increase(alpha: f64) -> Result<Self> {
        validate_alpha(alpha)?;
        Ok(ModulationFunction::SaturatingIncrease { alpha })
    }

    pub fn saturating_decrease(alpha: f64) -> Result<Self> {
        validate_alpha(alpha)?;
        Ok(ModulationFunction::SaturatingDecrease { alpha })
    }

    /// Evaluate the multiplier for `ratio`
    #[inline]
    pub fn apply(&self, ratio: f64) -> f64 {
        match *self {
            ModulationFunction::Identity {
                convention: IdentityConvention::Literal,
            } => ratio,
            ModulationFunction::Identity {
                convention: IdentityConvention::Unmodulated,
            } => 1.0,
            ModulationFunction::SaturatingIncrease { alpha } => 1.0 + alpha * ratio,
            ModulationFunction::SaturatingDecrease { alpha } => 1.0 - alpha * ratio,
        }
    }

    /// Gain of the saturating variants, `None` for identity
    pub fn alpha(&self) -> Option<f64> {
        match *self {
            ModulationFunction::Identity { .. } => None,
            ModulationFunction::SaturatingIncrease { alpha }
            | ModulationFunction::SaturatingDecrease { alpha } => Some(alpha),
        }
    }

    /// Same variant with a new gain. Identity has no gain and rejects the call.
    pub fn with_alpha(self, alpha: f64) -> Result<Self> {
        validate_alpha(alpha)?;
        match self {
            ModulationFunction::Identity { .. } => Err(ModulationError::invalid_parameter(
                "alpha",
                "the identity modulation has no gain",
            )),
            ModulationFunction::SaturatingIncrease { .. } => {
                Ok(ModulationFunction::SaturatingIncrease { alpha })
            }
            ModulationFunction::SaturatingDecrease { .. } => {
                Ok(ModulationFunction::SaturatingDecrease { alpha })
            }
        }
    }

    /// Default ratio scale of the variant
    pub fn default_scale(&self) -> f64 {
        match self {
            ModulationFunction::Identity { .. } => IDENTITY_SCALE,
            _ => SATURATING_SCALE,
        }
    }
}

fn validate_alpha(alpha: f64) -> Result<()> {
    if !alpha.is_finite() || alpha < 0.0 {
        return Err(ModulationError::invalid_parameter(
            "alpha",
            format!("must be a finite non-negative number, got {}", alpha),
        ));
    }
    Ok(())
}

/// Everything a synapse type fixes for its instances
///
/// Copied into each synapse on construction; changing a type's rule affects only
/// synapses created afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModulationRule {
    pub function: ModulationFunction,
    /// Numerator constant of the ratio: `scale * events / (interval * saturation)`
    pub scale: f64,
    pub stamp_filter: StampFilter,
}

impl ModulationRule {
    /// Rule with the variant's default scale and no stamp filtering
    pub fn new(function: ModulationFunction) -> Self {
        Self {
            function,
            scale: function.default_scale(),
            stamp_filter: StampFilter::default(),
        }
    }

    pub fn with_scale(mut self, scale: f64) -> Result<Self> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(ModulationError::invalid_parameter(
                "scale",
                format!("must be a finite positive number, got {}", scale),
            ));
        }
        self.scale = scale;
        Ok(self)
    }

    pub fn with_stamp_filter(mut self, stamp_filter: StampFilter) -> Self {
        self.stamp_filter = stamp_filter;
        self
    }
}

impl Default for ModulationRule {
    fn default() -> Self {
        Self::new(ModulationFunction::default())
    }
}
