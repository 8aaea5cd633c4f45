// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Neuromodulated synapse
//!
//! The effective weight is recomputed once per modulation interval:
//!
//! ```text
//! ratio  = scale * Σ multiplicity / (interval_length * saturation)
//! weight = baseline_weight * f(ratio)
//! ```
//!
//! Updates are not cumulative. Every update starts again from `baseline_weight`,
//! and nothing clamps the result: a large gain on the decreasing variant can drive
//! the weight negative.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::delivery::{Route, SpikeEvent, SpikeSink};
use crate::error::{ModulationError, Result};
use crate::function::{ModulationFunction, ModulationRule};
use crate::params::ModulationParams;
use crate::source::SpikeCounter;
use crate::status::{keys, read_value, StatusDict};

/// Baseline weight of a freshly created synapse
pub const DEFAULT_BASELINE_WEIGHT: f64 = 1.0;

/// Sum of multiplicities in input order (empty batch sums to +0.0)
#[inline]
pub fn total_events(batch: &[SpikeCounter]) -> f64 {
    batch.iter().fold(0.0, |acc, sc| acc + sc.multiplicity)
}

/// One directed connection whose weight follows a modulation signal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModulatedSynapse {
    baseline_weight: f64,
    effective_weight: f64,
    rule: ModulationRule,
}

impl ModulatedSynapse {
    pub fn new(rule: ModulationRule) -> Self {
        Self::with_baseline_weight(rule, DEFAULT_BASELINE_WEIGHT)
    }

    pub fn with_baseline_weight(rule: ModulationRule, baseline_weight: f64) -> Self {
        Self {
            baseline_weight,
            effective_weight: baseline_weight,
            rule,
        }
    }

    #[inline]
    pub fn baseline_weight(&self) -> f64 {
        self.baseline_weight
    }

    /// Current effective weight
    #[inline]
    pub fn weight(&self) -> f64 {
        self.effective_weight
    }

    pub fn rule(&self) -> &ModulationRule {
        &self.rule
    }

    pub fn function(&self) -> &ModulationFunction {
        &self.rule.function
    }

    /// Takes effect at the next `trigger_update`
    pub fn set_baseline_weight(&mut self, weight: f64) {
        self.baseline_weight = weight;
    }

    /// Recompute the effective weight from one interval's batch of modulatory spikes.
    ///
    /// Returns the new effective weight. On error the previous weight is kept.
    ///
    /// # Errors
    ///
    /// - `Unconfigured` if no modulation source is bound to `params`
    /// - `DivisionByZero` if `interval_length * saturation` is zero
    pub fn trigger_update(
        &mut self,
        batch: &[SpikeCounter],
        params: &ModulationParams,
    ) -> Result<f64> {
        self.update_from_total(total_events(batch), params)
    }

    /// Update step shared with the interval driver, which sums each batch only once
    #[inline]
    pub(crate) fn update_from_total(
        &mut self,
        total_events: f64,
        params: &ModulationParams,
    ) -> Result<f64> {
        let ratio = params.modulation_ratio(total_events, self.rule.scale)?;
        self.effective_weight = self.baseline_weight * self.rule.function.apply(ratio);
        Ok(self.effective_weight)
    }

    /// Hand a spike stamped `stamp_steps` to `sink` carrying the current effective weight.
    ///
    /// Returns the weight delivered, or `None` if the type's stamp filter dropped the spike.
    pub fn send<S: SpikeSink + ?Sized>(
        &self,
        stamp_steps: u64,
        route: &Route,
        sink: &mut S,
    ) -> Option<f64> {
        if !self.rule.stamp_filter.admits(stamp_steps) {
            return None;
        }
        sink.deliver(SpikeEvent {
            stamp_steps,
            weight: self.effective_weight,
            receiver: route.receiver,
            delay_steps: route.delay_steps,
            rport: route.rport,
        });
        Some(self.effective_weight)
    }

    pub fn get_status(&self) -> StatusDict {
        let mut d = StatusDict::new();
        d.insert(keys::BASELINE_WEIGHT.into(), json!(self.baseline_weight));
        d.insert(keys::WEIGHT.into(), json!(self.effective_weight));
        if let Some(alpha) = self.rule.function.alpha() {
            d.insert(keys::ALPHA.into(), json!(alpha));
        }
        d.insert(keys::SIZE_OF.into(), json!(std::mem::size_of::<Self>()));
        d
    }

    /// Apply `baseline_weight` from a status dictionary.
    ///
    /// `weight` and `alpha` are derived or type-level; they are accepted only when they
    /// match the current values, so a dictionary from `get_status` can be written back.
    pub fn set_status(&mut self, d: &StatusDict) -> Result<()> {
        let baseline = read_value::<f64>(d, keys::BASELINE_WEIGHT)?;

        if let Some(weight) = read_value::<f64>(d, keys::WEIGHT)? {
            if weight != self.effective_weight {
                return Err(ModulationError::invalid_parameter(
                    keys::WEIGHT,
                    "the effective weight is derived; set baseline_weight instead",
                ));
            }
        }
        if let Some(alpha) = read_value::<f64>(d, keys::ALPHA)? {
            if self.rule.function.alpha() != Some(alpha) {
                return Err(ModulationError::invalid_parameter(
                    keys::ALPHA,
                    "alpha is fixed by the synapse type",
                ));
            }
        }

        if let Some(baseline) = baseline {
            self.set_baseline_weight(baseline);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::StampFilter;
    use crate::function::IdentityConvention;
    use crate::source::{NodeId, VolumeTransmitter};
    use std::sync::Arc;

    fn params(interval: u64, saturation: f64) -> ModulationParams {
        let vt = Arc::new(VolumeTransmitter::new(NodeId(1), interval).unwrap());
        ModulationParams::new("test_synapse").with_source(vt, saturation)
    }

    fn batch_of(total: f64) -> Vec<SpikeCounter> {
        vec![SpikeCounter::new(1, total / 2.0), SpikeCounter::new(2, total / 2.0)]
    }

    fn increase(alpha: f64) -> ModulationRule {
        ModulationRule::new(ModulationFunction::saturating_increase(alpha).unwrap())
    }

    fn decrease(alpha: f64) -> ModulationRule {
        ModulationRule::new(ModulationFunction::saturating_decrease(alpha).unwrap())
    }

    #[test]
    fn test_new_synapse_weight_is_baseline() {
        let synapse = ModulatedSynapse::with_baseline_weight(increase(1.0), 2.5);
        assert_eq!(synapse.weight(), 2.5);
        assert_eq!(synapse.baseline_weight(), 2.5);
    }

    #[test]
    fn test_increase_doubles_at_unit_ratio() {
        let mut synapse = ModulatedSynapse::with_baseline_weight(increase(1.0), 2.0);
        let weight = synapse.trigger_update(&batch_of(50.0), &params(100, 1.0)).unwrap();
        assert_eq!(weight, 4.0);
        assert_eq!(synapse.weight(), 4.0);
    }

    #[test]
    fn test_decrease_reaches_zero_at_unit_ratio() {
        let mut synapse = ModulatedSynapse::with_baseline_weight(decrease(1.0), 2.0);
        synapse.trigger_update(&batch_of(50.0), &params(100, 1.0)).unwrap();
        assert_eq!(synapse.weight(), 0.0);
    }

    #[test]
    fn test_empty_batch_keeps_baseline_for_saturating_forms() {
        for rule in [increase(3.0), decrease(3.0)] {
            let mut synapse = ModulatedSynapse::with_baseline_weight(rule, 2.0);
            synapse.trigger_update(&[], &params(100, 1.0)).unwrap();
            assert_eq!(synapse.weight(), 2.0);
        }
    }

    #[test]
    fn test_identity_conventions_on_empty_batch() {
        let mut literal = ModulatedSynapse::with_baseline_weight(ModulationRule::default(), 2.0);
        literal.trigger_update(&[], &params(100, 1.0)).unwrap();
        assert_eq!(literal.weight(), 0.0);

        let unmodulated = ModulationRule::new(ModulationFunction::Identity {
            convention: IdentityConvention::Unmodulated,
        });
        let mut synapse = ModulatedSynapse::with_baseline_weight(unmodulated, 2.0);
        synapse.trigger_update(&batch_of(80.0), &params(100, 1.0)).unwrap();
        assert_eq!(synapse.weight(), 2.0);
    }

    #[test]
    fn test_identity_tracks_ratio() {
        let mut synapse = ModulatedSynapse::with_baseline_weight(ModulationRule::default(), 3.0);
        // scale 1.0: ratio = 30 / (100 * 0.5) = 0.6
        synapse.trigger_update(&batch_of(30.0), &params(100, 0.5)).unwrap();
        assert!((synapse.weight() - 1.8).abs() < 1e-12);
    }

    #[test]
    fn test_empty_batch_sums_to_positive_zero() {
        let total = total_events(&[]);
        assert_eq!(total, 0.0);
        assert!(total.is_sign_positive());

        let mut literal = ModulatedSynapse::with_baseline_weight(ModulationRule::default(), 2.0);
        literal.trigger_update(&[], &params(100, 1.0)).unwrap();
        assert!(literal.weight().is_sign_positive());
        assert_eq!(literal.get_status()["weight"].to_string(), "0.0");
    }

    #[test]
    fn test_updates_are_not_cumulative() {
        let mut synapse = ModulatedSynapse::with_baseline_weight(increase(1.0), 1.0);
        let p = params(100, 1.0);
        let first = synapse.trigger_update(&batch_of(25.0), &p).unwrap();
        let second = synapse.trigger_update(&batch_of(25.0), &p).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, 1.5);
    }

    #[test]
    fn test_unconfigured_update_keeps_weight() {
        let mut synapse = ModulatedSynapse::with_baseline_weight(increase(1.0), 2.0);
        synapse.trigger_update(&batch_of(50.0), &params(100, 1.0)).unwrap();

        let result = synapse.trigger_update(&batch_of(10.0), &ModulationParams::new("d1_synapse"));
        assert!(matches!(result, Err(ModulationError::Unconfigured { .. })));
        assert_eq!(synapse.weight(), 4.0);
    }

    #[test]
    fn test_zero_saturation_keeps_weight() {
        let mut synapse = ModulatedSynapse::with_baseline_weight(increase(1.0), 2.0);
        let result = synapse.trigger_update(&batch_of(50.0), &params(100, 0.0));
        assert!(matches!(result, Err(ModulationError::DivisionByZero { .. })));
        assert_eq!(synapse.weight(), 2.0);
    }

    #[test]
    fn test_baseline_change_waits_for_update() {
        let mut synapse = ModulatedSynapse::with_baseline_weight(increase(1.0), 2.0);
        synapse.set_baseline_weight(5.0);
        assert_eq!(synapse.weight(), 2.0);
        synapse.trigger_update(&[], &params(100, 1.0)).unwrap();
        assert_eq!(synapse.weight(), 5.0);
    }

    #[test]
    fn test_send_uses_effective_weight() {
        let mut synapse = ModulatedSynapse::with_baseline_weight(increase(1.0), 2.0);
        synapse.trigger_update(&batch_of(50.0), &params(100, 1.0)).unwrap();

        let route = Route {
            receiver: NodeId(9),
            delay_steps: 3,
            rport: 0,
        };
        let mut sink: Vec<SpikeEvent> = Vec::new();
        assert_eq!(synapse.send(7, &route, &mut sink), Some(4.0));
        assert_eq!(sink.len(), 1);
        assert_eq!(sink[0].weight, 4.0);
        assert_eq!(sink[0].receiver, NodeId(9));
        assert_eq!(synapse.weight(), 4.0);
    }

    #[test]
    fn test_send_drops_odd_stamps_when_filtered() {
        let rule = increase(1.0).with_stamp_filter(StampFilter::DropOdd);
        let synapse = ModulatedSynapse::new(rule);
        let route = Route {
            receiver: NodeId(9),
            delay_steps: 1,
            rport: 0,
        };
        let mut sink: Vec<SpikeEvent> = Vec::new();
        assert_eq!(synapse.send(3, &route, &mut sink), None);
        assert_eq!(synapse.send(4, &route, &mut sink), Some(1.0));
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_status_round_trip() {
        let mut synapse = ModulatedSynapse::with_baseline_weight(increase(3.0), 2.0);
        let status = synapse.get_status();
        assert_eq!(status["alpha"], json!(3.0));
        assert_eq!(status["weight"], json!(2.0));
        assert!(status.contains_key("size_of"));

        synapse.set_status(&status).unwrap();

        let mut d = StatusDict::new();
        d.insert("baseline_weight".into(), json!(0.5));
        synapse.set_status(&d).unwrap();
        assert_eq!(synapse.baseline_weight(), 0.5);
        assert_eq!(synapse.weight(), 2.0);
    }

    #[test]
    fn test_status_rejects_derived_values() {
        let mut synapse = ModulatedSynapse::with_baseline_weight(increase(3.0), 2.0);

        let d = json!({"baseline_weight": 7.0, "weight": 9.0});
        assert!(synapse.set_status(d.as_object().unwrap()).is_err());
        assert_eq!(synapse.baseline_weight(), 2.0);

        let d = json!({"alpha": 1.0});
        assert!(synapse.set_status(d.as_object().unwrap()).is_err());
    }

    #[test]
    fn test_identity_status_has_no_alpha() {
        let synapse = ModulatedSynapse::new(ModulationRule::default());
        assert!(!synapse.get_status().contains_key("alpha"));
    }
}
