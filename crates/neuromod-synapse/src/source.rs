// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Modulation sources and host node lookup
//!
//! The engine only ever sees a volume transmitter through [`ModulationSource`]:
//! an interval length and a once-per-interval batch of spike counters. Everything
//! else about the host node (identity, model, wiring) stays on the host side and is
//! reached through [`HostNode`] and [`NodeDirectory`].

use core::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::error::{ModulationError, Result};
use crate::status::{read_value, StatusDict};

/// Host node ID (globally unique across the simulated network)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

/// One record of modulatory activity: a spike time and how many spikes it carries
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpikeCounter {
    /// Simulation step at which the spikes arrived
    pub spike_time: u64,
    /// Number of spikes (may be fractional for weighted events)
    pub multiplicity: f64,
}

impl SpikeCounter {
    pub fn new(spike_time: u64, multiplicity: f64) -> Self {
        Self {
            spike_time,
            multiplicity,
        }
    }
}

/// Contract of a broadcast modulation emitter
pub trait ModulationSource: Send + Sync {
    /// Stable identity used in status dictionaries
    fn source_id(&self) -> NodeId;

    /// Length of one delivery interval in simulation steps
    fn interval_length(&self) -> u64;

    /// Remove and return the spike counters accumulated during the interval just completed.
    ///
    /// Called by the host scheduler once per interval, never by a synapse.
    fn drain_interval_batch(&self) -> Vec<SpikeCounter>;

    /// Notification that a synapse type now depends on this source's interval length
    fn bind(&self) {}
}

/// A node living in the host network
pub trait HostNode: Send + Sync {
    fn node_id(&self) -> NodeId;

    /// Model name of the node, used in diagnostics
    fn model_name(&self) -> &str;

    /// The modulation source facet of this node, if it has one
    fn as_modulation_source(self: Arc<Self>) -> Option<Arc<dyn ModulationSource>> {
        None
    }
}

/// Reference volume transmitter
///
/// Collects spikes from its presynaptic population and hands them out as one batch
/// per delivery interval. The interval can be changed until the first synapse type
/// binds to the transmitter.
pub struct VolumeTransmitter {
    id: NodeId,
    deliver_interval: AtomicU64,
    bound: AtomicBool,
    pending: Mutex<Vec<SpikeCounter>>,
}

impl VolumeTransmitter {
    pub const MODEL_NAME: &'static str = "volume_transmitter";

    pub fn new(id: NodeId, deliver_interval: u64) -> Result<Self> {
        if deliver_interval == 0 {
            return Err(ModulationError::invalid_parameter(
                "deliver_interval",
                "must be a positive number of steps",
            ));
        }
        Ok(Self {
            id,
            deliver_interval: AtomicU64::new(deliver_interval),
            bound: AtomicBool::new(false),
            pending: Mutex::new(Vec::new()),
        })
    }

    /// Record `multiplicity` modulatory spikes arriving at `spike_time`
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if `multiplicity` is negative or not finite
    pub fn handle_spike(&self, spike_time: u64, multiplicity: f64) -> Result<()> {
        if !multiplicity.is_finite() || multiplicity < 0.0 {
            return Err(ModulationError::invalid_parameter(
                "multiplicity",
                format!("must be a finite non-negative count, got {}", multiplicity),
            ));
        }
        self.pending
            .lock()
            .push(SpikeCounter::new(spike_time, multiplicity));
        Ok(())
    }

    /// Number of spike records waiting for the next drain
    pub fn pending_records(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_bound(&self) -> bool {
        self.bound.load(Ordering::Acquire)
    }

    pub fn set_deliver_interval(&self, steps: u64) -> Result<()> {
        if self.is_bound() {
            return Err(ModulationError::IntervalFrozen(self.id));
        }
        if steps == 0 {
            return Err(ModulationError::invalid_parameter(
                "deliver_interval",
                "must be a positive number of steps",
            ));
        }
        self.deliver_interval.store(steps, Ordering::Release);
        Ok(())
    }

    pub fn get_status(&self) -> StatusDict {
        let mut d = StatusDict::new();
        d.insert("global_id".into(), json!(self.id.0));
        d.insert("model".into(), json!(Self::MODEL_NAME));
        d.insert("deliver_interval".into(), json!(self.interval_length()));
        d.insert("pending_records".into(), json!(self.pending_records()));
        d
    }

    pub fn set_status(&self, d: &StatusDict) -> Result<()> {
        if let Some(steps) = read_value::<u64>(d, "deliver_interval")? {
            self.set_deliver_interval(steps)?;
        }
        Ok(())
    }
}

impl ModulationSource for VolumeTransmitter {
    fn source_id(&self) -> NodeId {
        self.id
    }

    fn interval_length(&self) -> u64 {
        self.deliver_interval.load(Ordering::Acquire)
    }

    fn drain_interval_batch(&self) -> Vec<SpikeCounter> {
        let batch = std::mem::take(&mut *self.pending.lock());
        debug!(
            "volume transmitter {} drained {} spike records",
            self.id,
            batch.len()
        );
        batch
    }

    fn bind(&self) {
        self.bound.store(true, Ordering::Release);
    }
}

impl HostNode for VolumeTransmitter {
    fn node_id(&self) -> NodeId {
        self.id
    }

    fn model_name(&self) -> &str {
        Self::MODEL_NAME
    }

    fn as_modulation_source(self: Arc<Self>) -> Option<Arc<dyn ModulationSource>> {
        Some(self as Arc<dyn ModulationSource>)
    }
}

/// Lookup table from node ids to host nodes
#[derive(Default)]
pub struct NodeDirectory {
    nodes: AHashMap<NodeId, Arc<dyn HostNode>>,
}

impl NodeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node, replacing any node previously stored under the same id
    pub fn insert(&mut self, node: Arc<dyn HostNode>) {
        self.nodes.insert(node.node_id(), node);
    }

    pub fn get(&self, id: NodeId) -> Option<Arc<dyn HostNode>> {
        self.nodes.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Resolve `id` to a modulation source.
    ///
    /// Fails with [`ModulationError::InvalidSource`] when the id is unknown or the node
    /// is not a modulation source.
    pub fn resolve_source(&self, id: NodeId) -> Result<Arc<dyn ModulationSource>> {
        let node = self
            .get(id)
            .ok_or_else(|| ModulationError::InvalidSource(format!("{} does not exist", id)))?;
        let model = node.model_name().to_string();
        node.as_modulation_source().ok_or_else(|| {
            ModulationError::InvalidSource(format!("{} is a '{}' node", id, model))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Neuron(NodeId);

    impl HostNode for Neuron {
        fn node_id(&self) -> NodeId {
            self.0
        }

        fn model_name(&self) -> &str {
            "iaf_psc_exp"
        }
    }

    #[test]
    fn test_drain_empties_pending_records() {
        let vt = VolumeTransmitter::new(NodeId(1), 100).unwrap();
        vt.handle_spike(3, 1.0).unwrap();
        vt.handle_spike(7, 2.0).unwrap();

        let batch = vt.drain_interval_batch();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[1], SpikeCounter::new(7, 2.0));
        assert!(vt.drain_interval_batch().is_empty());
    }

    #[test]
    fn test_invalid_multiplicity_is_not_recorded() {
        let vt = VolumeTransmitter::new(NodeId(1), 100).unwrap();
        for multiplicity in [-1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                vt.handle_spike(3, multiplicity),
                Err(ModulationError::InvalidParameter { .. })
            ));
        }
        assert_eq!(vt.pending_records(), 0);

        vt.handle_spike(4, 0.0).unwrap();
        vt.handle_spike(5, 0.5).unwrap();
        assert_eq!(vt.pending_records(), 2);
    }

    #[test]
    fn test_interval_frozen_after_bind() {
        let vt = VolumeTransmitter::new(NodeId(1), 100).unwrap();
        vt.set_deliver_interval(300).unwrap();
        vt.bind();

        assert_eq!(
            vt.set_deliver_interval(10),
            Err(ModulationError::IntervalFrozen(NodeId(1)))
        );
        assert_eq!(vt.interval_length(), 300);
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert!(VolumeTransmitter::new(NodeId(1), 0).is_err());
    }

    #[test]
    fn test_status_round_trip() {
        let vt = VolumeTransmitter::new(NodeId(4), 10).unwrap();
        let mut d = StatusDict::new();
        d.insert("deliver_interval".into(), json!(300));
        vt.set_status(&d).unwrap();

        let status = vt.get_status();
        assert_eq!(status["deliver_interval"], json!(300));
        assert_eq!(status["model"], json!("volume_transmitter"));
    }

    #[test]
    fn test_resolve_source() {
        let mut directory = NodeDirectory::new();
        directory.insert(Arc::new(VolumeTransmitter::new(NodeId(1), 10).unwrap()));
        directory.insert(Arc::new(Neuron(NodeId(2))));

        assert_eq!(directory.resolve_source(NodeId(1)).unwrap().source_id(), NodeId(1));
        assert!(matches!(
            directory.resolve_source(NodeId(2)),
            Err(ModulationError::InvalidSource(_))
        ));
        assert!(matches!(
            directory.resolve_source(NodeId(9)),
            Err(ModulationError::InvalidSource(_))
        ));
    }
}
