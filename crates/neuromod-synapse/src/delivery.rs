// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Event delivery seam
//!
//! A synapse only decides *which weight* an outgoing spike carries. Addressing and
//! timing belong to the host, which receives the finished event through [`SpikeSink`].

use serde::{Deserialize, Serialize};

use crate::source::NodeId;

/// Spike stamps a synapse type lets through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StampFilter {
    #[default]
    DeliverAll,
    /// Drop spikes whose stamp is an odd step count
    DropOdd,
}

impl StampFilter {
    #[inline]
    pub fn admits(&self, stamp_steps: u64) -> bool {
        match self {
            StampFilter::DeliverAll => true,
            StampFilter::DropOdd => stamp_steps % 2 == 0,
        }
    }
}

/// Host-side addressing of one connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub receiver: NodeId,
    pub delay_steps: u64,
    pub rport: u32,
}

/// Spike event handed to the delivery collaborator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpikeEvent {
    pub stamp_steps: u64,
    pub weight: f64,
    pub receiver: NodeId,
    pub delay_steps: u64,
    pub rport: u32,
}

/// Delivery collaborator
pub trait SpikeSink {
    fn deliver(&mut self, event: SpikeEvent);
}

impl SpikeSink for Vec<SpikeEvent> {
    fn deliver(&mut self, event: SpikeEvent) {
        self.push(event);
    }
}
