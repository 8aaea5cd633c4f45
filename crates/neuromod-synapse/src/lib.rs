// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Neuromodulated Synapses
//!
//! Synapses whose effective weight follows a population-level modulation signal
//! (dopamine-like volume transmission) instead of per-synapse plasticity:
//! - Volume transmitters collect modulatory spikes and hand them out once per interval
//! - Each synapse type shares one set of parameters (source, saturation)
//! - Every interval the weight is recomputed as `baseline * f(ratio)`
//!
//! ## Architecture
//! - Configuration phase: bind sources, derive types, set parameters
//! - Update phase: partition-parallel weight updates under a shared read guard
//! - Delivery: `send` hands the current effective weight to the host

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod delivery;
pub mod driver;
pub mod error;
pub mod function;
pub mod params;
pub mod registry;
pub mod source;
pub mod status;
pub mod synapse;

// Re-export key types
pub use delivery::{Route, SpikeEvent, SpikeSink, StampFilter};
pub use driver::{partition, IntervalReport, SynapsePartition, UpdateDriver};
pub use error::{ModulationError, Result};
pub use function::{IdentityConvention, ModulationFunction, ModulationRule};
pub use params::{
    ModulationParams, ParamsSnapshot, SharedModulationParameters, UpdatePhase, DEFAULT_SATURATION,
};
pub use registry::{
    SynapseModel, SynapseModelRegistry, D1_SYNAPSE, D2_SYNAPSE, MODULATORY_SYNAPSE,
};
pub use source::{HostNode, ModulationSource, NodeDirectory, NodeId, SpikeCounter, VolumeTransmitter};
pub use status::{SourceSetting, StatusDict};
pub use synapse::{total_events, ModulatedSynapse, DEFAULT_BASELINE_WEIGHT};
