// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # neuromod - Neuromodulated Synapses
//!
//! Synapses whose weight is scaled, once per modulation interval, by the activity of a
//! volume transmitter: a dopamine-like signal shared by every synapse of a type.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use neuromod::prelude::*;
//!
//! let vt = Arc::new(VolumeTransmitter::new(NodeId(1), 100)?);
//! let mut directory = NodeDirectory::new();
//! directory.insert(vt.clone());
//!
//! let mut registry = SynapseModelRegistry::with_builtin_models();
//! let status = serde_json::json!({"source": 1, "alpha": 3.0, "max_modulation": 10.0});
//! registry.copy_model(D1_SYNAPSE, "exitmod_synapse", status.as_object().unwrap(), &directory)?;
//!
//! let model = registry.get("exitmod_synapse")?;
//! let mut driver = UpdateDriver::new(model.params().clone());
//! let mut partitions = driver.partition(vec![model.create_synapse(); 16]);
//!
//! for t in 0..100 {
//!     vt.handle_spike(t, 5.0)?;
//! }
//! driver.run_interval(&mut partitions)?;
//!
//! // ratio = 2 * 500 / (100 * 10) = 1, weight = 1 * (1 + 3 * 1)
//! assert_eq!(partitions[0].synapses[0].weight(), 4.0);
//! # Ok::<(), ModulationError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Foundation: neuromod-config                            │
//! │  (TOML + env + CLI configuration)                       │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Algorithms: neuromod-synapse                           │
//! │  (volume transmitter, shared parameters, update driver) │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## License
//!
//! Apache-2.0

// Re-export foundation
pub use neuromod_config as config;

// Re-export infrastructure
pub use neuromod_observability as observability;

// Re-export algorithms
pub use neuromod_synapse as synapse;

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::synapse::{
        HostNode, IdentityConvention, ModulatedSynapse, ModulationError, ModulationFunction,
        ModulationRule, ModulationSource, NodeDirectory, NodeId, Route, SharedModulationParameters,
        SpikeCounter, SpikeEvent, SpikeSink, StampFilter, StatusDict, SynapseModelRegistry,
        SynapsePartition, UpdateDriver, VolumeTransmitter, D1_SYNAPSE, D2_SYNAPSE,
        MODULATORY_SYNAPSE,
    };

    pub use crate::config::{load_config, NeuromodConfig};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_prelude_builtin_models() {
        let registry = SynapseModelRegistry::with_builtin_models();
        for name in [MODULATORY_SYNAPSE, D1_SYNAPSE, D2_SYNAPSE] {
            assert!(registry.create_synapse(name).is_ok());
        }
    }

    #[test]
    fn test_versions() {
        assert_eq!(crate::synapse::VERSION, crate::config::VERSION);
        assert_eq!(crate::observability::VERSION, crate::config::VERSION);
    }
}
