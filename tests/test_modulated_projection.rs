// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! End-to-end tests: configuration file -> synapse types -> interval updates

use std::fs;
use std::sync::Arc;

use neuromod::prelude::*;
use tempfile::tempdir;

const CONFIG: &str = r#"
[modulation]
stamp_filter = "drop_odd"

[driver]
workers = 2
partition_size = 7

[[synapse_models]]
name = "exitmod_synapse"
base = "d1_synapse"
alpha = 3.0
max_modulation = 10.0
source = 1

[[synapse_models]]
name = "inhmod_synapse"
base = "d2_synapse"
alpha = 0.5
max_modulation = 10.0
source = 1
baseline_weight = 2.0
"#;

fn weights(partitions: &[SynapsePartition]) -> Vec<f64> {
    partitions
        .iter()
        .flat_map(|p| p.synapses.iter().map(|s| s.weight()))
        .collect()
}

#[test]
fn test_projection_from_config_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("neuromod_configuration.toml");
    fs::write(&path, CONFIG).unwrap();
    let config = load_config(Some(path.as_path()), None).unwrap();

    let vt = Arc::new(VolumeTransmitter::new(NodeId(1), 300).unwrap());
    let mut directory = NodeDirectory::new();
    directory.insert(vt.clone());

    let registry = SynapseModelRegistry::from_config(&config, &directory).unwrap();
    assert_eq!(
        registry.model_names(),
        vec![
            "d1_synapse",
            "d2_synapse",
            "exitmod_synapse",
            "inhmod_synapse",
            "modulatory_synapse"
        ]
    );

    let excite = registry.get("exitmod_synapse").unwrap();
    let inhibit = registry.get("inhmod_synapse").unwrap();
    let mut driver = UpdateDriver::from_config(excite.params().clone(), &config.driver).unwrap();
    driver.add_type(inhibit.params().clone()).unwrap();
    let mut excite_parts = driver.partition(vec![excite.create_synapse(); 20]);
    let mut inhibit_parts = driver.partition(vec![inhibit.create_synapse(); 20]);
    assert_eq!(excite_parts.len(), 3);

    // 750 events: ratio = 2 * 750 / (300 * 10) = 0.5
    for t in 0..150 {
        vt.handle_spike(t * 2, 5.0).unwrap();
    }
    // both types share the transmitter and see the same batch
    let reports = driver
        .run_types(&mut [excite_parts.as_mut_slice(), inhibit_parts.as_mut_slice()])
        .unwrap();
    assert_eq!(reports[0].total_events, 750.0);
    assert_eq!(reports[1].total_events, 750.0);
    assert_eq!(weights(&excite_parts), vec![2.5; 20]);
    // 2 * (1 - 0.5 * 0.5)
    assert_eq!(weights(&inhibit_parts), vec![1.5; 20]);
    assert_eq!(vt.pending_records(), 0);

    // drop_odd applies to every type built from this config
    let route = Route {
        receiver: NodeId(50),
        delay_steps: 1,
        rport: 0,
    };
    let mut sink: Vec<SpikeEvent> = Vec::new();
    let synapse = &excite_parts[0].synapses[0];
    assert_eq!(synapse.send(301, &route, &mut sink), None);
    assert_eq!(synapse.send(302, &route, &mut sink), Some(2.5));
    assert_eq!(sink.len(), 1);
}

#[test]
fn test_config_with_missing_source_fails() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("neuromod_configuration.toml");
    fs::write(&path, CONFIG).unwrap();
    let config = load_config(Some(path.as_path()), None).unwrap();

    // transmitter 1 was never created
    let result = SynapseModelRegistry::from_config(&config, &NodeDirectory::new());
    assert!(matches!(result, Err(ModulationError::InvalidSource(_))));
}

#[test]
fn test_identity_conventions_end_to_end() {
    for (convention, expected) in [
        (IdentityConvention::Literal, 0.0),
        (IdentityConvention::Unmodulated, 3.0),
    ] {
        let vt = Arc::new(VolumeTransmitter::new(NodeId(1), 100).unwrap());
        let params = Arc::new(SharedModulationParameters::new(MODULATORY_SYNAPSE));
        params.configure(vt, 1.0).unwrap();

        let rule = ModulationRule::new(ModulationFunction::Identity { convention });
        let mut parts = vec![SynapsePartition::new(vec![
            ModulatedSynapse::with_baseline_weight(rule, 3.0),
        ])];
        UpdateDriver::new(params).run_interval(&mut parts).unwrap();
        assert_eq!(weights(&parts), vec![expected]);
    }
}
