// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Modulated connection demo.
//!
//! Wires a 50 x 50 sparse `exitmod_synapse` projection (derived from `d1_synapse`,
//! alpha 3, max_modulation 10) to a volume transmitter with a 300-step delivery
//! interval, feeds it a deterministic modulatory spike train and prints the effective
//! weight after each interval.
//!
//! Usage: modulation_demo [--config <path>] [--intervals <n>] [--debug-<crate>|--debug-all]

use std::env;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use neuromod::config::{load_config, NeuromodConfig, SynapseModelConfig};
use neuromod::observability::{debug_flags_help, init_logging, parse_debug_flags, LoggingConfig};
use neuromod::synapse::{
    NodeDirectory, NodeId, Route, SpikeEvent, SynapseModelRegistry, UpdateDriver,
    VolumeTransmitter, D1_SYNAPSE,
};
use tracing::info;

const NEURONS_PRE_N: usize = 50;
const NEURONS_POST_N: usize = 50;
const NEURONS_MOD_N: u64 = 10;
const DELIVER_INTERVAL: u64 = 300;
const VOLUME_TRANSMITTER_ID: u64 = 1;
const MODEL_NAME: &str = "exitmod_synapse";

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: modulation_demo [--config <path>] [--intervals <n>]\n\n{}",
        debug_flags_help()
    );
    process::exit(2);
}

fn parse_args() -> (Option<PathBuf>, u64) {
    let mut config_path = None;
    let mut intervals = 5;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let v = args.next().unwrap_or_else(|| usage_and_exit());
                config_path = Some(PathBuf::from(v));
            }
            "--intervals" => {
                let v = args.next().unwrap_or_else(|| usage_and_exit());
                intervals = v.parse().unwrap_or_else(|_| usage_and_exit());
            }
            "-h" | "--help" => usage_and_exit(),
            other if other.starts_with("--debug-") => {}
            other => {
                eprintln!("Unknown argument: {other}");
                usage_and_exit();
            }
        }
    }

    (config_path, intervals)
}

/// Built-in setup used when no configuration file is given
fn default_config() -> NeuromodConfig {
    let mut config = NeuromodConfig::default();
    config.synapse_models.push(SynapseModelConfig {
        name: MODEL_NAME.to_string(),
        base: D1_SYNAPSE.to_string(),
        alpha: Some(3.0),
        max_modulation: Some(NEURONS_MOD_N as f64),
        source: Some(VOLUME_TRANSMITTER_ID),
        ..Default::default()
    });
    config
}

/// Roughly 10% of the pre/post pairs are connected, always the same ones
fn connected(pre: usize, post: usize) -> bool {
    (pre * 7 + post * 3) % 10 == 0
}

fn main() -> Result<()> {
    let (config_path, intervals) = parse_args();

    let config = match &config_path {
        Some(path) => load_config(Some(path.as_path()), None)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => default_config(),
    };

    let _guard = init_logging(
        &parse_debug_flags(),
        &LoggingConfig::console(config.system.log_level.clone()),
    )?;

    let vt = Arc::new(VolumeTransmitter::new(
        NodeId(VOLUME_TRANSMITTER_ID),
        DELIVER_INTERVAL,
    )?);
    let mut directory = NodeDirectory::new();
    directory.insert(vt.clone());

    let registry = SynapseModelRegistry::from_config(&config, &directory)
        .context("Failed to register synapse types")?;
    info!("synapse types: {}", registry.model_names().join(", "));

    let model = registry
        .get(MODEL_NAME)
        .with_context(|| format!("Configuration does not define '{}'", MODEL_NAME))?;

    let mut routes = Vec::new();
    let mut synapses = Vec::new();
    for post in 0..NEURONS_POST_N {
        for pre in 0..NEURONS_PRE_N {
            if connected(pre, post) {
                routes.push(Route {
                    receiver: NodeId((1000 + post) as u64),
                    delay_steps: 1,
                    rport: 0,
                });
                synapses.push(model.create_synapse());
            }
        }
    }
    info!("{} of {} connections exist", synapses.len(), NEURONS_PRE_N * NEURONS_POST_N);

    let mut driver = UpdateDriver::from_config(model.params().clone(), &config.driver)?;
    let mut partitions = driver.partition(synapses);
    let mut sink: Vec<SpikeEvent> = Vec::new();

    for interval in 0..intervals {
        let start = interval * DELIVER_INTERVAL;
        // activity ramps up over the first intervals, then falls silent
        let rate = match interval {
            0..=3 => interval + 1,
            _ => 0,
        };
        for step in (start..start + DELIVER_INTERVAL).step_by(10) {
            vt.handle_spike(step, (rate * NEURONS_MOD_N) as f64 / 4.0)?;
        }

        let report = driver.run_interval(&mut partitions)?;

        sink.clear();
        let stamp = start + DELIVER_INTERVAL;
        for (synapse, route) in partitions.iter().flat_map(|p| &p.synapses).zip(&routes) {
            synapse.send(stamp, route, &mut sink);
        }
        let weight = sink.first().map(|e| e.weight).unwrap_or_default();

        println!(
            "interval {:>2}: {:>6.1} modulatory events -> weight {:.3} ({} spikes delivered)",
            report.interval,
            report.total_events,
            weight,
            sink.len()
        );
    }

    Ok(())
}
