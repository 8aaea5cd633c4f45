// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Interval update driver
//!
//! Once per modulation interval the driver drains the bound source and recomputes the
//! effective weight of every synapse of the types it drives. Synapses live in
//! disjoint [`SynapsePartition`]s that rayon workers update in parallel, all reading
//! the same shared parameters under one [`UpdatePhase`](crate::params::UpdatePhase)
//! guard per type.
//!
//! Types bound to the same source are driven together: the source is drained once
//! and every type sees the same batch.
//!
//! An interval is all-or-nothing: the ratio inputs of every type are validated before
//! any synapse is touched, and nothing is drained from the source when validation
//! fails.

use std::sync::Arc;

use neuromod_config::DriverConfig;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, warn};

use crate::error::{ModulationError, Result};
use crate::params::{ModulationParams, SharedModulationParameters, UpdatePhase};
use crate::source::NodeId;
use crate::status::NO_SOURCE;
use crate::synapse::{total_events, ModulatedSynapse};

/// Default number of synapses per partition
pub const DEFAULT_PARTITION_SIZE: usize = 1024;

/// Synapses owned by exactly one worker during an update
#[derive(Debug, Clone, Default)]
pub struct SynapsePartition {
    pub synapses: Vec<ModulatedSynapse>,
}

impl SynapsePartition {
    pub fn new(synapses: Vec<ModulatedSynapse>) -> Self {
        Self { synapses }
    }

    pub fn len(&self) -> usize {
        self.synapses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.synapses.is_empty()
    }
}

/// Split `synapses` into partitions of at most `partition_size` (minimum 1)
pub fn partition(synapses: Vec<ModulatedSynapse>, partition_size: usize) -> Vec<SynapsePartition> {
    let size = partition_size.max(1);
    let mut partitions = Vec::with_capacity(synapses.len().div_ceil(size));
    let mut iter = synapses.into_iter().peekable();
    while iter.peek().is_some() {
        partitions.push(SynapsePartition::new(iter.by_ref().take(size).collect()));
    }
    partitions
}

/// Outcome of one interval for one synapse type
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalReport {
    /// 1-based interval counter of this driver
    pub interval: u64,
    pub model: String,
    /// Spike records in the drained batch
    pub batch_records: usize,
    /// Sum of multiplicities in the batch
    pub total_events: f64,
    pub synapses_updated: usize,
}

/// Drives interval updates for the synapse types bound to one source
pub struct UpdateDriver {
    types: Vec<Arc<SharedModulationParameters>>,
    partition_size: usize,
    pool: Option<ThreadPool>,
    intervals_run: u64,
}

impl std::fmt::Debug for UpdateDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateDriver")
            .field("types", &self.types)
            .field("partition_size", &self.partition_size)
            .field("workers", &self.workers())
            .field("intervals_run", &self.intervals_run)
            .finish()
    }
}

impl UpdateDriver {
    /// Driver for one type on rayon's global pool
    pub fn new(params: Arc<SharedModulationParameters>) -> Self {
        Self {
            types: vec![params],
            partition_size: DEFAULT_PARTITION_SIZE,
            pool: None,
            intervals_run: 0,
        }
    }

    /// Driver sized from `[driver]`; `workers = 0` uses rayon's global pool
    pub fn from_config(
        params: Arc<SharedModulationParameters>,
        config: &DriverConfig,
    ) -> Result<Self> {
        let mut driver = Self::new(params);
        driver.partition_size = config.partition_size.max(1);
        if config.workers > 0 {
            let pool = ThreadPoolBuilder::new()
                .num_threads(config.workers)
                .thread_name(|i| format!("neuromod-update-{}", i))
                .build()
                .map_err(|e| ModulationError::invalid_parameter("workers", e.to_string()))?;
            driver.pool = Some(pool);
        }
        Ok(driver)
    }

    /// Drive another type from the same source.
    ///
    /// The types must share a source when an interval runs; [`Self::run_types`]
    /// checks that.
    pub fn add_type(&mut self, params: Arc<SharedModulationParameters>) -> Result<()> {
        if self.types.iter().any(|t| Arc::ptr_eq(t, &params)) {
            return Err(ModulationError::invalid_parameter(
                "types",
                format!("'{}' is already driven", params.model()),
            ));
        }
        self.types.push(params);
        Ok(())
    }

    /// Shared parameters of the first type
    pub fn params(&self) -> &Arc<SharedModulationParameters> {
        &self.types[0]
    }

    /// Every driven type, in the order partitions are passed to [`Self::run_types`]
    pub fn types(&self) -> &[Arc<SharedModulationParameters>] {
        &self.types
    }

    pub fn partition_size(&self) -> usize {
        self.partition_size
    }

    /// Worker threads used for partition updates
    pub fn workers(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }

    pub fn intervals_run(&self) -> u64 {
        self.intervals_run
    }

    /// Split `synapses` using this driver's partition size
    pub fn partition(&self, synapses: Vec<ModulatedSynapse>) -> Vec<SynapsePartition> {
        partition(synapses, self.partition_size)
    }

    /// Close the current interval of a single-type driver.
    ///
    /// # Errors
    ///
    /// - `InvalidParameter` if the driver drives more than one type
    /// - everything [`Self::run_types`] returns
    pub fn run_interval(&mut self, partitions: &mut [SynapsePartition]) -> Result<IntervalReport> {
        if self.types.len() != 1 {
            return Err(ModulationError::invalid_parameter(
                "types",
                format!("driver has {} types; use run_types", self.types.len()),
            ));
        }
        let mut reports = self.run_types(&mut [partitions])?;
        reports.pop().ok_or_else(|| {
            ModulationError::invalid_parameter("types", "interval produced no report")
        })
    }

    /// Close the current interval: drain the shared source once and update every type.
    ///
    /// `groups[i]` holds the synapses of `types()[i]`.
    ///
    /// # Errors
    ///
    /// - `InvalidParameter` if `groups` does not match the driven types
    /// - `Unconfigured` if a type has no bound source
    /// - `DivisionByZero` if `interval_length * saturation` of a type is zero
    /// - `InvalidSource` if the types are bound to different sources
    ///
    /// On error no synapse changes and the source keeps its pending records.
    pub fn run_types(
        &mut self,
        groups: &mut [&mut [SynapsePartition]],
    ) -> Result<Vec<IntervalReport>> {
        if groups.len() != self.types.len() {
            return Err(ModulationError::invalid_parameter(
                "types",
                format!(
                    "{} partition groups for {} types",
                    groups.len(),
                    self.types.len()
                ),
            ));
        }

        let phases: Vec<UpdatePhase<'_>> =
            self.types.iter().map(|t| t.begin_update_phase()).collect();

        for phase in &phases {
            if let Err(e) = phase.modulation_ratio(0.0, 1.0) {
                warn!("interval update for '{}' rejected: {}", phase.model, e);
                return Err(e);
            }
        }
        let source = shared_source(&phases)?;

        let batch = phases[0].drain_batch()?;
        let total = total_events(&batch);
        self.intervals_run += 1;

        let mut reports = Vec::with_capacity(phases.len());
        for (partitions, phase) in groups.iter_mut().zip(&phases) {
            let params: &ModulationParams = phase;
            match &self.pool {
                Some(pool) => pool.install(|| update_partitions(partitions, params, total))?,
                None => update_partitions(partitions, params, total)?,
            }

            let report = IntervalReport {
                interval: self.intervals_run,
                model: params.model.clone(),
                batch_records: batch.len(),
                total_events: total,
                synapses_updated: partitions.iter().map(SynapsePartition::len).sum(),
            };
            debug!(
                "interval {} of '{}' from {}: {} records, {} events, {} synapses in {} partitions",
                report.interval,
                report.model,
                source,
                report.batch_records,
                report.total_events,
                report.synapses_updated,
                partitions.len()
            );
            reports.push(report);
        }
        Ok(reports)
    }
}

/// Source every phase is bound to; phases must already be validated
fn shared_source(phases: &[UpdatePhase<'_>]) -> Result<NodeId> {
    let mut sources = phases.iter().map(|p| (p.model.as_str(), p.snapshot().source));
    let (first_model, first) = match sources.next() {
        Some((model, Some(id))) => (model, id),
        _ => {
            return Err(ModulationError::invalid_parameter(
                "types",
                "driver has no bound type",
            ))
        }
    };
    for (model, source) in sources {
        if source != Some(first) {
            return Err(ModulationError::InvalidSource(format!(
                "'{}' reads {} but '{}' reads {}",
                model,
                source.map_or_else(|| NO_SOURCE.to_string(), |id| id.to_string()),
                first_model,
                first
            )));
        }
    }
    Ok(first)
}

fn update_partitions(
    partitions: &mut [SynapsePartition],
    params: &ModulationParams,
    total: f64,
) -> Result<()> {
    partitions.par_iter_mut().try_for_each(|partition| {
        partition
            .synapses
            .iter_mut()
            .try_for_each(|synapse| synapse.update_from_total(total, params).map(|_| ()))
    })
}
