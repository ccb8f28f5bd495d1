/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Top-level simulation driver.
//!
//! [`Simulator`] builds one [`QueueingSystem`] per
//! `policy × bandwidth × qos_ratio` combination over a shared conflict model,
//! feeds all of them the same traffic every tick, and enforces the per-tick
//! protocol `arrive → depart → clock_tick → update_stability_counter`.
//!
//! All randomness (traffic, deficit arrivals, random tie-breaks) is drawn from
//! one [`StdRng`] seeded with `rng_seed`, always in the same order, so a run is
//! reproducible end to end.
//!
//! # Output files
//! | File | Content |
//! |---|---|
//! | `config.yaml` | effective configuration and generated matrix |
//! | `deficits_<policy>_b<bandwidth>_q<ratio>.txt` | per-tick deficit vectors (`save_deficits`) |
//! | `stability.txt` | `policy bandwidth qos_ratio stability_ratio` |
//! | `throughput.txt` | `policy bandwidth qos_ratio arrivals throughput expired` (`output_throughput`) |

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::config::SimConfig;
use crate::conflict::ConflictModel;
use crate::error::QueueingError;
use crate::names::Policy;
use crate::queueing::{QueueingConfig, QueueingSystem};
use crate::scheduler::ScheduleCache;
use crate::traffic::TrafficGenerator;

/// One queueing system and the lookahead cache it is driven with.
#[derive(Debug)]
struct SystemSlot {
    system: QueueingSystem,
    cache: ScheduleCache,
    qos_ratio: f64,
}

/// End-of-run metrics of one queueing system.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub policy: Policy,
    pub bandwidth: usize,
    pub qos_ratio: f64,
    pub stability_ratio: f64,
    pub arrivals: u64,
    pub throughput: u64,
    pub expired: u64,
}

/// Owns the configuration, every queueing system and the shared PRNG.
#[derive(Debug)]
pub struct Simulator {
    config: SimConfig,
    conflict_model: ConflictModel,
    traffic: TrafficGenerator,
    systems: Vec<SystemSlot>,
    rng: StdRng,
    output_dir: PathBuf,
    system_clock: i64,
}

impl Simulator {
    /// Build the conflict model, the traffic generator and every queueing
    /// system.
    ///
    /// # Errors
    /// Any [`QueueingError`] raised while building those parts, e.g. a scaled
    /// QoS ratio above 1.
    pub fn new(config: SimConfig, output_dir: impl Into<PathBuf>) -> Result<Self, QueueingError> {
        let output_dir = output_dir.into();
        let conflict_model = config.conflict_model()?;
        let traffic = TrafficGenerator::new(config.arrival_dist, config.links.clone())?;

        let mut systems = Vec::new();
        for &policy in &config.policies {
            for &bandwidth in &config.bandwidths {
                for &qos_ratio in &config.qos_ratios {
                    let output_filename = output_dir.join(format!(
                        "deficits_{}_b{}_q{}.txt",
                        policy, bandwidth, qos_ratio
                    ));
                    let system = QueueingSystem::new(QueueingConfig {
                        conflict_model: conflict_model.clone(),
                        policy,
                        qos: config.scaled_qos(qos_ratio),
                        bandwidth,
                        max_delay_bound: config.max_delay_bound(),
                        output_filename,
                        num_iterations: config.num_iterations,
                        threshold_ratio: config.threshold_ratio,
                        tie_break: config.tie_break,
                        intra_link_order: None,
                    })?;
                    systems.push(SystemSlot {
                        system,
                        cache: ScheduleCache::new(),
                        qos_ratio,
                    });
                }
            }
        }

        info!(
            network_type = %config.network_type,
            links = config.network_size,
            schedules = conflict_model.rows().len(),
            systems = systems.len(),
            seed = config.rng_seed,
            "simulator initialised"
        );

        Ok(Self {
            rng: StdRng::seed_from_u64(config.rng_seed),
            config,
            conflict_model,
            traffic,
            systems,
            output_dir,
            system_clock: 0,
        })
    }

    pub fn conflict_model(&self) -> &ConflictModel {
        &self.conflict_model
    }

    pub fn system_clock(&self) -> i64 {
        self.system_clock
    }

    pub fn num_iterations(&self) -> i64 {
        self.config.num_iterations
    }

    pub fn systems(&self) -> impl Iterator<Item = &QueueingSystem> {
        self.systems.iter().map(|s| &s.system)
    }

    /// Write `config.yaml` into the output directory.
    pub fn save_config(&self) -> Result<()> {
        let path = self.output_dir.join("config.yaml");
        let yaml = self.config.to_yaml(&self.conflict_model)?;
        fs::write(&path, yaml)
            .with_context(|| format!("Cannot write configuration snapshot: {}", path.display()))
    }

    /// Advance every queueing system by one tick.
    pub fn step(&mut self) -> Result<(), QueueingError> {
        let traffic = self.traffic.generate(self.system_clock, &mut self.rng);

        for slot in &mut self.systems {
            slot.system.arrive(&traffic, &mut self.rng)?;
            slot.system.depart(&mut self.rng, &mut slot.cache);
            slot.system.clock_tick();
            slot.system.update_stability_counter();
            if self.config.save_deficits {
                slot.system.output_deficits(slot.system.output_filename())?;
            }
        }

        self.system_clock += 1;
        Ok(())
    }

    /// Run all `num_iterations` ticks, logging progress every tenth of the
    /// run, then write the result files.
    pub fn run(&mut self) -> Result<Vec<RunSummary>> {
        self.save_config()?;

        let total = self.config.num_iterations;
        let report_every = (total / 10).max(1);
        for _ in 0..total {
            self.step()
                .with_context(|| format!("tick {} failed", self.system_clock))?;
            if self.system_clock % report_every == 0 {
                info!(
                    tick = self.system_clock,
                    total,
                    percent = self.system_clock * 100 / total,
                    "progress"
                );
            }
        }

        self.save_stability_ratios(self.output_dir.join("stability.txt"))?;
        if self.config.output_throughput {
            self.save_throughput(self.output_dir.join("throughput.txt"))?;
        }

        let summaries = self.summaries();
        for s in &summaries {
            debug!(
                policy = %s.policy,
                bandwidth = s.bandwidth,
                qos_ratio = s.qos_ratio,
                stability_ratio = s.stability_ratio,
                throughput = s.throughput,
                "system finished"
            );
        }
        Ok(summaries)
    }

    /// Current metrics of every system, in construction order.
    pub fn summaries(&self) -> Vec<RunSummary> {
        self.systems
            .iter()
            .map(|slot| RunSummary {
                policy: slot.system.policy(),
                bandwidth: slot.system.bandwidth(),
                qos_ratio: slot.qos_ratio,
                stability_ratio: slot.system.stability_ratio(),
                arrivals: slot.system.sum_cumulative_arrival(),
                throughput: slot.system.sum_cumulative_throughput(),
                expired: slot.system.sum_cumulative_expired(),
            })
            .collect()
    }

    /// One line per system: `policy bandwidth qos_ratio stability_ratio`.
    pub fn save_stability_ratios(&self, path: impl AsRef<Path>) -> Result<(), QueueingError> {
        let lines: Vec<String> = self
            .summaries()
            .iter()
            .map(|s| format!("{} {} {} {}", s.policy, s.bandwidth, s.qos_ratio, s.stability_ratio))
            .collect();
        write_lines(path.as_ref(), &lines)
    }

    /// One line per system: `policy bandwidth qos_ratio arrivals throughput
    /// expired`.
    pub fn save_throughput(&self, path: impl AsRef<Path>) -> Result<(), QueueingError> {
        let lines: Vec<String> = self
            .summaries()
            .iter()
            .map(|s| {
                format!(
                    "{} {} {} {} {} {}",
                    s.policy, s.bandwidth, s.qos_ratio, s.arrivals, s.throughput, s.expired
                )
            })
            .collect();
        write_lines(path.as_ref(), &lines)
    }
}

fn write_lines(path: &Path, lines: &[String]) -> Result<(), QueueingError> {
    let mut content = lines.join("\n");
    content.push('\n');
    fs::write(path, content).map_err(|source| QueueingError::OutputFile {
        path: path.to_path_buf(),
        source,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
