/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! The queueing system: per-link queues, the deficit ledger, cumulative
//! counters and the stability windows, driven by an explicit per-tick
//! protocol.
//!
//! ```text
//!   arrive(traffic, rng)          queues += traffic, deficit += Binomial(|batch|, qos)
//!     │
//!   depart(rng, cache)            `bandwidth` sub-rounds against the tick-start deficits,
//!     │                           ledger replaced once at the end
//!   clock_tick()                  clock += 1, drop packets with deadline < clock
//!     │
//!   update_stability_counter()    windowed deficit sums
//! ```
//!
//! The core does not enforce this order; the driver does.  Every invariant
//! below holds as long as the four calls are made once each, in that order.
//!
//! * `deficit[i] >= 0`: the ledger is unsigned and decrements saturate.
//! * After `clock_tick`, no queued packet has `deadline < clock`.
//! * `network_size` is the conflict model's column count and never changes.

use std::cmp::Reverse;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use rand::Rng;
use rand_distr::{Binomial, Distribution};
use tracing::{debug, trace};

use crate::conflict::ConflictModel;
use crate::error::QueueingError;
use crate::names::{IntraLinkOrder, Policy, TieBreak};
use crate::packet::{Packet, Traffic};
use crate::scheduler::{select_activation, LinkView, ScheduleCache, SlotContext};

// ── Construction parameters ───────────────────────────────────────────────────

/// Everything a [`QueueingSystem`] is built from.
#[derive(Debug, Clone)]
pub struct QueueingConfig {
    /// Feasible activation patterns; its column count fixes the link count.
    pub conflict_model: ConflictModel,
    pub policy: Policy,
    /// Per-link QoS ratio: success probability of the deficit arrival draw.
    pub qos: Vec<f64>,
    /// Scheduling sub-rounds per tick.
    pub bandwidth: usize,
    pub max_delay_bound: i64,
    /// Where the driver writes this system's deficit trace.  Opaque here.
    pub output_filename: PathBuf,
    /// Planned run length; only used for the stability windows.
    pub num_iterations: i64,
    /// Gate of the `ldf-threshold` policy.
    pub threshold_ratio: f64,
    pub tie_break: TieBreak,
    /// Overrides the policy's own intra-link order when set.
    pub intra_link_order: Option<IntraLinkOrder>,
}

// ── Per-link state ────────────────────────────────────────────────────────────

/// Queue, ledger entry and counters of one link.
#[derive(Debug, Clone, Default)]
struct LinkState {
    queue: Vec<Packet>,
    deficit: u64,
    qos: f64,
    cumulative_arrival: u64,
    cumulative_throughput: u64,
    cumulative_expired: u64,
}

impl LinkState {
    /// Sort so that `queue.pop()` yields the smallest key under `order`.
    fn arrange(&mut self, order: IntraLinkOrder) {
        if order != IntraLinkOrder::Unordered {
            self.queue.sort_by_key(|p| Reverse(p.order_key(order)));
        }
    }

    /// Drop every packet past its deadline; returns how many were dropped.
    fn expire(&mut self, clock: i64) -> u64 {
        let before = self.queue.len();
        self.queue.retain(|p| !p.is_expired(clock));
        let dropped = (before - self.queue.len()) as u64;
        self.cumulative_expired += dropped;
        dropped
    }
}

// ── QueueingSystem ────────────────────────────────────────────────────────────

/// One simulated network under one policy, bandwidth and QoS setting.
///
/// Exclusively owns all per-link state.  The conflict model and QoS ratios
/// are read-only after [`new`](Self::new).
#[derive(Debug)]
pub struct QueueingSystem {
    links: Vec<LinkState>,
    conflict_model: ConflictModel,
    policy: Policy,
    bandwidth: usize,
    intra_link_order: IntraLinkOrder,
    tie_break: TieBreak,
    system_clock: i64,
    max_delay_bound: i64,
    output_filename: PathBuf,
    num_iterations: i64,
    threshold_ratio: f64,
    lower_deficit_sum: i64,
    upper_deficit_sum: i64,
}

impl QueueingSystem {
    /// Validate `cfg` and build an empty system at tick 0.
    ///
    /// # Errors
    /// * [`QueueingError::LinkCountMismatch`]: `qos` does not have one entry
    ///   per link.
    /// * [`QueueingError::InvalidQos`]: a ratio outside `[0, 1]`.
    /// * [`QueueingError::ZeroBandwidth`]: `bandwidth == 0`.
    pub fn new(cfg: QueueingConfig) -> Result<Self, QueueingError> {
        let network_size = cfg.conflict_model.network_size();
        if cfg.qos.len() != network_size {
            return Err(QueueingError::LinkCountMismatch {
                what: "qos",
                expected: network_size,
                found: cfg.qos.len(),
            });
        }
        if let Some((link, &value)) = cfg
            .qos
            .iter()
            .enumerate()
            .find(|(_, q)| !(0.0..=1.0).contains(*q))
        {
            return Err(QueueingError::InvalidQos { link, value });
        }
        if cfg.bandwidth == 0 {
            return Err(QueueingError::ZeroBandwidth);
        }

        let links = cfg
            .qos
            .iter()
            .map(|&qos| LinkState {
                qos,
                ..Default::default()
            })
            .collect();
        let intra_link_order = cfg
            .intra_link_order
            .unwrap_or_else(|| cfg.policy.intra_link_order());

        debug!(
            policy = %cfg.policy,
            links = network_size,
            bandwidth = cfg.bandwidth,
            order = ?intra_link_order,
            tie_break = %cfg.tie_break,
            "queueing system created"
        );

        Ok(Self {
            links,
            conflict_model: cfg.conflict_model,
            policy: cfg.policy,
            bandwidth: cfg.bandwidth,
            intra_link_order,
            tie_break: cfg.tie_break,
            system_clock: 0,
            max_delay_bound: cfg.max_delay_bound,
            output_filename: cfg.output_filename,
            num_iterations: cfg.num_iterations,
            threshold_ratio: cfg.threshold_ratio,
            lower_deficit_sum: 0,
            upper_deficit_sum: 0,
        })
    }

    // ── Per-tick protocol ─────────────────────────────────────────────────────

    /// Enqueue one batch per link and grow each deficit by
    /// `Binomial(batch size, qos)` drawn from `rng`.
    ///
    /// # Errors
    /// [`QueueingError::LinkCountMismatch`] if `traffic` does not hold one
    /// batch per link; nothing is enqueued in that case.
    pub fn arrive<R: Rng + ?Sized>(
        &mut self,
        traffic: &Traffic,
        rng: &mut R,
    ) -> Result<(), QueueingError> {
        if traffic.len() != self.links.len() {
            return Err(QueueingError::LinkCountMismatch {
                what: "traffic",
                expected: self.links.len(),
                found: traffic.len(),
            });
        }
        for (index, (link, batch)) in self.links.iter_mut().zip(traffic).enumerate() {
            let n = batch.len() as u64;
            let increase = Binomial::new(n, link.qos)
                .map_err(|_| QueueingError::InvalidQos {
                    link: index,
                    value: link.qos,
                })?
                .sample(rng);
            link.queue.extend_from_slice(batch);
            link.deficit += increase;
            link.cumulative_arrival += n;
        }
        Ok(())
    }

    /// Run `bandwidth` scheduling sub-rounds and return the activation vector
    /// of each.
    ///
    /// Every sub-round sees the deficits as they were when `depart` was
    /// called.  Service decrements a separate copy (saturating at 0) which
    /// replaces the ledger once all sub-rounds are done.
    pub fn depart<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        cache: &mut ScheduleCache,
    ) -> Vec<Vec<bool>> {
        let order = self.intra_link_order;
        for link in &mut self.links {
            link.arrange(order);
        }

        let snapshot = self.deficits();
        let mut updated = snapshot.clone();
        let mut activations = Vec::with_capacity(self.bandwidth);

        for sub_slot in 0..self.bandwidth {
            let views: Vec<LinkView> = self
                .links
                .iter()
                .map(|l| LinkView::from_packets(&l.queue))
                .collect();
            let ctx = SlotContext {
                links: &views,
                deficits: &snapshot,
                model: &self.conflict_model,
                clock: self.system_clock,
                max_delay_bound: self.max_delay_bound,
                threshold_ratio: self.threshold_ratio,
                tie_break: self.tie_break,
            };
            let activation = select_activation(self.policy, &ctx, rng, cache);
            debug_assert!(self.conflict_model.is_feasible(&activation));

            for ((link, &active), deficit) in
                self.links.iter_mut().zip(&activation).zip(updated.iter_mut())
            {
                if active && link.queue.pop().is_some() {
                    link.cumulative_throughput += 1;
                    *deficit = deficit.saturating_sub(1);
                }
            }
            trace!(clock = self.system_clock, sub_slot, "sub-round served");
            activations.push(activation);
        }

        for (link, deficit) in self.links.iter_mut().zip(updated) {
            link.deficit = deficit;
        }
        activations
    }

    /// Advance the clock by one tick and drop every packet whose deadline is
    /// now in the past.
    pub fn clock_tick(&mut self) {
        self.system_clock += 1;
        let clock = self.system_clock;
        let expired: u64 = self.links.iter_mut().map(|l| l.expire(clock)).sum();
        if expired > 0 {
            trace!(clock, expired, "packets expired");
        }
    }

    /// Accumulate the current total deficit into the lower window
    /// (`[quarter, half)`) or the upper window (`[half, ..)`).
    pub fn update_stability_counter(&mut self) {
        if self.system_clock < self.quarter_point() {
            return;
        }
        let total = self.links.iter().map(|l| l.deficit as i64).sum::<i64>();
        if self.system_clock >= self.half_point() {
            self.upper_deficit_sum += total;
        } else {
            self.lower_deficit_sum += total;
        }
    }

    // ── Diagnostics ───────────────────────────────────────────────────────────

    /// Append the deficit vector to `path` as one space-separated line.
    ///
    /// # Errors
    /// [`QueueingError::OutputFile`] if the file cannot be opened or written.
    pub fn output_deficits(&self, path: impl AsRef<Path>) -> Result<(), QueueingError> {
        let path = path.as_ref();
        let io_err = |source| QueueingError::OutputFile {
            path: path.to_path_buf(),
            source,
        };
        let mut out = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(io_err)?;
        let mut line = String::new();
        for link in &self.links {
            line.push_str(&link.deficit.to_string());
            line.push(' ');
        }
        line.push('\n');
        out.write_all(line.as_bytes()).map_err(io_err)
    }

    /// `floor(num_iterations / 4)`.
    pub fn quarter_point(&self) -> i64 {
        self.num_iterations / 4
    }

    /// `floor(num_iterations / 2)`.
    pub fn half_point(&self) -> i64 {
        self.num_iterations / 2
    }

    /// Average upper-window deficit over average lower-window deficit.
    ///
    /// `0.0` when either window sum is zero.  Values above 1 mean the backlog
    /// of unmet service is still growing.
    pub fn stability_ratio(&self) -> f64 {
        if self.lower_deficit_sum == 0 || self.upper_deficit_sum == 0 {
            return 0.0;
        }
        self.upper_deficit_sum as f64
            / (self.num_iterations - self.half_point()) as f64
            / self.lower_deficit_sum as f64
            * (self.half_point() - self.quarter_point()) as f64
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn network_size(&self) -> usize {
        self.links.len()
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    pub fn bandwidth(&self) -> usize {
        self.bandwidth
    }

    pub fn intra_link_order(&self) -> IntraLinkOrder {
        self.intra_link_order
    }

    pub fn conflict_model(&self) -> &ConflictModel {
        &self.conflict_model
    }

    pub fn system_clock(&self) -> i64 {
        self.system_clock
    }

    pub fn max_delay_bound(&self) -> i64 {
        self.max_delay_bound
    }

    pub fn output_filename(&self) -> &Path {
        &self.output_filename
    }

    pub fn qos(&self) -> Vec<f64> {
        self.links.iter().map(|l| l.qos).collect()
    }

    pub fn queue_lengths(&self) -> Vec<usize> {
        self.links.iter().map(|l| l.queue.len()).collect()
    }

    pub fn deficits(&self) -> Vec<u64> {
        self.links.iter().map(|l| l.deficit).collect()
    }

    /// Packets currently queued on `link`, in container order.
    pub fn queue(&self, link: usize) -> &[Packet] {
        &self.links[link].queue
    }

    pub fn lower_deficit_sum(&self) -> i64 {
        self.lower_deficit_sum
    }

    pub fn upper_deficit_sum(&self) -> i64 {
        self.upper_deficit_sum
    }

    pub fn sum_cumulative_arrival(&self) -> u64 {
        self.links.iter().map(|l| l.cumulative_arrival).sum()
    }

    pub fn sum_cumulative_throughput(&self) -> u64 {
        self.links.iter().map(|l| l.cumulative_throughput).sum()
    }

    pub fn sum_cumulative_expired(&self) -> u64 {
        self.links.iter().map(|l| l.cumulative_expired).sum()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
