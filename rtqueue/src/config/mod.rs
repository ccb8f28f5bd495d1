//! Simulation configuration loading.
//!
//! The expected YAML structure is:
//! ```yaml
//! network_type: line          # collocated | line | cycle | unit-disk
//! network_size: 4
//! interference_radius: 1
//! arrival_dist: uniform       # uniform | binomial | bernoulli | bernoulli-fine
//! min_packet: [0, 0, 0, 0]
//! max_packet: [2, 2, 2, 2]
//! min_delay_bound: [1, 1, 1, 1]
//! max_delay_bound: [3, 3, 3, 3]
//! base_qos: [0.5, 0.5, 0.5, 0.5]
//! num_iterations: 10000
//! policies: [ldf, edf, maximal]
//! bandwidths: [1, 2]
//! qos_ratios: [0.8, 1.0]
//! rng_seed: 0
//! ```
//!
//! Optional keys: `positions` (unit-disk only), `binom_param`, `bern_param`,
//! `threshold_ratio` (default `0.5`), `tie_break` (default `random`),
//! `output_throughput`, `save_deficits`, `maximal_schedules`.  Optional
//! per-link vectors default to zeros; every per-link vector that is present
//! must have `network_size` entries.
//!
//! `maximal_schedules` is an explicit 0/1 matrix (one row per feasible
//! pattern, one column per link).  When present it is used as the conflict
//! model as-is and the topology keys only label the run.  The `config.yaml`
//! snapshot always carries it, so reloading a snapshot reproduces the run.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::conflict::topology::{build_conflict_model, hop_radius};
use crate::conflict::ConflictModel;
use crate::error::QueueingError;
use crate::names::{ArrivalDistribution, Named, NetworkType, Policy, TieBreak};
use crate::traffic::LinkTrafficSpec;

// ── Private YAML deserialization types ────────────────────────────────────────

/// Top-level wrapper that maps directly onto the YAML file layout.
///
/// Kept private – callers work with the validated [`SimConfig`].
#[derive(Debug, Deserialize)]
struct SimConfigFile {
    network_type: String,
    network_size: usize,
    #[serde(default)]
    interference_radius: f64,
    #[serde(default)]
    positions: Vec<[f64; 2]>,
    arrival_dist: String,
    #[serde(default)]
    min_packet: Vec<u64>,
    #[serde(default)]
    max_packet: Vec<u64>,
    #[serde(default)]
    binom_param: Vec<f64>,
    #[serde(default)]
    bern_param: Vec<f64>,
    min_delay_bound: Vec<i64>,
    max_delay_bound: Vec<i64>,
    base_qos: Vec<f64>,
    num_iterations: i64,
    policies: Vec<String>,
    bandwidths: Vec<usize>,
    qos_ratios: Vec<f64>,
    #[serde(default = "default_threshold_ratio")]
    threshold_ratio: f64,
    #[serde(default)]
    tie_break: Option<String>,
    #[serde(default)]
    rng_seed: u64,
    #[serde(default)]
    output_throughput: bool,
    #[serde(default)]
    save_deficits: bool,
    #[serde(default)]
    maximal_schedules: Option<Vec<Vec<u8>>>,
}

/// Serde default for `threshold_ratio`.
fn default_threshold_ratio() -> f64 {
    0.5
}

/// Snapshot written next to the results so a run can be reproduced.
#[derive(Debug, Serialize)]
struct ConfigSnapshot<'a> {
    network_type: &'static str,
    network_size: usize,
    interference_radius: f64,
    positions: &'a [[f64; 2]],
    arrival_dist: &'static str,
    min_packet: Vec<u64>,
    max_packet: Vec<u64>,
    binom_param: Vec<f64>,
    bern_param: Vec<f64>,
    min_delay_bound: Vec<i64>,
    max_delay_bound: Vec<i64>,
    base_qos: &'a [f64],
    num_iterations: i64,
    policies: Vec<&'static str>,
    bandwidths: &'a [usize],
    qos_ratios: &'a [f64],
    threshold_ratio: f64,
    tie_break: &'static str,
    rng_seed: u64,
    output_throughput: bool,
    save_deficits: bool,
    maximal_schedules: Vec<Vec<u8>>,
}

// ── Public data structures ────────────────────────────────────────────────────

/// Validated simulation configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub network_type: NetworkType,
    pub network_size: usize,
    pub interference_radius: f64,
    /// Link positions for `unit-disk`; empty otherwise.
    pub positions: Vec<[f64; 2]>,
    pub arrival_dist: ArrivalDistribution,
    /// Arrival parameters, one entry per link.
    pub links: Vec<LinkTrafficSpec>,
    pub base_qos: Vec<f64>,
    pub num_iterations: i64,
    pub policies: Vec<Policy>,
    pub bandwidths: Vec<usize>,
    pub qos_ratios: Vec<f64>,
    pub threshold_ratio: f64,
    pub tie_break: TieBreak,
    pub rng_seed: u64,
    pub output_throughput: bool,
    pub save_deficits: bool,
    /// Explicit conflict model; generated from the topology when `None`.
    pub maximal_schedules: Option<ConflictModel>,
}

impl SimConfig {
    /// Parse and validate the YAML file at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened, the YAML is structurally
    /// invalid, a name is not recognised, or a per-link vector has the wrong
    /// length.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading simulation configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid configuration file: {}", path.display()))
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let file: SimConfigFile =
            serde_yaml::from_str(content).context("Failed to parse YAML configuration")?;
        Self::from_file_layout(file)
    }

    fn from_file_layout(file: SimConfigFile) -> Result<Self> {
        let n = file.network_size;
        if n == 0 {
            bail!("network_size must be at least 1");
        }
        if file.num_iterations <= 0 {
            bail!("num_iterations must be positive, got {}", file.num_iterations);
        }

        let network_type = NetworkType::parse_name(&file.network_type)?;
        let arrival_dist = ArrivalDistribution::parse_name(&file.arrival_dist)?;
        let policies = file
            .policies
            .iter()
            .map(|p| Policy::parse_name(p))
            .collect::<Result<Vec<_>, _>>()?;
        let tie_break = match &file.tie_break {
            Some(name) => TieBreak::parse_name(name)?,
            None => TieBreak::default(),
        };

        let min_packet = per_link_or_zero("min_packet", file.min_packet, n)?;
        let max_packet = per_link_or_zero("max_packet", file.max_packet, n)?;
        let binom_param = per_link_or_zero("binom_param", file.binom_param, n)?;
        let bern_param = per_link_or_zero("bern_param", file.bern_param, n)?;
        let min_delay_bound = per_link("min_delay_bound", file.min_delay_bound, n)?;
        let max_delay_bound = per_link("max_delay_bound", file.max_delay_bound, n)?;
        let base_qos = per_link("base_qos", file.base_qos, n)?;
        let maximal_schedules = file
            .maximal_schedules
            .map(|rows| explicit_model(rows, n))
            .transpose()?;
        if maximal_schedules.is_none() {
            match network_type {
                NetworkType::UnitDisk => {
                    per_link("positions", file.positions.clone(), n)?;
                }
                NetworkType::Line | NetworkType::Cycle => {
                    hop_radius(file.interference_radius)?;
                }
                NetworkType::Collocated => {}
            }
        }

        let links = (0..n)
            .map(|i| LinkTrafficSpec {
                min_packet: min_packet[i],
                max_packet: max_packet[i],
                binom_param: binom_param[i],
                bern_param: bern_param[i],
                min_delay_bound: min_delay_bound[i],
                max_delay_bound: max_delay_bound[i],
            })
            .collect();

        if policies.is_empty() || file.bandwidths.is_empty() || file.qos_ratios.is_empty() {
            warn!("policies, bandwidths or qos_ratios is empty, no queueing system will run");
        }

        let cfg = Self {
            network_type,
            network_size: n,
            interference_radius: file.interference_radius,
            positions: file.positions,
            arrival_dist,
            links,
            base_qos,
            num_iterations: file.num_iterations,
            policies,
            bandwidths: file.bandwidths,
            qos_ratios: file.qos_ratios,
            threshold_ratio: file.threshold_ratio,
            tie_break,
            rng_seed: file.rng_seed,
            output_throughput: file.output_throughput,
            save_deficits: file.save_deficits,
            maximal_schedules,
        };

        debug!(
            network_type = %cfg.network_type,
            links = cfg.network_size,
            arrival = %cfg.arrival_dist,
            iterations = cfg.num_iterations,
            policies = ?cfg.policies,
            bandwidths = ?cfg.bandwidths,
            qos_ratios = ?cfg.qos_ratios,
            "configuration parsed"
        );
        Ok(cfg)
    }

    /// Largest configured delay bound across links.
    pub fn max_delay_bound(&self) -> i64 {
        self.links
            .iter()
            .map(|l| l.max_delay_bound)
            .max()
            .unwrap_or(0)
    }

    /// The explicit matrix if one was given, otherwise the model generated
    /// from the topology keys.
    pub fn conflict_model(&self) -> Result<ConflictModel, QueueingError> {
        match &self.maximal_schedules {
            Some(model) => Ok(model.clone()),
            None => build_conflict_model(
                self.network_type,
                self.network_size,
                self.interference_radius,
                &self.positions,
            ),
        }
    }

    /// Per-link QoS ratios for one `qos_ratio` setting.
    pub fn scaled_qos(&self, qos_ratio: f64) -> Vec<f64> {
        self.base_qos.iter().map(|q| q * qos_ratio).collect()
    }

    /// Render the effective configuration plus the generated maximal schedule
    /// matrix as YAML.
    pub fn to_yaml(&self, model: &ConflictModel) -> Result<String> {
        let snapshot = ConfigSnapshot {
            network_type: self.network_type.name(),
            network_size: self.network_size,
            interference_radius: self.interference_radius,
            positions: &self.positions,
            arrival_dist: self.arrival_dist.name(),
            min_packet: self.links.iter().map(|l| l.min_packet).collect(),
            max_packet: self.links.iter().map(|l| l.max_packet).collect(),
            binom_param: self.links.iter().map(|l| l.binom_param).collect(),
            bern_param: self.links.iter().map(|l| l.bern_param).collect(),
            min_delay_bound: self.links.iter().map(|l| l.min_delay_bound).collect(),
            max_delay_bound: self.links.iter().map(|l| l.max_delay_bound).collect(),
            base_qos: &self.base_qos,
            num_iterations: self.num_iterations,
            policies: self.policies.iter().map(|p| p.name()).collect(),
            bandwidths: &self.bandwidths,
            qos_ratios: &self.qos_ratios,
            threshold_ratio: self.threshold_ratio,
            tie_break: self.tie_break.name(),
            rng_seed: self.rng_seed,
            output_throughput: self.output_throughput,
            save_deficits: self.save_deficits,
            maximal_schedules: model
                .rows()
                .iter()
                .map(|row| row.iter().map(|&b| u8::from(b)).collect())
                .collect(),
        };
        serde_yaml::to_string(&snapshot).context("Failed to serialise configuration snapshot")
    }
}

/// Validate an explicit 0/1 schedule matrix with `n` columns.
fn explicit_model(rows: Vec<Vec<u8>>, n: usize) -> Result<ConflictModel> {
    let rows = rows
        .into_iter()
        .enumerate()
        .map(|(r, row)| {
            row.into_iter()
                .map(|v| match v {
                    0 => Ok(false),
                    1 => Ok(true),
                    other => bail!("maximal_schedules row {r} holds {other}, expected 0 or 1"),
                })
                .collect::<Result<Vec<bool>>>()
        })
        .collect::<Result<Vec<_>>>()?;
    let model = ConflictModel::new(rows)?;
    if model.network_size() != n {
        return Err(QueueingError::LinkCountMismatch {
            what: "maximal_schedules",
            expected: n,
            found: model.network_size(),
        }
        .into());
    }
    Ok(model)
}

/// Require exactly `n` entries.
fn per_link<T>(what: &'static str, v: Vec<T>, n: usize) -> Result<Vec<T>, QueueingError> {
    if v.len() != n {
        return Err(QueueingError::LinkCountMismatch {
            what,
            expected: n,
            found: v.len(),
        });
    }
    Ok(v)
}

/// Like [`per_link`], but an absent (empty) vector becomes `n` zeros.
fn per_link_or_zero<T: Default + Clone>(
    what: &'static str,
    v: Vec<T>,
    n: usize,
) -> Result<Vec<T>, QueueingError> {
    if v.is_empty() {
        return Ok(vec![T::default(); n]);
    }
    per_link(what, v, n)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
