/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::{error, info};

use rtqueue::config::SimConfig;
use rtqueue::simulator::Simulator;

// ── CLI argument definition ───────────────────────────────────────────────────

/// Real-time link scheduling simulator.
///
/// Example:
///   rtqueue -c sim.yaml -o results/ --seed 7
#[derive(Debug, Parser)]
#[command(
    name = "rtqueue",
    about = "Deficit-based real-time link scheduling simulator",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML simulation configuration file.
    #[arg(short = 'c', long = "config")]
    config: PathBuf,

    /// Directory that receives config.yaml, stability.txt and the other
    /// result files.  Created if missing.
    #[arg(short = 'o', long = "output-dir", default_value = ".")]
    output_dir: PathBuf,

    /// Override the configured PRNG seed.
    #[arg(short = 's', long = "seed")]
    seed: Option<u64>,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    info!(
        config     = %cli.config.display(),
        output_dir = %cli.output_dir.display(),
        seed       = ?cli.seed,
        "rtqueue starting up"
    );

    // ── Load configuration ────────────────────────────────────────────────────
    let mut config = match SimConfig::load_from_file(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            process::exit(1);
        }
    };
    if let Some(seed) = cli.seed {
        config.rng_seed = seed;
    }

    if let Err(e) = std::fs::create_dir_all(&cli.output_dir) {
        error!(
            "Cannot create output directory {}: {}",
            cli.output_dir.display(),
            e
        );
        process::exit(1);
    }

    // ── Run ───────────────────────────────────────────────────────────────────
    let mut simulator = match Simulator::new(config, &cli.output_dir) {
        Ok(s) => s,
        Err(e) => {
            error!("Invalid simulation setup: {:#}", e);
            process::exit(1);
        }
    };

    match simulator.run() {
        Ok(summaries) => {
            for s in summaries {
                info!(
                    "  [{policy}]  bandwidth={bw}  qos_ratio={q}  stability={r:.4}  throughput={t}/{a}",
                    policy = s.policy,
                    bw = s.bandwidth,
                    q = s.qos_ratio,
                    r = s.stability_ratio,
                    t = s.throughput,
                    a = s.arrivals,
                );
            }
        }
        Err(e) => {
            error!("Simulation failed: {:#}", e);
            process::exit(1);
        }
    }
}
