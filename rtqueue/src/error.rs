/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error types for the queueing core.
//!
//! Every variant is a *fatal configuration* error: the in-memory state
//! transitions of a [`QueueingSystem`](crate::queueing::QueueingSystem) cannot
//! fail on their own, so anything reported here means the system was built or
//! fed with inconsistent input.  The binary logs the error chain and exits.
//!
//! **Do not** replace these with `anyhow::Error` inside the library; callers
//! match on the variants in tests.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type of the `rtqueue` library.
#[derive(Debug, Error)]
pub enum QueueingError {
    /// A name (policy, network type, arrival distribution, tie-break) that is
    /// not present in the fixed name table.
    #[error("unknown {kind} '{value}' (valid: {valid})")]
    UnknownName {
        kind: &'static str,
        value: String,
        valid: String,
    },

    /// The conflict model has no rows, or its rows have no columns.
    #[error("conflict model is empty: at least one row with one link is required")]
    EmptyConflictModel,

    /// A conflict-model row does not have the same length as the first row.
    #[error("conflict model row {row} has {found} links, expected {expected}")]
    RaggedConflictModel {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// A per-link vector does not have one entry per link.
    #[error("{what} has {found} entries but the network has {expected} links")]
    LinkCountMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    /// A QoS ratio (binomial success probability) outside `[0, 1]`.
    #[error("QoS ratio {value} of link {link} is outside [0, 1]")]
    InvalidQos { link: usize, value: f64 },

    /// A traffic-generator parameter that no arrival process can use
    /// (probability outside `[0, 1]`, `min > max`, delay bound below 1).
    #[error("invalid {what} for link {link}: {detail}")]
    InvalidTrafficParameter {
        what: &'static str,
        link: usize,
        detail: String,
    },

    /// A `line` / `cycle` interference radius that is not a whole number of
    /// hops.
    #[error("interference radius {radius} must be a non-negative whole number of hops")]
    InvalidRadius { radius: f64 },

    /// Bandwidth must allow at least one scheduling sub-round per tick.
    #[error("bandwidth must be at least 1")]
    ZeroBandwidth,

    /// The diagnostic output file could not be opened or written.
    #[error("could not open output file {}", path.display())]
    OutputFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
