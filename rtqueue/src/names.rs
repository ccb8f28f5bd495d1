/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Enumerated configuration values and their fixed name tables.
//!
//! Each enum owns one immutable `(variant, name)` table.  Parsing walks the
//! table by name, printing walks it by variant, so both directions are always
//! derived from the same rows.
//!
//! | Enum | Names |
//! |---|---|
//! | [`Policy`] | `ldf`, `edf`, `sdbf`, `edf-naive`, `sdbf-naive`, `maximal`, `ldf-threshold`, `ldf-vision`, `max-deficit` |
//! | [`NetworkType`] | `collocated`, `line`, `cycle`, `unit-disk` |
//! | [`ArrivalDistribution`] | `uniform`, `binomial`, `bernoulli`, `bernoulli-fine` |
//! | [`TieBreak`] | `random`, `link-index` |

use std::fmt;
use std::str::FromStr;

use crate::error::QueueingError;

/// A closed enum with a fixed string table.
pub trait Named: Copy + PartialEq + 'static {
    /// Human-readable kind used in error messages (`"policy"`, ...).
    const KIND: &'static str;
    /// Every variant paired with its canonical name.
    const TABLE: &'static [(Self, &'static str)];

    /// Canonical name of `self`.
    fn name(self) -> &'static str {
        Self::TABLE
            .iter()
            .find(|(v, _)| *v == self)
            .map(|(_, n)| *n)
            // every variant has a row; the tests below walk all of them
            .unwrap_or("?")
    }

    /// Look up a variant by its canonical name.
    fn parse_name(s: &str) -> Result<Self, QueueingError> {
        Self::TABLE
            .iter()
            .find(|(_, n)| *n == s)
            .map(|(v, _)| *v)
            .ok_or_else(|| QueueingError::UnknownName {
                kind: Self::KIND,
                value: s.to_string(),
                valid: Self::TABLE
                    .iter()
                    .map(|(_, n)| *n)
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

macro_rules! named_impls {
    ($ty:ty) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl FromStr for $ty {
            type Err = QueueingError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <$ty>::parse_name(s)
            }
        }
    };
}

// ── Policy ────────────────────────────────────────────────────────────────────

/// Scheduling policy of a [`QueueingSystem`](crate::queueing::QueueingSystem).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Policy {
    /// Largest deficit first.
    Ldf,
    /// Earliest deadline first among links that still owe service.
    Edf,
    /// Smallest delay bound first among links that still owe service.
    Sdbf,
    /// Earliest deadline first, deficit ignored.
    EdfNaive,
    /// Smallest delay bound first, deficit ignored.
    SdbfNaive,
    /// Any maximal conflict-free set.
    Maximal,
    /// Earliest deadline first over links that pass the threshold gate.
    LdfThreshold,
    /// Largest deficit first, memoised across ticks.
    LdfVision,
    /// Feasible row with the largest summed deficit.
    MaxDeficit,
}

impl Named for Policy {
    const KIND: &'static str = "policy";
    const TABLE: &'static [(Self, &'static str)] = &[
        (Policy::Ldf, "ldf"),
        (Policy::Edf, "edf"),
        (Policy::Sdbf, "sdbf"),
        (Policy::EdfNaive, "edf-naive"),
        (Policy::SdbfNaive, "sdbf-naive"),
        (Policy::Maximal, "maximal"),
        (Policy::LdfThreshold, "ldf-threshold"),
        (Policy::LdfVision, "ldf-vision"),
        (Policy::MaxDeficit, "max-deficit"),
    ];
}

named_impls!(Policy);

impl Policy {
    /// Intra-link removal order implied by the policy.
    ///
    /// The smallest-delay-bound family serves the packet with the smallest
    /// delay bound first; every other policy serves the earliest deadline.
    pub fn intra_link_order(self) -> IntraLinkOrder {
        match self {
            Policy::Sdbf | Policy::SdbfNaive => IntraLinkOrder::DelayBound,
            _ => IntraLinkOrder::Deadline,
        }
    }
}

// ── NetworkType ───────────────────────────────────────────────────────────────

/// Interference topology used to build the conflict model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkType {
    /// All links interfere with each other.
    Collocated,
    /// Links on a line interfere within the interference radius.
    Line,
    /// Links on a ring interfere within the interference radius.
    Cycle,
    /// Links placed in the plane interfere within a Euclidean radius.
    UnitDisk,
}

impl Named for NetworkType {
    const KIND: &'static str = "network type";
    const TABLE: &'static [(Self, &'static str)] = &[
        (NetworkType::Collocated, "collocated"),
        (NetworkType::Line, "line"),
        (NetworkType::Cycle, "cycle"),
        (NetworkType::UnitDisk, "unit-disk"),
    ];
}

named_impls!(NetworkType);

// ── ArrivalDistribution ───────────────────────────────────────────────────────

/// Per-link packet arrival process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrivalDistribution {
    Uniform,
    Binomial,
    Bernoulli,
    BernoulliFine,
}

impl Named for ArrivalDistribution {
    const KIND: &'static str = "arrival distribution";
    const TABLE: &'static [(Self, &'static str)] = &[
        (ArrivalDistribution::Uniform, "uniform"),
        (ArrivalDistribution::Binomial, "binomial"),
        (ArrivalDistribution::Bernoulli, "bernoulli"),
        (ArrivalDistribution::BernoulliFine, "bernoulli-fine"),
    ];
}

named_impls!(ArrivalDistribution);

// ── TieBreak ──────────────────────────────────────────────────────────────────

/// How links of equal priority are ordered before a policy builds its set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TieBreak {
    /// Shuffle the candidates with the shared PRNG.
    #[default]
    Random,
    /// Lower link index wins.
    LinkIndex,
}

impl Named for TieBreak {
    const KIND: &'static str = "tie-break";
    const TABLE: &'static [(Self, &'static str)] = &[
        (TieBreak::Random, "random"),
        (TieBreak::LinkIndex, "link-index"),
    ];
}

named_impls!(TieBreak);

// ── IntraLinkOrder ────────────────────────────────────────────────────────────

/// Order in which packets leave one link's queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntraLinkOrder {
    /// Smallest deadline first.
    Deadline,
    /// Smallest delay bound first.
    DelayBound,
    /// No ordering; the container's last packet leaves first.
    Unordered,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
