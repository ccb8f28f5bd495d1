/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Conflict (interference) model.
//!
//! A [`ConflictModel`] is a fixed binary matrix: every row is one *maximal
//! schedule*, a pattern of links that may be active at the same time.  An
//! activation vector is feasible iff the set of links it activates is a subset
//! of at least one row.
//!
//! Policies that build their activation set greedily use a
//! [`PatternBuilder`], which keeps the rows still compatible with every link
//! chosen so far and refuses a link once no row would contain it.

pub mod topology;

use crate::error::QueueingError;

// ── ConflictModel ─────────────────────────────────────────────────────────────

/// Validated maximal-schedule matrix.  Read-only after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictModel {
    rows: Vec<Vec<bool>>,
    network_size: usize,
}

impl ConflictModel {
    /// Validate `rows` and build the model.
    ///
    /// # Errors
    /// * [`QueueingError::EmptyConflictModel`]: no rows, or zero columns.
    /// * [`QueueingError::RaggedConflictModel`]: rows of different lengths.
    pub fn new(rows: Vec<Vec<bool>>) -> Result<Self, QueueingError> {
        let network_size = match rows.first() {
            Some(first) if !first.is_empty() => first.len(),
            _ => return Err(QueueingError::EmptyConflictModel),
        };
        if let Some((row, r)) = rows
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() != network_size)
        {
            return Err(QueueingError::RaggedConflictModel {
                row,
                expected: network_size,
                found: r.len(),
            });
        }
        Ok(Self { rows, network_size })
    }

    /// Number of links (column count).
    pub fn network_size(&self) -> usize {
        self.network_size
    }

    pub fn rows(&self) -> &[Vec<bool>] {
        &self.rows
    }

    /// `true` if every link active in `activation` appears together in at
    /// least one row.  A vector of the wrong length is never feasible.
    pub fn is_feasible(&self, activation: &[bool]) -> bool {
        if activation.len() != self.network_size {
            return false;
        }
        self.rows.iter().any(|row| {
            activation
                .iter()
                .zip(row)
                .all(|(&active, &allowed)| !active || allowed)
        })
    }

    /// Start a greedy activation set over this model.
    pub fn builder(&self) -> PatternBuilder<'_> {
        PatternBuilder {
            model: self,
            candidates: (0..self.rows.len()).collect(),
            activation: vec![false; self.network_size],
        }
    }
}

// ── PatternBuilder ────────────────────────────────────────────────────────────

/// Incrementally assembled conflict-free activation set.
#[derive(Debug)]
pub struct PatternBuilder<'a> {
    model: &'a ConflictModel,
    /// Row indices that contain every link chosen so far.
    candidates: Vec<usize>,
    activation: Vec<bool>,
}

impl PatternBuilder<'_> {
    /// Activate `link` if some remaining row still allows it.
    ///
    /// Returns `false` (and changes nothing) when `link` would conflict with an
    /// already chosen link.
    pub fn try_add(&mut self, link: usize) -> bool {
        if self.activation[link] {
            return true;
        }
        let rows = &self.model.rows;
        if !self.candidates.iter().any(|&r| rows[r][link]) {
            return false;
        }
        self.candidates.retain(|&r| rows[r][link]);
        self.activation[link] = true;
        true
    }

    pub fn finish(self) -> Vec<bool> {
        self.activation
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
