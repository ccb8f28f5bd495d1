/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Conflict graphs for the supported network topologies and their conversion
//! into a [`ConflictModel`].
//!
//! Each matrix row is one maximal independent set of the conflict graph,
//! found as a maximal clique of the complement graph with Bron–Kerbosch and
//! pivoting.  Rows are sorted by their link lists so a given topology always
//! yields the same matrix.

use tracing::debug;

use super::ConflictModel;
use crate::error::QueueingError;
use crate::names::NetworkType;

/// Symmetric, irreflexive "interferes with" relation over links.
#[derive(Debug, Clone)]
pub struct ConflictGraph {
    adjacency: Vec<Vec<bool>>,
}

impl ConflictGraph {
    fn from_relation(n: usize, conflicts: impl Fn(usize, usize) -> bool) -> Self {
        let adjacency = (0..n)
            .map(|i| (0..n).map(|j| i != j && conflicts(i, j)).collect())
            .collect();
        Self { adjacency }
    }

    /// Every pair of links conflicts.
    pub fn collocated(n: usize) -> Self {
        Self::from_relation(n, |_, _| true)
    }

    /// Links `i` and `j` conflict when `|i - j| <= radius`.
    pub fn line(n: usize, radius: usize) -> Self {
        Self::from_relation(n, |i, j| i.abs_diff(j) <= radius)
    }

    /// Links on a ring conflict when their circular distance is `<= radius`.
    pub fn cycle(n: usize, radius: usize) -> Self {
        Self::from_relation(n, |i, j| {
            let d = i.abs_diff(j);
            d.min(n - d) <= radius
        })
    }

    /// Links at `positions` conflict when their Euclidean distance is
    /// `<= radius`.
    pub fn unit_disk(positions: &[[f64; 2]], radius: f64) -> Self {
        Self::from_relation(positions.len(), |i, j| {
            let dx = positions[i][0] - positions[j][0];
            let dy = positions[i][1] - positions[j][1];
            (dx * dx + dy * dy).sqrt() <= radius
        })
    }

    pub fn link_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn conflicts(&self, i: usize, j: usize) -> bool {
        self.adjacency[i][j]
    }

    /// All maximal independent sets, each as an ascending list of links,
    /// sorted lexicographically.
    pub fn maximal_independent_sets(&self) -> Vec<Vec<usize>> {
        let n = self.link_count();
        let mut out = Vec::new();
        let mut current = Vec::new();
        self.bron_kerbosch(&mut current, (0..n).collect(), Vec::new(), &mut out);
        for set in &mut out {
            set.sort_unstable();
        }
        out.sort();
        out
    }

    /// `true` if `i` and `j` may be active together.
    fn compatible(&self, i: usize, j: usize) -> bool {
        i != j && !self.adjacency[i][j]
    }

    fn bron_kerbosch(
        &self,
        current: &mut Vec<usize>,
        mut candidates: Vec<usize>,
        mut excluded: Vec<usize>,
        out: &mut Vec<Vec<usize>>,
    ) {
        if candidates.is_empty() {
            if excluded.is_empty() {
                out.push(current.clone());
            }
            return;
        }

        // Pivot: the vertex covering the most candidates.
        let pivot = candidates
            .iter()
            .chain(excluded.iter())
            .copied()
            .max_by_key(|&u| candidates.iter().filter(|&&v| self.compatible(u, v)).count())
            .unwrap_or(candidates[0]);

        let branch: Vec<usize> = candidates
            .iter()
            .copied()
            .filter(|&v| !self.compatible(pivot, v))
            .collect();

        for v in branch {
            let next_candidates = candidates
                .iter()
                .copied()
                .filter(|&u| self.compatible(v, u))
                .collect();
            let next_excluded = excluded
                .iter()
                .copied()
                .filter(|&u| self.compatible(v, u))
                .collect();
            current.push(v);
            self.bron_kerbosch(current, next_candidates, next_excluded, out);
            current.pop();
            candidates.retain(|&u| u != v);
            excluded.push(v);
        }
    }

    /// Convert the maximal independent sets into a [`ConflictModel`].
    ///
    /// # Errors
    /// [`QueueingError::EmptyConflictModel`] for a graph with no links.
    pub fn to_conflict_model(&self) -> Result<ConflictModel, QueueingError> {
        let n = self.link_count();
        if n == 0 {
            return Err(QueueingError::EmptyConflictModel);
        }
        let rows: Vec<Vec<bool>> = self
            .maximal_independent_sets()
            .into_iter()
            .map(|set| {
                let mut row = vec![false; n];
                for link in set {
                    row[link] = true;
                }
                row
            })
            .collect();
        debug!(links = n, rows = rows.len(), "conflict model generated");
        ConflictModel::new(rows)
    }
}

/// Interference radius of a `line` or `cycle` network, in hops.
///
/// # Errors
/// [`QueueingError::InvalidRadius`] unless `interference_radius` is a
/// non-negative whole number.
pub fn hop_radius(interference_radius: f64) -> Result<usize, QueueingError> {
    if interference_radius < 0.0 || interference_radius.fract() != 0.0 {
        return Err(QueueingError::InvalidRadius {
            radius: interference_radius,
        });
    }
    Ok(interference_radius as usize)
}

/// Build the conflict model for `network_type`.
///
/// `positions` is only read for [`NetworkType::UnitDisk`], where it must hold
/// one point per link and `interference_radius` is a Euclidean distance.  For
/// `line` and `cycle` the radius counts hops (see [`hop_radius`]).
///
/// # Errors
/// * [`QueueingError::EmptyConflictModel`]: `network_size == 0`.
/// * [`QueueingError::LinkCountMismatch`]: unit-disk positions do not match
///   `network_size`.
/// * [`QueueingError::InvalidRadius`]: fractional or negative hop radius.
pub fn build_conflict_model(
    network_type: NetworkType,
    network_size: usize,
    interference_radius: f64,
    positions: &[[f64; 2]],
) -> Result<ConflictModel, QueueingError> {
    let graph = match network_type {
        NetworkType::Collocated => ConflictGraph::collocated(network_size),
        NetworkType::Line => ConflictGraph::line(network_size, hop_radius(interference_radius)?),
        NetworkType::Cycle => ConflictGraph::cycle(network_size, hop_radius(interference_radius)?),
        NetworkType::UnitDisk => {
            if positions.len() != network_size {
                return Err(QueueingError::LinkCountMismatch {
                    what: "positions",
                    expected: network_size,
                    found: positions.len(),
                });
            }
            ConflictGraph::unit_disk(positions, interference_radius)
        }
    };
    graph.to_conflict_model()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collocated_allows_one_link_at_a_time() {
        let sets = ConflictGraph::collocated(3).maximal_independent_sets();
        assert_eq!(sets, vec![vec![0], vec![1], vec![2]]);
    }

    #[test]
    fn line_radius_one() {
        // 0 - 1 - 2 : {0, 2} and {1}
        let sets = ConflictGraph::line(3, 1).maximal_independent_sets();
        assert_eq!(sets, vec![vec![0, 2], vec![1]]);
    }

    #[test]
    fn line_radius_zero_is_interference_free() {
        let sets = ConflictGraph::line(4, 0).maximal_independent_sets();
        assert_eq!(sets, vec![vec![0, 1, 2, 3]]);
    }

    #[test]
    fn cycle_of_four() {
        let sets = ConflictGraph::cycle(4, 1).maximal_independent_sets();
        assert_eq!(sets, vec![vec![0, 2], vec![1, 3]]);
    }

    #[test]
    fn cycle_wraps_around() {
        let g = ConflictGraph::cycle(5, 1);
        assert!(g.conflicts(0, 4));
        assert!(!g.conflicts(0, 2));
        // five-cycle has five maximal independent sets, each of size 2
        let sets = g.maximal_independent_sets();
        assert_eq!(sets.len(), 5);
        assert!(sets.iter().all(|s| s.len() == 2));
    }

    #[test]
    fn unit_disk_uses_euclidean_distance() {
        let positions = [[0.0, 0.0], [1.0, 0.0], [3.0, 0.0]];
        let g = ConflictGraph::unit_disk(&positions, 1.5);
        assert!(g.conflicts(0, 1));
        assert!(!g.conflicts(1, 2));
        assert_eq!(g.maximal_independent_sets(), vec![vec![0, 2], vec![1, 2]]);
    }

    #[test]
    fn build_line_model() {
        let m = build_conflict_model(NetworkType::Line, 3, 1.0, &[]).unwrap();
        assert_eq!(m.network_size(), 3);
        assert_eq!(
            m.rows(),
            &[vec![true, false, true], vec![false, true, false]]
        );
    }

    #[test]
    fn unit_disk_requires_one_position_per_link() {
        let err = build_conflict_model(NetworkType::UnitDisk, 3, 1.0, &[[0.0, 0.0]]).unwrap_err();
        assert!(matches!(
            err,
            QueueingError::LinkCountMismatch {
                expected: 3,
                found: 1,
                ..
            }
        ));
    }

    #[test]
    fn fractional_hop_radius_is_rejected() {
        for network_type in [NetworkType::Line, NetworkType::Cycle] {
            let err = build_conflict_model(network_type, 4, 1.9, &[]).unwrap_err();
            assert!(matches!(err, QueueingError::InvalidRadius { radius } if radius == 1.9));
        }
        assert!(hop_radius(-1.0).is_err());
        assert_eq!(hop_radius(2.0).unwrap(), 2);
        // Unit-disk radii are distances and may be fractional.
        let m = build_conflict_model(NetworkType::UnitDisk, 2, 1.5, &[[0.0, 0.0], [1.0, 0.0]]);
        assert_eq!(m.unwrap().rows().len(), 2);
    }

    #[test]
    fn zero_links_is_empty_model() {
        assert!(matches!(
            build_conflict_model(NetworkType::Collocated, 0, 0.0, &[]),
            Err(QueueingError::EmptyConflictModel)
        ));
    }

    #[test]
    fn every_row_is_conflict_free() {
        let g = ConflictGraph::cycle(7, 2);
        for set in g.maximal_independent_sets() {
            for &a in &set {
                for &b in &set {
                    assert!(a == b || !g.conflicts(a, b));
                }
            }
        }
    }
}
