//! Scheduling policy dispatcher.
//!
//! [`select_activation`] implements nine interchangeable policies behind one
//! contract: given the per-link view of the queues, the tick-start deficit
//! snapshot and the [`ConflictModel`], return an activation vector that the
//! model accepts as feasible.
//!
//! # Policies
//!
//! | Policy | Eligible links | Priority (first = served first) |
//! |---|---|---|
//! | `ldf` | backlogged | deficit, descending |
//! | `edf` | backlogged | owes service, then head slack (`deadline - clock`, capped at max delay bound) |
//! | `sdbf` | backlogged | owes service, then head delay bound (capped at max delay bound) |
//! | `edf-naive` | backlogged | head deadline |
//! | `sdbf-naive` | backlogged | head delay bound |
//! | `maximal` | backlogged | none, tie-break order only |
//! | `ldf-threshold` | deficit/backlog ≥ threshold, or head expires this tick | head deadline |
//! | `ldf-vision` | as `ldf` | as `ldf`, ties pinned by [`ScheduleCache`] history |
//! | `max-deficit` | backlogged links of one row | row with the largest summed deficit |
//!
//! Every policy except `max-deficit` builds its set greedily: candidates are
//! put in [`TieBreak`] order, stably sorted by priority, then added through a
//! [`PatternBuilder`](crate::conflict::PatternBuilder) that skips any link
//! conflicting with those already chosen.  `max-deficit` scores whole rows
//! instead, so two equal-deficit links are separated by what else their rows
//! can serve rather than by link order.
//!
//! Only backlogged links are ever activated, so serving an active link always
//! removes a packet.

pub mod cache;

pub use cache::{ScheduleCache, StateKey};

use std::cmp::Reverse;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::trace;

use crate::conflict::ConflictModel;
use crate::names::{Policy, TieBreak};
use crate::packet::Packet;

// ── Per-link view ─────────────────────────────────────────────────────────────

/// What a policy may see of one link's queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LinkView {
    /// Number of queued packets.
    pub backlog: usize,
    /// Smallest deadline in the queue.
    pub head_deadline: Option<i64>,
    /// Smallest delay bound in the queue.
    pub head_delay_bound: Option<i64>,
}

impl LinkView {
    pub fn from_packets(packets: &[Packet]) -> Self {
        Self {
            backlog: packets.len(),
            head_deadline: packets.iter().map(Packet::deadline).min(),
            head_delay_bound: packets.iter().map(Packet::delay_bound).min(),
        }
    }

    pub fn is_backlogged(&self) -> bool {
        self.backlog > 0
    }
}

// ── Sub-round context ─────────────────────────────────────────────────────────

/// Inputs of one scheduling sub-round.
///
/// `deficits` is the tick-start snapshot: it is identical for every sub-round
/// of a tick.
#[derive(Debug, Clone, Copy)]
pub struct SlotContext<'a> {
    pub links: &'a [LinkView],
    pub deficits: &'a [u64],
    pub model: &'a ConflictModel,
    pub clock: i64,
    pub max_delay_bound: i64,
    pub threshold_ratio: f64,
    pub tie_break: TieBreak,
}

impl SlotContext<'_> {
    fn network_size(&self) -> usize {
        self.links.len()
    }

    fn backlog_mask(&self) -> Vec<bool> {
        self.links.iter().map(LinkView::is_backlogged).collect()
    }

    /// Slack of the most urgent packet, capped at the max delay bound.
    fn head_slack(&self, link: usize) -> i64 {
        self.links[link]
            .head_deadline
            .map(|d| (d - self.clock).min(self.max_delay_bound))
            .unwrap_or(self.max_delay_bound)
    }

    fn head_delay_bound(&self, link: usize) -> i64 {
        self.links[link]
            .head_delay_bound
            .map(|d| d.min(self.max_delay_bound))
            .unwrap_or(self.max_delay_bound)
    }

    fn head_deadline(&self, link: usize) -> i64 {
        self.links[link].head_deadline.unwrap_or(i64::MAX)
    }

    /// Threshold gate: the link owes at least `threshold_ratio` of its backlog
    /// in deficit, or its most urgent packet expires at the end of this tick.
    fn passes_threshold(&self, link: usize) -> bool {
        let view = &self.links[link];
        let deficit = self.deficits[link];
        let owes = deficit > 0 && deficit as f64 >= self.threshold_ratio * view.backlog as f64;
        let expiring = view.head_deadline.is_some_and(|d| d <= self.clock);
        owes || expiring
    }
}

// ── Dispatch ──────────────────────────────────────────────────────────────────

/// Choose the links served in one sub-round under `policy`.
///
/// `cache` is read and written only by [`Policy::LdfVision`].
pub fn select_activation<R: Rng + ?Sized>(
    policy: Policy,
    ctx: &SlotContext<'_>,
    rng: &mut R,
    cache: &mut ScheduleCache,
) -> Vec<bool> {
    let activation = match policy {
        Policy::Ldf => ldf(ctx, rng),
        Policy::Edf => greedy(ctx, rng, |_| true, |i| (ctx.deficits[i] == 0, ctx.head_slack(i))),
        Policy::Sdbf => greedy(
            ctx,
            rng,
            |_| true,
            |i| (ctx.deficits[i] == 0, ctx.head_delay_bound(i)),
        ),
        Policy::EdfNaive => greedy(ctx, rng, |_| true, |i| ctx.head_deadline(i)),
        Policy::SdbfNaive => greedy(ctx, rng, |_| true, |i| ctx.head_delay_bound(i)),
        Policy::Maximal => greedy(ctx, rng, |_| true, |_| ()),
        Policy::LdfThreshold => greedy(
            ctx,
            rng,
            |i| ctx.passes_threshold(i),
            |i| ctx.head_deadline(i),
        ),
        Policy::LdfVision => ldf_vision(ctx, rng, cache),
        Policy::MaxDeficit => max_deficit(ctx, rng),
    };

    trace!(
        policy = %policy,
        clock = ctx.clock,
        activation = ?activation,
        "sub-round activation"
    );
    activation
}

/// Greedy maximal set over eligible backlogged links ordered by `key`.
fn greedy<R, K, E, F>(ctx: &SlotContext<'_>, rng: &mut R, eligible: E, key: F) -> Vec<bool>
where
    R: Rng + ?Sized,
    K: Ord,
    E: Fn(usize) -> bool,
    F: Fn(usize) -> K,
{
    let mut order: Vec<usize> = (0..ctx.network_size())
        .filter(|&i| ctx.links[i].is_backlogged() && eligible(i))
        .collect();
    if ctx.tie_break == TieBreak::Random {
        order.shuffle(rng);
    }
    // Stable: ties keep the tie-break order.
    order.sort_by_key(|&i| key(i));

    let mut builder = ctx.model.builder();
    for link in order {
        builder.try_add(link);
    }
    builder.finish()
}

fn ldf<R: Rng + ?Sized>(ctx: &SlotContext<'_>, rng: &mut R) -> Vec<bool> {
    greedy(ctx, rng, |_| true, |i| Reverse(ctx.deficits[i]))
}

fn ldf_vision<R: Rng + ?Sized>(
    ctx: &SlotContext<'_>,
    rng: &mut R,
    cache: &mut ScheduleCache,
) -> Vec<bool> {
    let key = StateKey::new(ctx.deficits, &ctx.backlog_mask(), cache.previous());
    let activation = match cache.lookup(&key).cloned() {
        Some(cached) => cached,
        None => {
            let activation = ldf(ctx, rng);
            cache.record(key, activation.clone());
            activation
        }
    };
    cache.remember(&activation);
    activation
}

/// Row of the conflict model with the largest summed deficit over its
/// backlogged links, ties broken by the number of backlogged links it serves
/// and then by the tie-break rule.
fn max_deficit<R: Rng + ?Sized>(ctx: &SlotContext<'_>, rng: &mut R) -> Vec<bool> {
    let scores: Vec<(u64, usize)> = ctx
        .model
        .rows()
        .iter()
        .map(|row| {
            row.iter()
                .zip(ctx.links)
                .zip(ctx.deficits)
                .filter(|((&allowed, view), _)| allowed && view.is_backlogged())
                .fold((0u64, 0usize), |(w, c), (_, &d)| (w + d, c + 1))
        })
        .collect();

    let Some(best) = scores.iter().copied().max() else {
        return vec![false; ctx.network_size()];
    };
    let tied: Vec<usize> = scores
        .iter()
        .enumerate()
        .filter(|(_, &s)| s == best)
        .map(|(r, _)| r)
        .collect();
    let chosen = match ctx.tie_break {
        TieBreak::LinkIndex => tied[0],
        TieBreak::Random => tied[rng.gen_range(0..tied.len())],
    };

    ctx.model.rows()[chosen]
        .iter()
        .zip(ctx.links)
        .map(|(&allowed, view)| allowed && view.is_backlogged())
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    // ── Test helpers ──────────────────────────────────────────────────────────

    const ALL_POLICIES: [Policy; 9] = [
        Policy::Ldf,
        Policy::Edf,
        Policy::Sdbf,
        Policy::EdfNaive,
        Policy::SdbfNaive,
        Policy::Maximal,
        Policy::LdfThreshold,
        Policy::LdfVision,
        Policy::MaxDeficit,
    ];

    fn exclusive_pair() -> ConflictModel {
        ConflictModel::new(vec![vec![true, false], vec![false, true]]).unwrap()
    }

    /// Three-link line: {0, 2} or {1}.
    fn line3() -> ConflictModel {
        ConflictModel::new(vec![vec![true, false, true], vec![false, true, false]]).unwrap()
    }

    fn view(packets: &[(i64, i64)]) -> LinkView {
        let p: Vec<Packet> = packets.iter().map(|&(b, d)| Packet::new(b, d)).collect();
        LinkView::from_packets(&p)
    }

    fn ctx<'a>(
        links: &'a [LinkView],
        deficits: &'a [u64],
        model: &'a ConflictModel,
    ) -> SlotContext<'a> {
        SlotContext {
            links,
            deficits,
            model,
            clock: 0,
            max_delay_bound: 10,
            threshold_ratio: 0.5,
            tie_break: TieBreak::LinkIndex,
        }
    }

    fn run(policy: Policy, c: &SlotContext<'_>) -> Vec<bool> {
        let mut rng = StdRng::seed_from_u64(7);
        let mut cache = ScheduleCache::new();
        select_activation(policy, c, &mut rng, &mut cache)
    }

    // ── LinkView ──────────────────────────────────────────────────────────────

    #[test]
    fn link_view_tracks_minimum_keys() {
        let v = view(&[(0, 9), (3, 4), (1, 5)]);
        assert_eq!(v.backlog, 3);
        assert_eq!(v.head_deadline, Some(4));
        assert_eq!(v.head_delay_bound, Some(2));
        assert_eq!(LinkView::from_packets(&[]), LinkView::default());
    }

    // ── Contract shared by every policy ───────────────────────────────────────

    #[test]
    fn every_policy_returns_a_feasible_backlogged_set() {
        let model = line3();
        let links = [view(&[(0, 3)]), view(&[(0, 1), (0, 2)]), view(&[(0, 0)])];
        let deficits = [2, 5, 1];
        for policy in ALL_POLICIES {
            for tie_break in [TieBreak::LinkIndex, TieBreak::Random] {
                let mut c = ctx(&links, &deficits, &model);
                c.tie_break = tie_break;
                let a = run(policy, &c);
                assert!(model.is_feasible(&a), "{policy}: infeasible {a:?}");
                for (i, &active) in a.iter().enumerate() {
                    assert!(!active || links[i].is_backlogged());
                }
            }
        }
    }

    #[test]
    fn empty_queues_activate_nothing() {
        let model = exclusive_pair();
        let links = [LinkView::default(), LinkView::default()];
        let deficits = [3, 4];
        for policy in ALL_POLICIES {
            assert_eq!(run(policy, &ctx(&links, &deficits, &model)), vec![false, false]);
        }
    }

    // ── Individual policies ───────────────────────────────────────────────────

    #[test]
    fn ldf_serves_larger_deficit() {
        let model = exclusive_pair();
        let links = [view(&[(0, 5)]), view(&[(0, 5)])];
        assert_eq!(run(Policy::Ldf, &ctx(&links, &[1, 3], &model)), vec![false, true]);
        assert_eq!(run(Policy::Ldf, &ctx(&links, &[4, 3], &model)), vec![true, false]);
    }

    #[test]
    fn ldf_link_index_tie_break_prefers_lower_index() {
        let model = exclusive_pair();
        let links = [view(&[(0, 5)]), view(&[(0, 5)])];
        assert_eq!(run(Policy::Ldf, &ctx(&links, &[2, 2], &model)), vec![true, false]);
    }

    #[test]
    fn ldf_fills_remaining_compatible_links() {
        let model = line3();
        let links = [view(&[(0, 5)]), view(&[(0, 5)]), view(&[(0, 5)])];
        // link 0 wins, link 1 conflicts, link 2 shares the row
        assert_eq!(
            run(Policy::Ldf, &ctx(&links, &[5, 4, 0], &model)),
            vec![true, false, true]
        );
    }

    #[test]
    fn edf_prefers_links_that_owe_service() {
        let model = exclusive_pair();
        // link 0 has the earlier deadline but owes nothing
        let links = [view(&[(0, 1)]), view(&[(0, 4)])];
        assert_eq!(run(Policy::Edf, &ctx(&links, &[0, 1], &model)), vec![false, true]);
        assert_eq!(run(Policy::Edf, &ctx(&links, &[1, 1], &model)), vec![true, false]);
    }

    #[test]
    fn edf_naive_ignores_deficit() {
        let model = exclusive_pair();
        let links = [view(&[(0, 1)]), view(&[(0, 4)])];
        assert_eq!(
            run(Policy::EdfNaive, &ctx(&links, &[0, 9], &model)),
            vec![true, false]
        );
    }

    #[test]
    fn sdbf_orders_by_delay_bound() {
        let model = exclusive_pair();
        // link 0: delay bound 5 (deadline 6); link 1: delay bound 2 (deadline 7)
        let links = [view(&[(2, 6)]), view(&[(6, 7)])];
        assert_eq!(run(Policy::Sdbf, &ctx(&links, &[1, 1], &model)), vec![false, true]);
        assert_eq!(run(Policy::Sdbf, &ctx(&links, &[1, 0], &model)), vec![true, false]);
        assert_eq!(
            run(Policy::SdbfNaive, &ctx(&links, &[1, 0], &model)),
            vec![false, true]
        );
    }

    #[test]
    fn maximal_uses_tie_break_order_only() {
        let model = exclusive_pair();
        let links = [view(&[(0, 9)]), view(&[(0, 0)])];
        assert_eq!(
            run(Policy::Maximal, &ctx(&links, &[0, 9], &model)),
            vec![true, false]
        );
    }

    #[test]
    fn threshold_gate_excludes_links_below_ratio() {
        let model = ConflictModel::new(vec![vec![true, true]]).unwrap();
        // link 0: deficit 1 over backlog 4 (0.25 < 0.5); link 1: 2 over 2
        let links = [
            view(&[(0, 5), (0, 5), (0, 5), (0, 5)]),
            view(&[(0, 5), (0, 5)]),
        ];
        assert_eq!(
            run(Policy::LdfThreshold, &ctx(&links, &[1, 2], &model)),
            vec![false, true]
        );
    }

    #[test]
    fn threshold_gate_admits_expiring_head() {
        let model = ConflictModel::new(vec![vec![true, true]]).unwrap();
        let links = [view(&[(0, 0)]), view(&[(0, 5)])];
        assert_eq!(
            run(Policy::LdfThreshold, &ctx(&links, &[0, 0], &model)),
            vec![true, false]
        );
    }

    #[test]
    fn max_deficit_scores_whole_rows() {
        let model = line3();
        let links = [view(&[(0, 5)]), view(&[(0, 5)]), view(&[(0, 5)])];
        // ldf would start with link 1 (deficit 4); row {0, 2} sums to 6
        let deficits = [3, 4, 3];
        assert_eq!(
            run(Policy::Ldf, &ctx(&links, &deficits, &model)),
            vec![false, true, false]
        );
        assert_eq!(
            run(Policy::MaxDeficit, &ctx(&links, &deficits, &model)),
            vec![true, false, true]
        );
    }

    #[test]
    fn max_deficit_equal_weight_prefers_row_serving_more_links() {
        let model = line3();
        let links = [view(&[(0, 5)]), view(&[(0, 5)]), view(&[(0, 5)])];
        assert_eq!(
            run(Policy::MaxDeficit, &ctx(&links, &[2, 2, 0], &model)),
            vec![true, false, true]
        );
    }

    #[test]
    fn ldf_vision_settles_into_cached_schedules() {
        let model = exclusive_pair();
        let links = [view(&[(0, 5)]), view(&[(0, 5)])];
        let deficits = [2, 2];
        let c = SlotContext {
            tie_break: TieBreak::Random,
            ..ctx(&links, &deficits, &model)
        };
        let mut rng = StdRng::seed_from_u64(1);
        let mut cache = ScheduleCache::new();
        let picks: Vec<Vec<bool>> = (0..21)
            .map(|_| select_activation(Policy::LdfVision, &c, &mut rng, &mut cache))
            .collect();
        // Signatures differ only in the previous activation: none, {0} or {1}.
        assert!(cache.len() <= 3);
        assert!(cache.misses() <= 3);
        assert_eq!(cache.hits() + cache.misses(), 21);
        // Same previous activation, same pick.
        for pair in picks.windows(2) {
            let first = picks.windows(2).find(|w| w[0] == pair[0]).unwrap();
            assert_eq!(pair[1], first[1]);
        }
        assert!(picks.iter().all(|a| a.iter().filter(|&&x| x).count() == 1));
    }

    #[test]
    fn ldf_vision_ignores_deficit_magnitude() {
        let model = exclusive_pair();
        let links = [view(&[(0, 5)]), view(&[(0, 5)])];
        let mut rng = StdRng::seed_from_u64(4);
        let mut cache = ScheduleCache::new();
        for d in [3u64, 30, 300, 3_000] {
            let deficits = [d, d + 1];
            let c = ctx(&links, &deficits, &model);
            let a = select_activation(Policy::LdfVision, &c, &mut rng, &mut cache);
            assert_eq!(a, vec![false, true]);
        }
        // First call has no previous activation, the rest share one signature.
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.hits(), 2);
    }

    #[test]
    fn random_tie_break_reaches_both_links() {
        let model = exclusive_pair();
        let links = [view(&[(0, 5)]), view(&[(0, 5)])];
        let deficits = [1, 1];
        let c = SlotContext {
            tie_break: TieBreak::Random,
            ..ctx(&links, &deficits, &model)
        };
        let mut rng = StdRng::seed_from_u64(3);
        let mut cache = ScheduleCache::new();
        let mut seen = [false, false];
        for _ in 0..64 {
            let a = select_activation(Policy::Ldf, &c, &mut rng, &mut cache);
            seen[0] |= a[0];
            seen[1] |= a[1];
        }
        assert_eq!(seen, [true, true]);
    }
}
