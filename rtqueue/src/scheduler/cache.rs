/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Cross-tick lookahead cache used by the `ldf-vision` policy.
//!
//! The cache maps a scheduling state signature to the activation vector chosen
//! the last time that signature was seen.  The signature holds:
//!
//! * the deficit *rank* of every backlogged link (dense rank, 0 = largest
//!   deficit, equal deficits share a rank; idle links have no rank),
//! * the activation chosen in the previous sub-round.
//!
//! An LDF schedule depends only on how deficits compare, not on their
//! magnitude, so a cached activation is always a valid LDF choice for any state
//! with the same signature.  Reusing it pins down how equal-deficit ties were
//! resolved after the same recent schedule.
//!
//! The map holds at most `capacity` signatures; the oldest one is evicted
//! first.
//!
//! The cache is owned by whoever drives the ticks and is handed to
//! [`QueueingSystem::depart`](crate::queueing::QueueingSystem::depart) by
//! `&mut`; no other policy touches it.

use std::collections::{HashMap, VecDeque};

/// Signatures kept by [`ScheduleCache::new`].
pub const DEFAULT_CAPACITY: usize = 1024;

/// State signature: backlogged deficit ranks and the previous activation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StateKey {
    ranks: Vec<Option<usize>>,
    previous: Vec<bool>,
}

impl StateKey {
    /// `deficits` and `backlogged` are indexed by link; `previous` is the last
    /// activation (empty before the first one).
    pub fn new(deficits: &[u64], backlogged: &[bool], previous: &[bool]) -> Self {
        let mut levels: Vec<u64> = deficits
            .iter()
            .zip(backlogged)
            .filter(|(_, &b)| b)
            .map(|(&d, _)| d)
            .collect();
        levels.sort_unstable_by(|a, b| b.cmp(a));
        levels.dedup();

        let ranks = deficits
            .iter()
            .zip(backlogged)
            .map(|(d, &b)| b.then(|| levels.partition_point(|l| l > d)))
            .collect();
        Self {
            ranks,
            previous: previous.to_vec(),
        }
    }
}

/// Bounded memo of past schedules keyed by [`StateKey`].
#[derive(Debug)]
pub struct ScheduleCache {
    map: HashMap<StateKey, Vec<bool>>,
    /// Insertion order, oldest first.
    order: VecDeque<StateKey>,
    capacity: usize,
    previous: Vec<bool>,
    hits: u64,
    misses: u64,
}

impl Default for ScheduleCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl ScheduleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache holding at most `capacity` signatures (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
            previous: Vec::new(),
            hits: 0,
            misses: 0,
        }
    }

    /// Cached activation for `key`, counting the lookup as a hit or miss.
    pub fn lookup(&mut self, key: &StateKey) -> Option<&Vec<bool>> {
        match self.map.get(key) {
            Some(v) => {
                self.hits += 1;
                Some(v)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Store `activation` under `key`, evicting the oldest signature when full.
    pub fn record(&mut self, key: StateKey, activation: Vec<bool>) {
        if !self.map.contains_key(&key) {
            if self.map.len() >= self.capacity {
                if let Some(oldest) = self.order.pop_front() {
                    self.map.remove(&oldest);
                }
            }
            self.order.push_back(key.clone());
        }
        self.map.insert(key, activation);
    }

    /// Activation chosen in the previous sub-round.
    pub fn previous(&self) -> &[bool] {
        &self.previous
    }

    pub fn remember(&mut self, activation: &[bool]) {
        self.previous = activation.to_vec();
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_then_hit() {
        let mut cache = ScheduleCache::new();
        let key = StateKey::new(&[1, 2], &[true, true], &[]);
        assert!(cache.lookup(&key).is_none());
        cache.record(key.clone(), vec![false, true]);
        assert_eq!(cache.lookup(&key), Some(&vec![false, true]));
        assert_eq!((cache.hits(), cache.misses()), (1, 1));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn key_depends_on_deficit_order_not_magnitude() {
        assert_eq!(
            StateKey::new(&[5, 3, 5], &[true; 3], &[]),
            StateKey::new(&[40_000, 2, 40_000], &[true; 3], &[])
        );
        assert_ne!(
            StateKey::new(&[5, 3], &[true; 2], &[]),
            StateKey::new(&[3, 5], &[true; 2], &[])
        );
        assert_ne!(
            StateKey::new(&[5, 5], &[true; 2], &[]),
            StateKey::new(&[5, 4], &[true; 2], &[])
        );
    }

    #[test]
    fn idle_links_carry_no_rank() {
        assert_eq!(
            StateKey::new(&[9, 1], &[false, true], &[]),
            StateKey::new(&[0, 7], &[false, true], &[])
        );
        assert_ne!(
            StateKey::new(&[1, 1], &[true, true], &[]),
            StateKey::new(&[1, 1], &[true, false], &[])
        );
    }

    #[test]
    fn previous_activation_is_part_of_the_key() {
        let mut cache = ScheduleCache::new();
        cache.record(StateKey::new(&[1, 1], &[true, true], &[true, false]), vec![false, true]);
        assert!(cache
            .lookup(&StateKey::new(&[1, 1], &[true, true], &[false, true]))
            .is_none());

        cache.remember(&[true, false]);
        let key = StateKey::new(&[1, 1], &[true, true], cache.previous());
        assert_eq!(cache.lookup(&key), Some(&vec![false, true]));
    }

    #[test]
    fn oldest_signature_is_evicted_at_capacity() {
        let mut cache = ScheduleCache::with_capacity(2);
        let keys: Vec<StateKey> = [[true, false], [false, true], [true, true]]
            .iter()
            .map(|prev| StateKey::new(&[1, 1], &[true, true], prev))
            .collect();
        for key in &keys {
            cache.record(key.clone(), vec![true, false]);
        }
        assert_eq!(cache.len(), 2);
        assert!(cache.lookup(&keys[0]).is_none());
        assert!(cache.lookup(&keys[2]).is_some());

        // Re-recording a present key does not evict.
        cache.record(keys[2].clone(), vec![false, true]);
        assert_eq!(cache.len(), 2);
        assert!(cache.lookup(&keys[1]).is_some());
    }
}
