/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Packet value type and the per-tick traffic batch.
//!
//! ```text
//! traffic generator ──(Traffic)──► QueueingSystem::arrive ──► per-link queue
//!                                                   depart ◄──┘  │
//!                                              clock_tick (expiry)┘
//! ```
//!
//! A [`Packet`] is immutable once created.  It leaves its queue either when a
//! scheduling sub-round serves it or when the clock passes its deadline.

use crate::names::IntraLinkOrder;

/// One batch of newly arrived packets per link, indexed by link.
pub type Traffic = Vec<Vec<Packet>>;

/// A packet with its birth tick and absolute deadline (both inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet {
    birth_tick: i64,
    deadline: i64,
}

impl Packet {
    pub fn new(birth_tick: i64, deadline: i64) -> Self {
        Self {
            birth_tick,
            deadline,
        }
    }

    /// Build a packet born at `birth_tick` that may wait `delay_bound` ticks,
    /// counting the birth tick itself.
    pub fn with_delay_bound(birth_tick: i64, delay_bound: i64) -> Self {
        Self::new(birth_tick, birth_tick + delay_bound - 1)
    }

    pub fn birth_tick(&self) -> i64 {
        self.birth_tick
    }

    pub fn deadline(&self) -> i64 {
        self.deadline
    }

    /// `deadline - birth_tick + 1`.
    pub fn delay_bound(&self) -> i64 {
        self.deadline - self.birth_tick + 1
    }

    /// Key under `order`; smaller keys leave the queue first.
    ///
    /// Returns `None` for [`IntraLinkOrder::Unordered`].
    pub fn order_key(&self, order: IntraLinkOrder) -> Option<i64> {
        match order {
            IntraLinkOrder::Deadline => Some(self.deadline),
            IntraLinkOrder::DelayBound => Some(self.delay_bound()),
            IntraLinkOrder::Unordered => None,
        }
    }

    /// `true` once `tick` is past the deadline.
    pub fn is_expired(&self, tick: i64) -> bool {
        self.deadline < tick
    }
}
