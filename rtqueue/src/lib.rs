/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! rtqueue – deficit-based real-time link scheduling simulator
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── packet         – packet value type, per-tick traffic batch
//! ├── names          – policy / topology / arrival name tables
//! ├── conflict/      – conflict model, topology → maximal schedules
//! ├── scheduler/     – nine scheduling policies, lookahead cache
//! ├── queueing       – per-link queues, deficit ledger, stability windows
//! ├── traffic        – arrival distributions
//! ├── config/        – YAML simulation configuration
//! └── simulator      – tick driver and result files
//! ```

pub mod config;
pub mod conflict;
pub mod error;
pub mod names;
pub mod packet;
pub mod queueing;
pub mod scheduler;
pub mod simulator;
pub mod traffic;

pub use error::QueueingError;
