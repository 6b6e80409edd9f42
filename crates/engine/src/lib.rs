// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Distributed locking and collection reclamation over a shared store

mod error;
#[cfg(unix)]
mod guard;
mod mutex;
mod reclaim;

#[cfg(unix)]
pub use error::GuardError;
pub use error::{LockError, ReclaimError};
#[cfg(unix)]
pub use guard::{Outcome, SignalGuard, DEFAULT_SIGNALS};
pub use mutex::{Mutex, MutexOptions, DEFAULT_POLL_INTERVAL};
pub use reclaim::{
    reclaim_hash, reclaim_list, reclaim_set, reclaim_sorted_set, ReclaimReport, Reclaimer,
};

#[cfg(unix)]
pub use nix::sys::signal::Signal;
