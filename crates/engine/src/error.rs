// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for locking, signal guarding and reclamation

use lk_adapters::StoreError;
use lk_core::CollectionKind;
use thiserror::Error;

/// Errors from lock operations
///
/// Failing to get the lock is not an error: `acquire` returns `Ok(false)`.
#[derive(Debug, Error)]
pub enum LockError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("lock {0} is already held by this instance")]
    AlreadyAcquired(String),
}

/// Errors from a signal-guarded critical section
#[cfg(unix)]
#[derive(Debug, Error)]
pub enum GuardError {
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error("failed to install signal handler: {0}")]
    Signal(#[from] nix::Error),
    #[error("signal wake-up channel failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from collection reclamation
#[derive(Debug, Error)]
pub enum ReclaimError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("{key} holds a {found}, not a {expected}")]
    WrongType {
        key: String,
        expected: CollectionKind,
        found: String,
    },
}
