// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock token generation
//!
//! A token identifies one acquisition of a lock. It is written as the lock
//! key's value and compared before release, so it must never repeat across
//! acquisitions that could overlap.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Produces a fresh token per acquisition attempt
pub trait TokenSource: Clone + Send + Sync + 'static {
    fn next_token(&self) -> String;
}

/// Random UUID v4 tokens
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidTokens;

impl TokenSource for UuidTokens {
    fn next_token(&self) -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }
}

/// Predictable `<prefix>-<n>` tokens for tests
#[derive(Clone, Debug)]
pub struct SequentialTokens {
    prefix: String,
    counter: Arc<AtomicU64>,
}

impl SequentialTokens {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl Default for SequentialTokens {
    fn default() -> Self {
        Self::new("token")
    }
}

impl TokenSource for SequentialTokens {
    fn next_token(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("{}-{}", self.prefix, n)
    }
}
