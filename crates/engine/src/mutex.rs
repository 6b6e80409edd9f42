// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Distributed mutual-exclusion lock
//!
//! A lock is a single key whose value is the holder's token. Acquisition is
//! `SET NX` with an optional lease, and release deletes the key only when it
//! still holds our token, so a holder whose lease ran out never removes a
//! successor's lock.

use crate::error::LockError;
use lk_adapters::StoreClient;
use lk_core::{KeyNamer, LockConfig, TokenSource, UuidTokens};
use std::future::Future;
use std::time::Duration;

/// Default delay between blocking acquisition attempts
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How a [`Mutex`] acquires
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutexOptions {
    /// Store-side expiry for the lock key. `None` holds until released.
    pub lease: Option<Duration>,
    pub poll_interval: Duration,
    /// Retry until acquired (or `blocking_timeout`) instead of trying once
    pub blocking: bool,
    /// Give up after this long. `None` waits forever.
    pub blocking_timeout: Option<Duration>,
}

impl Default for MutexOptions {
    fn default() -> Self {
        Self {
            lease: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            blocking: true,
            blocking_timeout: None,
        }
    }
}

impl From<&LockConfig> for MutexOptions {
    fn from(config: &LockConfig) -> Self {
        Self {
            lease: config.lease,
            poll_interval: config.poll_interval,
            blocking: config.blocking,
            blocking_timeout: config.blocking_timeout,
        }
    }
}

/// A named lock held through a [`StoreClient`]
pub struct Mutex<S, T: TokenSource = UuidTokens> {
    store: S,
    tokens: T,
    name: String,
    key: String,
    options: MutexOptions,
    token: Option<String>,
    /// Token of an attempt whose SET may have landed without us seeing the
    /// reply (the acquire future was dropped or the store call failed)
    pending: Option<String>,
}

impl<S: StoreClient> Mutex<S, UuidTokens> {
    pub fn new(store: S, name: impl Into<String>, options: MutexOptions) -> Self {
        Self::with_namer(store, name, options, &KeyNamer::default())
    }

    /// Use custom key prefixes
    pub fn with_namer(
        store: S,
        name: impl Into<String>,
        options: MutexOptions,
        namer: &KeyNamer,
    ) -> Self {
        Self::with_tokens(store, name, options, namer, UuidTokens)
    }
}

impl<S: StoreClient, T: TokenSource> Mutex<S, T> {
    pub fn with_tokens(
        store: S,
        name: impl Into<String>,
        options: MutexOptions,
        namer: &KeyNamer,
        tokens: T,
    ) -> Self {
        let name = name.into();
        let key = namer.lock_key(&name);
        Self {
            store,
            tokens,
            name,
            key,
            options,
            token: None,
            pending: None,
        }
    }

    /// Try to take the lock.
    ///
    /// Returns `Ok(false)` when a non-blocking attempt finds the lock held,
    /// or when `blocking_timeout` passes first.
    pub async fn acquire(&mut self) -> Result<bool, LockError> {
        if self.token.is_some() {
            return Err(LockError::AlreadyAcquired(self.name.clone()));
        }

        let token = self.tokens.next_token();
        self.pending = Some(token.clone());
        let deadline = self
            .options
            .blocking_timeout
            .map(|timeout| tokio::time::Instant::now() + timeout);
        let mut attempts: u64 = 0;

        loop {
            attempts += 1;
            if self
                .store
                .set_if_absent(&self.key, &token, self.options.lease)
                .await?
            {
                tracing::info!(lock = %self.name, key = %self.key, attempts, "acquired");
                self.pending = None;
                self.token = Some(token);
                return Ok(true);
            }

            if !self.options.blocking {
                tracing::debug!(lock = %self.name, "held elsewhere");
                self.pending = None;
                return Ok(false);
            }

            let mut wait = self.options.poll_interval;
            if let Some(deadline) = deadline {
                let now = tokio::time::Instant::now();
                if now >= deadline {
                    tracing::info!(lock = %self.name, attempts, "timed out waiting");
                    self.pending = None;
                    return Ok(false);
                }
                wait = wait.min(deadline - now);
            }
            tokio::time::sleep(wait).await;
        }
    }

    /// Give the lock up.
    ///
    /// A lock that already expired or now belongs to someone else is not an
    /// error. Store failures are returned, and the token is forgotten either
    /// way since the lease bounds how long a stale key can remain.
    ///
    /// After an interrupted `acquire`, this also clears a lock the unfinished
    /// attempt may have taken.
    pub async fn release(&mut self) -> Result<(), LockError> {
        let Some(token) = self.token.take().or_else(|| self.pending.take()) else {
            return Ok(());
        };
        if self.store.delete_if_equals(&self.key, &token).await? {
            tracing::info!(lock = %self.name, "released");
        } else {
            tracing::debug!(lock = %self.name, "lock already gone or reassigned");
        }
        Ok(())
    }

    /// Acquire, run `f` with the acquisition result, then release
    pub async fn with_lock<F, Fut, R>(&mut self, f: F) -> Result<R, LockError>
    where
        F: FnOnce(bool) -> Fut,
        Fut: Future<Output = R>,
    {
        let acquired = self.acquire().await?;
        let result = f(acquired).await;
        if acquired {
            self.release().await?;
        }
        Ok(result)
    }

    /// Whether anyone holds the lock
    pub async fn is_locked(&self) -> Result<bool, LockError> {
        Ok(self.store.exists(&self.key).await?)
    }

    /// Whether the stored token is still ours
    pub async fn is_owned(&self) -> Result<bool, LockError> {
        let Some(token) = &self.token else {
            return Ok(false);
        };
        let stored = self.store.get(&self.key).await?;
        Ok(stored.as_deref() == Some(token.as_str()))
    }

    /// Reset the lease to `ttl`. `Ok(false)` once the lock is no longer ours.
    pub async fn extend(&self, ttl: Duration) -> Result<bool, LockError> {
        let Some(token) = &self.token else {
            return Ok(false);
        };
        let extended = self.store.expire_if_equals(&self.key, token, ttl).await?;
        tracing::debug!(lock = %self.name, extended, ttl_ms = ttl.as_millis() as u64, "extend");
        Ok(extended)
    }

    pub fn acquired(&self) -> bool {
        self.token.is_some()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn options(&self) -> &MutexOptions {
        &self.options
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
#[path = "mutex_tests.rs"]
mod tests;
