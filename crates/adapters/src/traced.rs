// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced store wrapper for consistent observability

use crate::store::{KeyType, ScanPage, StoreClient, StoreError};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::Instrument;

/// Wrapper that adds tracing to any StoreClient
#[derive(Clone)]
pub struct TracedStore<S> {
    inner: S,
}

impl<S> TracedStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

#[async_trait]
impl<S: StoreClient> StoreClient for TracedStore<S> {
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let result = self.inner.exists(key).await;
        tracing::trace!(key, exists = ?result.as_ref().ok(), "checked");
        result
    }

    async fn key_type(&self, key: &str) -> Result<Option<KeyType>, StoreError> {
        let result = self.inner.key_type(key).await;
        tracing::trace!(
            key,
            key_type = ?result.as_ref().ok().map(|t| t.as_ref().map(KeyType::name)),
            "typed"
        );
        result
    }

    async fn rename(&self, from: &str, to: &str) -> Result<(), StoreError> {
        let span = tracing::info_span!("store.rename", from, to);
        async {
            let result = self.inner.rename(from, to).await;
            match &result {
                Ok(()) => tracing::debug!("renamed"),
                // absent source is an expected outcome for reclaim
                Err(StoreError::NoSuchKey(_)) => tracing::debug!("source absent"),
                Err(e) => tracing::error!(error = %e, "rename failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError> {
        let span = tracing::info_span!("store.set_if_absent", key);
        async {
            let start = Instant::now();
            let result = self.inner.set_if_absent(key, value, ttl).await;
            match &result {
                Ok(written) => tracing::debug!(
                    written,
                    ttl_ms = ttl.map(|t| t.as_millis() as u64),
                    elapsed_ms = elapsed_ms(start),
                    "set"
                ),
                Err(e) => tracing::error!(elapsed_ms = elapsed_ms(start), error = %e, "set failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let result = self.inner.get(key).await;
        tracing::trace!(key, found = ?result.as_ref().ok().map(Option::is_some), "got");
        result
    }

    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool, StoreError> {
        let span = tracing::info_span!("store.delete_if_equals", key);
        async {
            let result = self.inner.delete_if_equals(key, expected).await;
            match &result {
                Ok(deleted) => tracing::debug!(deleted, "compared"),
                Err(e) => tracing::error!(error = %e, "compare-and-delete failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn expire_if_equals(
        &self,
        key: &str,
        expected: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let span = tracing::info_span!("store.expire_if_equals", key);
        async {
            let result = self.inner.expire_if_equals(key, expected, ttl).await;
            match &result {
                Ok(updated) => tracing::debug!(updated, ttl_ms = ttl.as_millis() as u64, "compared"),
                Err(e) => tracing::error!(error = %e, "compare-and-expire failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let span = tracing::info_span!("store.delete", key);
        async {
            let start = Instant::now();
            let result = self.inner.delete(key).await;
            match &result {
                Ok(()) => tracing::debug!(elapsed_ms = elapsed_ms(start), "deleted"),
                Err(e) => tracing::error!(error = %e, "delete failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn scan_hash_fields(
        &self,
        key: &str,
        cursor: u64,
        count: usize,
    ) -> Result<ScanPage, StoreError> {
        let result = self.inner.scan_hash_fields(key, cursor, count).await;
        tracing::trace!(
            key,
            cursor,
            returned = result.as_ref().map(|p| p.members.len()).ok(),
            "scanned hash"
        );
        result
    }

    async fn remove_hash_fields(&self, key: &str, fields: &[Vec<u8>]) -> Result<usize, StoreError> {
        let start = Instant::now();
        let result = self.inner.remove_hash_fields(key, fields).await;
        tracing::trace!(
            key,
            removed = result.as_ref().ok(),
            elapsed_ms = elapsed_ms(start),
            "removed hash fields"
        );
        result
    }

    async fn scan_set_members(
        &self,
        key: &str,
        cursor: u64,
        count: usize,
    ) -> Result<ScanPage, StoreError> {
        let result = self.inner.scan_set_members(key, cursor, count).await;
        tracing::trace!(
            key,
            cursor,
            returned = result.as_ref().map(|p| p.members.len()).ok(),
            "scanned set"
        );
        result
    }

    async fn remove_set_members(
        &self,
        key: &str,
        members: &[Vec<u8>],
    ) -> Result<usize, StoreError> {
        let start = Instant::now();
        let result = self.inner.remove_set_members(key, members).await;
        tracing::trace!(
            key,
            removed = result.as_ref().ok(),
            elapsed_ms = elapsed_ms(start),
            "removed set members"
        );
        result
    }

    async fn list_len(&self, key: &str) -> Result<usize, StoreError> {
        let result = self.inner.list_len(key).await;
        tracing::trace!(key, len = result.as_ref().ok(), "list length");
        result
    }

    async fn trim_list(&self, key: &str, start: i64, stop: i64) -> Result<(), StoreError> {
        let began = Instant::now();
        let result = self.inner.trim_list(key, start, stop).await;
        tracing::trace!(key, start, stop, elapsed_ms = elapsed_ms(began), "trimmed list");
        result
    }

    async fn sorted_set_len(&self, key: &str) -> Result<usize, StoreError> {
        let result = self.inner.sorted_set_len(key).await;
        tracing::trace!(key, len = result.as_ref().ok(), "sorted set length");
        result
    }

    async fn remove_sorted_set_by_rank(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> Result<usize, StoreError> {
        let began = Instant::now();
        let result = self.inner.remove_sorted_set_by_rank(key, start, stop).await;
        tracing::trace!(
            key,
            removed = result.as_ref().ok(),
            elapsed_ms = elapsed_ms(began),
            "removed by rank"
        );
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
