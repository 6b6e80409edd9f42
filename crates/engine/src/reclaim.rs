// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Non-blocking removal of large collections
//!
//! Deleting a collection with millions of members in one command stalls the
//! store for every other client. Instead the collection is renamed to a
//! scratch key (an O(1) step that hides it from readers immediately) and
//! emptied a bounded batch at a time. Every removal command touches at most
//! `batch_size` members.

use crate::error::ReclaimError;
use lk_adapters::{KeyType, StoreClient, StoreError};
use lk_core::{CollectionKind, KeyNamer};
use std::fmt;

/// What a reclaim did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReclaimReport {
    pub kind: CollectionKind,
    pub source_key: String,
    /// `None` when there was nothing to reclaim
    pub scratch_key: Option<String>,
    /// Members removed across all batches
    pub removed: u64,
    /// Removal commands issued
    pub batches: u64,
}

impl ReclaimReport {
    fn empty(kind: CollectionKind, source_key: &str) -> Self {
        Self {
            kind,
            source_key: source_key.to_string(),
            scratch_key: None,
            removed: 0,
            batches: 0,
        }
    }

    /// Whether anything was reclaimed
    pub fn is_noop(&self) -> bool {
        self.scratch_key.is_none()
    }

    fn absorb(&mut self, drained: Drained) {
        self.removed += drained.removed;
        self.batches += drained.batches;
    }
}

impl fmt::Display for ReclaimReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scratch_key {
            None => write!(f, "{} {}: nothing to reclaim", self.kind, self.source_key),
            Some(scratch) => write!(
                f,
                "{} {}: removed {} members in {} batches via {}",
                self.kind, self.source_key, self.removed, self.batches, scratch
            ),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Drained {
    removed: u64,
    batches: u64,
}

/// Reclaims collections through a [`StoreClient`]
#[derive(Clone)]
pub struct Reclaimer<S> {
    store: S,
    namer: KeyNamer,
    batch_size: Option<usize>,
}

impl<S: StoreClient> Reclaimer<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            namer: KeyNamer::default(),
            batch_size: None,
        }
    }

    /// Use custom scratch key prefixes
    pub fn with_namer(mut self, namer: KeyNamer) -> Self {
        self.namer = namer;
        self
    }

    /// Override the per-kind default batch size. Zero is treated as one.
    pub fn with_batch_size(mut self, batch_size: Option<usize>) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Batch size used for `kind`
    pub fn batch_size(&self, kind: CollectionKind) -> usize {
        self.batch_size
            .unwrap_or_else(|| kind.default_batch_size())
            .max(1)
    }

    pub fn namer(&self) -> &KeyNamer {
        &self.namer
    }

    /// Hide `key` behind its scratch key, then drain and delete it.
    ///
    /// An absent key, or one a concurrent reclaim renamed first, yields an
    /// empty report. A key of another type is left untouched.
    pub async fn reclaim(
        &self,
        kind: CollectionKind,
        key: &str,
    ) -> Result<ReclaimReport, ReclaimError> {
        let mut report = ReclaimReport::empty(kind, key);

        match self.store.key_type(key).await? {
            None => {
                tracing::debug!(%kind, key, "nothing to reclaim");
                return Ok(report);
            }
            Some(KeyType::Collection(found)) if found == kind => {}
            Some(other) => {
                return Err(ReclaimError::WrongType {
                    key: key.to_string(),
                    expected: kind,
                    found: other.name().to_string(),
                })
            }
        }

        let scratch = self.namer.scratch_key(kind, key);

        // RENAME would overwrite a stranded scratch key with a blocking delete
        if self.store.exists(&scratch).await? {
            tracing::warn!(%kind, key, scratch = %scratch, "draining stranded scratch key");
            report.absorb(self.drain(kind, &scratch).await?);
        }

        match self.store.rename(key, &scratch).await {
            Ok(()) => {}
            Err(StoreError::NoSuchKey(_)) => {
                tracing::debug!(%kind, key, "source vanished before rename");
                if report.batches > 0 {
                    report.scratch_key = Some(scratch);
                }
                return Ok(report);
            }
            Err(e) => return Err(e.into()),
        }

        report.absorb(self.drain(kind, &scratch).await?);
        self.store.delete(&scratch).await?;
        report.scratch_key = Some(scratch);

        tracing::info!(
            %kind,
            key,
            removed = report.removed,
            batches = report.batches,
            "reclaimed"
        );
        Ok(report)
    }

    /// Finish a reclaim that stopped after its rename
    pub async fn resume(
        &self,
        kind: CollectionKind,
        key: &str,
    ) -> Result<ReclaimReport, ReclaimError> {
        let mut report = ReclaimReport::empty(kind, key);
        let scratch = self.namer.scratch_key(kind, key);

        match self.store.key_type(&scratch).await? {
            None => {
                tracing::debug!(%kind, key, scratch = %scratch, "no scratch key to resume");
                return Ok(report);
            }
            Some(KeyType::Collection(found)) if found == kind => {}
            Some(other) => {
                return Err(ReclaimError::WrongType {
                    key: scratch,
                    expected: kind,
                    found: other.name().to_string(),
                })
            }
        }

        report.absorb(self.drain(kind, &scratch).await?);
        self.store.delete(&scratch).await?;
        report.scratch_key = Some(scratch);

        tracing::info!(
            %kind,
            key,
            removed = report.removed,
            batches = report.batches,
            "resumed"
        );
        Ok(report)
    }

    async fn drain(&self, kind: CollectionKind, scratch: &str) -> Result<Drained, StoreError> {
        let batch = self.batch_size(kind);
        match kind {
            CollectionKind::Hash | CollectionKind::Set => self.drain_scanned(kind, scratch, batch).await,
            CollectionKind::List => self.drain_list(scratch, batch).await,
            CollectionKind::SortedSet => self.drain_sorted_set(scratch, batch).await,
        }
    }

    /// Scan `batch` members at a time and remove what each page returned.
    /// A page can exceed the COUNT hint, so removals are chunked again.
    async fn drain_scanned(
        &self,
        kind: CollectionKind,
        scratch: &str,
        batch: usize,
    ) -> Result<Drained, StoreError> {
        let mut drained = Drained::default();
        let mut cursor = 0;
        loop {
            let page = match kind {
                CollectionKind::Hash => self.store.scan_hash_fields(scratch, cursor, batch).await?,
                _ => self.store.scan_set_members(scratch, cursor, batch).await?,
            };
            for chunk in page.members.chunks(batch) {
                let removed = match kind {
                    CollectionKind::Hash => self.store.remove_hash_fields(scratch, chunk).await?,
                    _ => self.store.remove_set_members(scratch, chunk).await?,
                };
                drained.removed += removed as u64;
                drained.batches += 1;
                tracing::debug!(scratch, removed, cursor = page.cursor, "batch removed");
            }
            cursor = page.cursor;
            if cursor == 0 {
                return Ok(drained);
            }
        }
    }

    /// Drop `batch` elements from the tail until the list is gone
    async fn drain_list(&self, scratch: &str, batch: usize) -> Result<Drained, StoreError> {
        let mut drained = Drained::default();
        let keep_until = -(batch as i64) - 1;
        loop {
            let len = self.store.list_len(scratch).await?;
            if len == 0 {
                return Ok(drained);
            }
            self.store.trim_list(scratch, 0, keep_until).await?;
            let removed = len.min(batch);
            drained.removed += removed as u64;
            drained.batches += 1;
            tracing::debug!(scratch, removed, remaining = len - removed, "batch removed");
        }
    }

    /// Drop the `batch` lowest-ranked members until the sorted set is gone
    async fn drain_sorted_set(&self, scratch: &str, batch: usize) -> Result<Drained, StoreError> {
        let mut drained = Drained::default();
        let last_rank = batch as i64 - 1;
        loop {
            if self.store.sorted_set_len(scratch).await? == 0 {
                return Ok(drained);
            }
            let removed = self
                .store
                .remove_sorted_set_by_rank(scratch, 0, last_rank)
                .await?;
            drained.removed += removed as u64;
            drained.batches += 1;
            tracing::debug!(scratch, removed, "batch removed");
        }
    }
}

/// Reclaim a hash
pub async fn reclaim_hash<S: StoreClient>(
    store: &S,
    key: &str,
    batch_size: Option<usize>,
) -> Result<ReclaimReport, ReclaimError> {
    reclaim_kind(store, CollectionKind::Hash, key, batch_size).await
}

/// Reclaim a list
pub async fn reclaim_list<S: StoreClient>(
    store: &S,
    key: &str,
    batch_size: Option<usize>,
) -> Result<ReclaimReport, ReclaimError> {
    reclaim_kind(store, CollectionKind::List, key, batch_size).await
}

/// Reclaim a set
pub async fn reclaim_set<S: StoreClient>(
    store: &S,
    key: &str,
    batch_size: Option<usize>,
) -> Result<ReclaimReport, ReclaimError> {
    reclaim_kind(store, CollectionKind::Set, key, batch_size).await
}

/// Reclaim a sorted set
pub async fn reclaim_sorted_set<S: StoreClient>(
    store: &S,
    key: &str,
    batch_size: Option<usize>,
) -> Result<ReclaimReport, ReclaimError> {
    reclaim_kind(store, CollectionKind::SortedSet, key, batch_size).await
}

async fn reclaim_kind<S: StoreClient>(
    store: &S,
    kind: CollectionKind,
    key: &str,
    batch_size: Option<usize>,
) -> Result<ReclaimReport, ReclaimError> {
    Reclaimer::new(store.clone())
        .with_batch_size(batch_size)
        .reclaim(kind, key)
        .await
}

#[cfg(test)]
#[path = "reclaim_tests.rs"]
mod tests;
