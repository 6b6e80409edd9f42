// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Key-value store adapters
//!
//! `StoreClient` is the command surface the lock and reclaim logic is
//! written against. Every method maps to one store round-trip; none of them
//! retry.

mod redis;

pub use self::redis::RedisStore;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeStore, StoreCall};

use async_trait::async_trait;
use lk_core::CollectionKind;
use std::time::Duration;
use thiserror::Error;

/// Errors from store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("{command} failed: {message}")]
    Command {
        command: &'static str,
        message: String,
    },
    #[error("no such key: {0}")]
    NoSuchKey(String),
    #[error("wrong type for key {0}")]
    WrongType(String),
}

/// What a key currently holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyType {
    String,
    Collection(CollectionKind),
    /// Anything else the store supports (streams, modules)
    Other(String),
}

impl KeyType {
    /// Map a `TYPE` reply; `None` for `"none"`
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name {
            "none" => None,
            "string" => Some(KeyType::String),
            "hash" => Some(KeyType::Collection(CollectionKind::Hash)),
            "list" => Some(KeyType::Collection(CollectionKind::List)),
            "set" => Some(KeyType::Collection(CollectionKind::Set)),
            "zset" => Some(KeyType::Collection(CollectionKind::SortedSet)),
            other => Some(KeyType::Other(other.to_string())),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            KeyType::String => "string",
            KeyType::Collection(kind) => kind.as_str(),
            KeyType::Other(name) => name,
        }
    }
}

/// One page of a cursor scan. A `cursor` of 0 means the scan is complete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    pub cursor: u64,
    pub members: Vec<Vec<u8>>,
}

/// Command surface of the shared key-value store
#[async_trait]
pub trait StoreClient: Clone + Send + Sync + 'static {
    /// Whether `key` exists
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Type of the value at `key`, `None` when absent
    async fn key_type(&self, key: &str) -> Result<Option<KeyType>, StoreError>;

    /// Atomically rename `from` to `to`, replacing `to`.
    /// Fails with `NoSuchKey` when `from` is absent.
    async fn rename(&self, from: &str, to: &str) -> Result<(), StoreError>;

    /// Set `key` to `value` only if it does not exist, with optional expiry.
    /// Returns whether the value was written.
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError>;

    /// String value at `key`
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Atomically delete `key` if its value equals `expected`
    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool, StoreError>;

    /// Atomically reset the expiry of `key` if its value equals `expected`
    async fn expire_if_equals(
        &self,
        key: &str,
        expected: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError>;

    /// Unconditional delete; absent keys are not an error
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Scan up to roughly `count` field names of a hash
    async fn scan_hash_fields(
        &self,
        key: &str,
        cursor: u64,
        count: usize,
    ) -> Result<ScanPage, StoreError>;

    /// Remove fields from a hash, returning how many existed
    async fn remove_hash_fields(&self, key: &str, fields: &[Vec<u8>]) -> Result<usize, StoreError>;

    /// Scan up to roughly `count` members of a set
    async fn scan_set_members(
        &self,
        key: &str,
        cursor: u64,
        count: usize,
    ) -> Result<ScanPage, StoreError>;

    /// Remove members from a set, returning how many existed
    async fn remove_set_members(&self, key: &str, members: &[Vec<u8>])
        -> Result<usize, StoreError>;

    /// Length of a list (0 when absent)
    async fn list_len(&self, key: &str) -> Result<usize, StoreError>;

    /// Keep only elements `start..=stop` of a list; negative indexes count
    /// from the tail
    async fn trim_list(&self, key: &str, start: i64, stop: i64) -> Result<(), StoreError>;

    /// Cardinality of a sorted set (0 when absent)
    async fn sorted_set_len(&self, key: &str) -> Result<usize, StoreError>;

    /// Remove members ranked `start..=stop` (lowest score first), returning
    /// how many were removed
    async fn remove_sorted_set_by_rank(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> Result<usize, StoreError>;
}
