// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Key naming for locks and reclaim scratch space
//!
//! Lock keys keep the logical name readable (`lock:<name>`) so two callers
//! that use the same name always contend for the same key. Scratch keys are
//! content-addressed: `gc:<kind>:<sha256(source key)>`.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Default prefix prepended to lock names
pub const DEFAULT_LOCK_PREFIX: &str = "lock:";

/// Default namespace for reclaim scratch keys
pub const DEFAULT_SCRATCH_PREFIX: &str = "gc";

/// Shape of a collection stored at a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    /// Field/value map (`HSET`)
    Hash,
    /// Ordered sequence (`LPUSH`/`RPUSH`)
    List,
    /// Unordered member set (`SADD`)
    Set,
    /// Score-ordered member set (`ZADD`)
    #[serde(rename = "zset")]
    SortedSet,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 4] = [
        CollectionKind::Hash,
        CollectionKind::List,
        CollectionKind::Set,
        CollectionKind::SortedSet,
    ];

    /// Name used in scratch keys and by the store's `TYPE` command
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionKind::Hash => "hash",
            CollectionKind::List => "list",
            CollectionKind::Set => "set",
            CollectionKind::SortedSet => "zset",
        }
    }

    /// Members removed per store command when no override is given
    pub fn default_batch_size(&self) -> usize {
        match self {
            CollectionKind::Hash | CollectionKind::Set => 400,
            CollectionKind::List => 98,
            CollectionKind::SortedSet => 101,
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown collection kind: {0} (expected hash, list, set or zset)")]
pub struct UnknownKind(pub String);

impl FromStr for CollectionKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hash" => Ok(CollectionKind::Hash),
            "list" => Ok(CollectionKind::List),
            "set" => Ok(CollectionKind::Set),
            "zset" | "sorted-set" | "sortedset" => Ok(CollectionKind::SortedSet),
            _ => Err(UnknownKind(s.to_string())),
        }
    }
}

/// Derives store key names from logical names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyNamer {
    lock_prefix: String,
    scratch_prefix: String,
}

impl KeyNamer {
    pub fn new(lock_prefix: impl Into<String>, scratch_prefix: impl Into<String>) -> Self {
        Self {
            lock_prefix: lock_prefix.into(),
            scratch_prefix: scratch_prefix.into(),
        }
    }

    /// Key holding the token for lock `name`
    pub fn lock_key(&self, name: &str) -> String {
        format!("{}{}", self.lock_prefix, name)
    }

    /// Hiding place for a collection of `kind` that used to live at `key`
    pub fn scratch_key(&self, kind: CollectionKind, key: &str) -> String {
        format!("{}:{}:{}", self.scratch_prefix, kind, digest(key))
    }
}

impl Default for KeyNamer {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_PREFIX, DEFAULT_SCRATCH_PREFIX)
    }
}

/// SHA-256 of `value` as 64 lowercase hex characters
pub fn digest(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    hex_encode(&hasher.finalize())
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
#[path = "keys_tests.rs"]
mod tests;
