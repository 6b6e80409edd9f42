// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory store for testing
//!
//! Follows the store semantics the lock and reclaim code rely on: keys
//! vanish when their collection becomes empty, expiry is evaluated against
//! the injected clock, scans return every member that is present for the
//! whole scan, and RENAME overwrites the destination.
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{KeyType, ScanPage, StoreClient, StoreError};
use async_trait::async_trait;
use lk_core::{Clock, CollectionKind, ManualClock};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Recorded store call
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    Exists { key: String },
    KeyType { key: String },
    Rename { from: String, to: String },
    SetIfAbsent { key: String, value: String, ttl: Option<Duration> },
    Get { key: String },
    DeleteIfEquals { key: String, expected: String },
    ExpireIfEquals { key: String, expected: String, ttl: Duration },
    Delete { key: String },
    ScanHash { key: String, cursor: u64, count: usize },
    RemoveHashFields { key: String, count: usize },
    ScanSet { key: String, cursor: u64, count: usize },
    RemoveSetMembers { key: String, count: usize },
    ListLen { key: String },
    TrimList { key: String, start: i64, stop: i64 },
    SortedSetLen { key: String },
    RemoveSortedSetByRank { key: String, start: i64, stop: i64 },
}

impl StoreCall {
    /// Store command this call corresponds to
    pub fn command(&self) -> &'static str {
        match self {
            StoreCall::Exists { .. } => "EXISTS",
            StoreCall::KeyType { .. } => "TYPE",
            StoreCall::Rename { .. } => "RENAME",
            StoreCall::SetIfAbsent { .. } => "SET",
            StoreCall::Get { .. } => "GET",
            StoreCall::DeleteIfEquals { .. } => "DELIFEQ",
            StoreCall::ExpireIfEquals { .. } => "PEXPIREIFEQ",
            StoreCall::Delete { .. } => "DEL",
            StoreCall::ScanHash { .. } => "HSCAN",
            StoreCall::RemoveHashFields { .. } => "HDEL",
            StoreCall::ScanSet { .. } => "SSCAN",
            StoreCall::RemoveSetMembers { .. } => "SREM",
            StoreCall::ListLen { .. } => "LLEN",
            StoreCall::TrimList { .. } => "LTRIM",
            StoreCall::SortedSetLen { .. } => "ZCARD",
            StoreCall::RemoveSortedSetByRank { .. } => "ZREMRANGEBYRANK",
        }
    }
}

#[derive(Debug, Clone)]
enum Value {
    Str(String),
    Hash(BTreeMap<Vec<u8>, Vec<u8>>),
    List(VecDeque<Vec<u8>>),
    Set(BTreeSet<Vec<u8>>),
    /// Kept sorted by (score, member)
    SortedSet(Vec<(f64, Vec<u8>)>),
}

impl Value {
    fn key_type(&self) -> KeyType {
        match self {
            Value::Str(_) => KeyType::String,
            Value::Hash(_) => KeyType::Collection(CollectionKind::Hash),
            Value::List(_) => KeyType::Collection(CollectionKind::List),
            Value::Set(_) => KeyType::Collection(CollectionKind::Set),
            Value::SortedSet(_) => KeyType::Collection(CollectionKind::SortedSet),
        }
    }

    fn len(&self) -> usize {
        match self {
            Value::Str(_) => 1,
            Value::Hash(map) => map.len(),
            Value::List(list) => list.len(),
            Value::Set(set) => set.len(),
            Value::SortedSet(zset) => zset.len(),
        }
    }

    fn members(&self) -> Vec<Vec<u8>> {
        match self {
            Value::Hash(map) => map.keys().cloned().collect(),
            Value::Set(set) => set.iter().cloned().collect(),
            _ => Vec::new(),
        }
    }

    fn contains(&self, member: &[u8]) -> bool {
        match self {
            Value::Hash(map) => map.contains_key(member),
            Value::Set(set) => set.contains(member),
            _ => false,
        }
    }
}

#[derive(Debug)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

#[derive(Default)]
struct State {
    entries: HashMap<String, Entry>,
    /// Open scans: cursor -> (key, members not yet returned)
    scans: HashMap<u64, (String, VecDeque<Vec<u8>>)>,
    last_cursor: u64,
    calls: Vec<StoreCall>,
    /// Pending failures: (command, successful calls to allow first)
    failures: Vec<(&'static str, usize)>,
    /// Hold SET replies back this long after the write is applied
    set_reply_delay: Option<Duration>,
}

impl State {
    fn purge_expired(&mut self, key: &str, now: Instant) {
        let expired = self
            .entries
            .get(key)
            .and_then(|entry| entry.expires_at)
            .is_some_and(|at| at <= now);
        if expired {
            self.entries.remove(key);
        }
    }

    fn drop_if_empty(&mut self, key: &str) {
        if self.entries.get(key).is_some_and(|e| e.value.len() == 0) {
            self.entries.remove(key);
        }
    }

    fn take_failure(&mut self, command: &'static str) -> bool {
        let Some(index) = self.failures.iter().position(|(c, _)| *c == command) else {
            return false;
        };
        let remaining = &mut self.failures[index].1;
        if *remaining == 0 {
            self.failures.remove(index);
            true
        } else {
            *remaining -= 1;
            false
        }
    }
}

/// Fake store for testing
#[derive(Clone)]
pub struct FakeStore<C: Clock = ManualClock> {
    state: Arc<Mutex<State>>,
    clock: C,
}

impl FakeStore<ManualClock> {
    pub fn new() -> Self {
        Self::with_clock(ManualClock::new())
    }
}

impl Default for FakeStore<ManualClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> FakeStore<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            clock,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record `call`, apply injected failures, and drop `key` if expired
    fn begin(&self, call: StoreCall, key: &str) -> Result<MutexGuard<'_, State>, StoreError> {
        let command = call.command();
        let mut state = self.state();
        state.calls.push(call);
        if state.take_failure(command) {
            return Err(StoreError::Connection(format!(
                "injected failure for {command}"
            )));
        }
        let now = self.clock.now();
        state.purge_expired(key, now);
        Ok(state)
    }

    // -- inspection -------------------------------------------------------

    /// All recorded calls
    pub fn calls(&self) -> Vec<StoreCall> {
        self.state().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Make the `command` call after the next `successes` calls fail with a
    /// connection error (`successes = 0` fails the very next one)
    pub fn fail_after(&self, command: &'static str, successes: usize) {
        self.state().failures.push((command, successes));
    }

    /// Apply SET immediately but hold its reply back for `delay`, like a
    /// write that reached the server before the connection stalled
    pub fn delay_set_reply(&self, delay: Duration) {
        self.state().set_reply_delay = Some(delay);
    }

    /// Whether `key` holds a live value
    pub fn contains(&self, key: &str) -> bool {
        let now = self.clock.now();
        let mut state = self.state();
        state.purge_expired(key, now);
        state.entries.contains_key(key)
    }

    /// Number of members (1 for strings, 0 when absent)
    pub fn len_of(&self, key: &str) -> usize {
        let now = self.clock.now();
        let mut state = self.state();
        state.purge_expired(key, now);
        state.entries.get(key).map_or(0, |e| e.value.len())
    }

    /// Remaining time before `key` expires
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = self.clock.now();
        let mut state = self.state();
        state.purge_expired(key, now);
        state
            .entries
            .get(key)
            .and_then(|e| e.expires_at)
            .map(|at| at.saturating_duration_since(now))
    }

    /// Live keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let now = self.clock.now();
        let mut state = self.state();
        let mut keys: Vec<String> = state.entries.keys().cloned().collect();
        for key in &keys {
            state.purge_expired(key, now);
        }
        keys.retain(|k| state.entries.contains_key(k));
        keys.sort();
        keys
    }

    // -- seeding ----------------------------------------------------------

    pub fn set(&self, key: &str, value: &str) {
        self.state().entries.insert(
            key.to_string(),
            Entry {
                value: Value::Str(value.to_string()),
                expires_at: None,
            },
        );
    }

    pub fn hset<F, V>(&self, key: &str, pairs: impl IntoIterator<Item = (F, V)>)
    where
        F: Into<Vec<u8>>,
        V: Into<Vec<u8>>,
    {
        let mut state = self.state();
        let entry = state.entries.entry(key.to_string()).or_insert(Entry {
            value: Value::Hash(BTreeMap::new()),
            expires_at: None,
        });
        if let Value::Hash(map) = &mut entry.value {
            map.extend(pairs.into_iter().map(|(f, v)| (f.into(), v.into())));
        }
    }

    pub fn rpush<M: Into<Vec<u8>>>(&self, key: &str, items: impl IntoIterator<Item = M>) {
        let mut state = self.state();
        let entry = state.entries.entry(key.to_string()).or_insert(Entry {
            value: Value::List(VecDeque::new()),
            expires_at: None,
        });
        if let Value::List(list) = &mut entry.value {
            list.extend(items.into_iter().map(Into::into));
        }
    }

    pub fn sadd<M: Into<Vec<u8>>>(&self, key: &str, members: impl IntoIterator<Item = M>) {
        let mut state = self.state();
        let entry = state.entries.entry(key.to_string()).or_insert(Entry {
            value: Value::Set(BTreeSet::new()),
            expires_at: None,
        });
        if let Value::Set(set) = &mut entry.value {
            set.extend(members.into_iter().map(Into::into));
        }
    }

    pub fn zadd<M: Into<Vec<u8>>>(&self, key: &str, members: impl IntoIterator<Item = (f64, M)>) {
        let mut state = self.state();
        let entry = state.entries.entry(key.to_string()).or_insert(Entry {
            value: Value::SortedSet(Vec::new()),
            expires_at: None,
        });
        if let Value::SortedSet(zset) = &mut entry.value {
            for (score, member) in members {
                let member = member.into();
                zset.retain(|(_, m)| *m != member);
                zset.push((score, member));
            }
            zset.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        }
    }

    // -- shared command logic --------------------------------------------

    fn scan(
        &self,
        call: StoreCall,
        key: &str,
        kind: CollectionKind,
        cursor: u64,
        count: usize,
    ) -> Result<ScanPage, StoreError> {
        let mut state = self.begin(call, key)?;

        let pending = if cursor == 0 {
            match state.entries.get(key) {
                None => return Ok(ScanPage::default()),
                Some(entry) if entry.value.key_type() != KeyType::Collection(kind) => {
                    return Err(StoreError::WrongType(key.to_string()))
                }
                Some(entry) => entry.value.members().into(),
            }
        } else {
            match state.scans.remove(&cursor) {
                Some((scan_key, pending)) if scan_key == key => pending,
                _ => return Ok(ScanPage::default()),
            }
        };

        let mut pending: VecDeque<Vec<u8>> = pending;
        let mut members = Vec::new();
        while members.len() < count.max(1) {
            let Some(member) = pending.pop_front() else {
                break;
            };
            let present = state
                .entries
                .get(key)
                .is_some_and(|e| e.value.contains(&member));
            if present {
                members.push(member);
            }
        }

        if pending.is_empty() {
            return Ok(ScanPage { cursor: 0, members });
        }
        state.last_cursor += 1;
        let next = state.last_cursor;
        state.scans.insert(next, (key.to_string(), pending));
        Ok(ScanPage {
            cursor: next,
            members,
        })
    }

    fn remove_members(
        &self,
        call: StoreCall,
        key: &str,
        members: &[Vec<u8>],
    ) -> Result<usize, StoreError> {
        let mut state = self.begin(call, key)?;
        let removed = match state.entries.get_mut(key).map(|e| &mut e.value) {
            None => 0,
            Some(Value::Hash(map)) => members.iter().filter(|m| map.remove(*m).is_some()).count(),
            Some(Value::Set(set)) => members.iter().filter(|m| set.remove(*m)).count(),
            Some(_) => return Err(StoreError::WrongType(key.to_string())),
        };
        state.drop_if_empty(key);
        Ok(removed)
    }
}

/// Resolve an inclusive `start..=stop` range with negative indexes the way
/// LTRIM/ZREMRANGEBYRANK do. `None` when the range is empty.
fn resolve_range(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = len as i64;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if start > stop || start >= len || stop < 0 {
        return None;
    }
    Some((start as usize, stop as usize))
}

#[async_trait]
impl<C: Clock> StoreClient for FakeStore<C> {
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let state = self.begin(StoreCall::Exists { key: key.to_string() }, key)?;
        Ok(state.entries.contains_key(key))
    }

    async fn key_type(&self, key: &str) -> Result<Option<KeyType>, StoreError> {
        let state = self.begin(StoreCall::KeyType { key: key.to_string() }, key)?;
        Ok(state.entries.get(key).map(|e| e.value.key_type()))
    }

    async fn rename(&self, from: &str, to: &str) -> Result<(), StoreError> {
        let call = StoreCall::Rename {
            from: from.to_string(),
            to: to.to_string(),
        };
        let mut state = self.begin(call, from)?;
        let now = self.clock.now();
        state.purge_expired(to, now);
        let entry = state
            .entries
            .remove(from)
            .ok_or_else(|| StoreError::NoSuchKey(from.to_string()))?;
        state.entries.insert(to.to_string(), entry);
        Ok(())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError> {
        let call = StoreCall::SetIfAbsent {
            key: key.to_string(),
            value: value.to_string(),
            ttl,
        };
        let (applied, delay) = {
            let mut state = self.begin(call, key)?;
            let applied = !state.entries.contains_key(key);
            if applied {
                let expires_at = ttl.map(|ttl| self.clock.now() + ttl);
                state.entries.insert(
                    key.to_string(),
                    Entry {
                        value: Value::Str(value.to_string()),
                        expires_at,
                    },
                );
            }
            (applied, state.set_reply_delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(applied)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let state = self.begin(StoreCall::Get { key: key.to_string() }, key)?;
        match state.entries.get(key).map(|e| &e.value) {
            None => Ok(None),
            Some(Value::Str(value)) => Ok(Some(value.clone())),
            Some(_) => Err(StoreError::WrongType(key.to_string())),
        }
    }

    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool, StoreError> {
        let call = StoreCall::DeleteIfEquals {
            key: key.to_string(),
            expected: expected.to_string(),
        };
        let mut state = self.begin(call, key)?;
        let matches = matches!(
            state.entries.get(key).map(|e| &e.value),
            Some(Value::Str(value)) if value == expected
        );
        if matches {
            state.entries.remove(key);
        }
        Ok(matches)
    }

    async fn expire_if_equals(
        &self,
        key: &str,
        expected: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let call = StoreCall::ExpireIfEquals {
            key: key.to_string(),
            expected: expected.to_string(),
            ttl,
        };
        let mut state = self.begin(call, key)?;
        let now = self.clock.now();
        match state.entries.get_mut(key) {
            Some(entry) if matches!(&entry.value, Value::Str(v) if v == expected) => {
                entry.expires_at = Some(now + ttl);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut state = self.begin(StoreCall::Delete { key: key.to_string() }, key)?;
        state.entries.remove(key);
        Ok(())
    }

    async fn scan_hash_fields(
        &self,
        key: &str,
        cursor: u64,
        count: usize,
    ) -> Result<ScanPage, StoreError> {
        let call = StoreCall::ScanHash {
            key: key.to_string(),
            cursor,
            count,
        };
        self.scan(call, key, CollectionKind::Hash, cursor, count)
    }

    async fn remove_hash_fields(&self, key: &str, fields: &[Vec<u8>]) -> Result<usize, StoreError> {
        let call = StoreCall::RemoveHashFields {
            key: key.to_string(),
            count: fields.len(),
        };
        self.remove_members(call, key, fields)
    }

    async fn scan_set_members(
        &self,
        key: &str,
        cursor: u64,
        count: usize,
    ) -> Result<ScanPage, StoreError> {
        let call = StoreCall::ScanSet {
            key: key.to_string(),
            cursor,
            count,
        };
        self.scan(call, key, CollectionKind::Set, cursor, count)
    }

    async fn remove_set_members(
        &self,
        key: &str,
        members: &[Vec<u8>],
    ) -> Result<usize, StoreError> {
        let call = StoreCall::RemoveSetMembers {
            key: key.to_string(),
            count: members.len(),
        };
        self.remove_members(call, key, members)
    }

    async fn list_len(&self, key: &str) -> Result<usize, StoreError> {
        let state = self.begin(StoreCall::ListLen { key: key.to_string() }, key)?;
        match state.entries.get(key).map(|e| &e.value) {
            None => Ok(0),
            Some(Value::List(list)) => Ok(list.len()),
            Some(_) => Err(StoreError::WrongType(key.to_string())),
        }
    }

    async fn trim_list(&self, key: &str, start: i64, stop: i64) -> Result<(), StoreError> {
        let call = StoreCall::TrimList {
            key: key.to_string(),
            start,
            stop,
        };
        let mut state = self.begin(call, key)?;
        match state.entries.get_mut(key).map(|e| &mut e.value) {
            None => return Ok(()),
            Some(Value::List(list)) => match resolve_range(list.len(), start, stop) {
                Some((from, to)) => {
                    list.truncate(to + 1);
                    list.drain(..from);
                }
                None => list.clear(),
            },
            Some(_) => return Err(StoreError::WrongType(key.to_string())),
        }
        state.drop_if_empty(key);
        Ok(())
    }

    async fn sorted_set_len(&self, key: &str) -> Result<usize, StoreError> {
        let state = self.begin(StoreCall::SortedSetLen { key: key.to_string() }, key)?;
        match state.entries.get(key).map(|e| &e.value) {
            None => Ok(0),
            Some(Value::SortedSet(zset)) => Ok(zset.len()),
            Some(_) => Err(StoreError::WrongType(key.to_string())),
        }
    }

    async fn remove_sorted_set_by_rank(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> Result<usize, StoreError> {
        let call = StoreCall::RemoveSortedSetByRank {
            key: key.to_string(),
            start,
            stop,
        };
        let mut state = self.begin(call, key)?;
        let removed = match state.entries.get_mut(key).map(|e| &mut e.value) {
            None => 0,
            Some(Value::SortedSet(zset)) => match resolve_range(zset.len(), start, stop) {
                Some((from, to)) => zset.drain(from..=to).count(),
                None => 0,
            },
            Some(_) => return Err(StoreError::WrongType(key.to_string())),
        };
        state.drop_if_empty(key);
        Ok(removed)
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
