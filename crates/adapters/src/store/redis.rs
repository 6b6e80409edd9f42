// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Redis store adapter
//!
//! Uses a tokio `ConnectionManager`, which reconnects on its own; a failed
//! command still surfaces as an error to the caller.

use super::{KeyType, ScanPage, StoreClient, StoreError};
use ::redis::aio::{ConnectionManager, ConnectionManagerConfig};
use ::redis::{Cmd, FromRedisValue, RedisError, Script};
use async_trait::async_trait;
use std::time::Duration;

/// Reconnect attempts before a command or initial connect gives up
const CONNECT_RETRIES: usize = 2;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

const COMPARE_AND_DELETE: &str = r#"
if redis.call("get", KEYS[1]) == ARGV[1] then
    return redis.call("del", KEYS[1])
end
return 0
"#;

const COMPARE_AND_EXPIRE: &str = r#"
if redis.call("get", KEYS[1]) == ARGV[1] then
    return redis.call("pexpire", KEYS[1], ARGV[2])
end
return 0
"#;

/// Redis-backed store
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    compare_and_delete: Script,
    compare_and_expire: Script,
}

impl RedisStore {
    /// Connect to `url`, e.g. `redis://127.0.0.1/` or `rediss://host:6380/0`
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = ::redis::Client::open(url)
            .map_err(|e| StoreError::Connection(format!("invalid url {url}: {e}")))?;
        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(CONNECT_RETRIES)
            .set_connection_timeout(CONNECT_TIMEOUT);
        let conn = ConnectionManager::new_with_config(client, config)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(Self {
            conn,
            compare_and_delete: Script::new(COMPARE_AND_DELETE),
            compare_and_expire: Script::new(COMPARE_AND_EXPIRE),
        })
    }

    async fn query<T: FromRedisValue>(
        &self,
        command: &'static str,
        cmd: &Cmd,
    ) -> Result<T, StoreError> {
        let mut conn = self.conn.clone();
        cmd.query_async(&mut conn)
            .await
            .map_err(|e| map_error(command, e))
    }

    async fn scan(
        &self,
        command: &'static str,
        key: &str,
        cursor: u64,
        count: usize,
    ) -> Result<(u64, Vec<Vec<u8>>), StoreError> {
        let mut cmd = ::redis::cmd(command);
        cmd.arg(key).arg(cursor).arg("COUNT").arg(count);
        self.query(command, &cmd).await
    }

    async fn remove_members(
        &self,
        command: &'static str,
        key: &str,
        members: &[Vec<u8>],
    ) -> Result<usize, StoreError> {
        if members.is_empty() {
            return Ok(0);
        }
        let mut cmd = ::redis::cmd(command);
        cmd.arg(key);
        for member in members {
            cmd.arg(member.as_slice());
        }
        self.query(command, &cmd).await
    }
}

fn map_error(command: &'static str, e: RedisError) -> StoreError {
    if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout()
    {
        return StoreError::Connection(e.to_string());
    }
    let message = e.to_string();
    if e.code() == Some("WRONGTYPE") {
        return StoreError::WrongType(message);
    }
    StoreError::Command { command, message }
}

/// RENAME's reply when the source key is gone
fn is_no_such_key(e: &RedisError) -> bool {
    e.detail().is_some_and(|d| d.contains("no such key"))
}

/// PX argument; sub-millisecond leases round up so they still expire
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

/// Field names from an HSCAN page, which alternates field and value
fn hash_fields(pairs: Vec<Vec<u8>>) -> Vec<Vec<u8>> {
    pairs.into_iter().step_by(2).collect()
}

#[async_trait]
impl StoreClient for RedisStore {
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut cmd = ::redis::cmd("EXISTS");
        cmd.arg(key);
        let count: u64 = self.query("EXISTS", &cmd).await?;
        Ok(count > 0)
    }

    async fn key_type(&self, key: &str) -> Result<Option<KeyType>, StoreError> {
        let mut cmd = ::redis::cmd("TYPE");
        cmd.arg(key);
        let name: String = self.query("TYPE", &cmd).await?;
        Ok(KeyType::from_type_name(&name))
    }

    async fn rename(&self, from: &str, to: &str) -> Result<(), StoreError> {
        let mut cmd = ::redis::cmd("RENAME");
        cmd.arg(from).arg(to);
        let mut conn = self.conn.clone();
        let result: Result<(), RedisError> = cmd.query_async(&mut conn).await;
        match result {
            Ok(()) => Ok(()),
            Err(e) if is_no_such_key(&e) => {
                Err(StoreError::NoSuchKey(from.to_string()))
            }
            Err(e) => Err(map_error("RENAME", e)),
        }
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError> {
        let mut cmd = ::redis::cmd("SET");
        cmd.arg(key).arg(value).arg("NX");
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg(ttl_millis(ttl));
        }
        let reply: Option<String> = self.query("SET", &cmd).await?;
        Ok(reply.is_some())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut cmd = ::redis::cmd("GET");
        cmd.arg(key);
        self.query("GET", &cmd).await
    }

    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let deleted: i64 = self
            .compare_and_delete
            .key(key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| map_error("EVALSHA", e))?;
        Ok(deleted > 0)
    }

    async fn expire_if_equals(
        &self,
        key: &str,
        expected: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let updated: i64 = self
            .compare_and_expire
            .key(key)
            .arg(expected)
            .arg(ttl_millis(ttl))
            .invoke_async(&mut conn)
            .await
            .map_err(|e| map_error("EVALSHA", e))?;
        Ok(updated > 0)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut cmd = ::redis::cmd("DEL");
        cmd.arg(key);
        self.query::<()>("DEL", &cmd).await
    }

    async fn scan_hash_fields(
        &self,
        key: &str,
        cursor: u64,
        count: usize,
    ) -> Result<ScanPage, StoreError> {
        let (cursor, pairs) = self.scan("HSCAN", key, cursor, count).await?;
        Ok(ScanPage {
            cursor,
            members: hash_fields(pairs),
        })
    }

    async fn remove_hash_fields(&self, key: &str, fields: &[Vec<u8>]) -> Result<usize, StoreError> {
        self.remove_members("HDEL", key, fields).await
    }

    async fn scan_set_members(
        &self,
        key: &str,
        cursor: u64,
        count: usize,
    ) -> Result<ScanPage, StoreError> {
        let (cursor, members) = self.scan("SSCAN", key, cursor, count).await?;
        Ok(ScanPage { cursor, members })
    }

    async fn remove_set_members(
        &self,
        key: &str,
        members: &[Vec<u8>],
    ) -> Result<usize, StoreError> {
        self.remove_members("SREM", key, members).await
    }

    async fn list_len(&self, key: &str) -> Result<usize, StoreError> {
        let mut cmd = ::redis::cmd("LLEN");
        cmd.arg(key);
        self.query("LLEN", &cmd).await
    }

    async fn trim_list(&self, key: &str, start: i64, stop: i64) -> Result<(), StoreError> {
        let mut cmd = ::redis::cmd("LTRIM");
        cmd.arg(key).arg(start).arg(stop);
        self.query::<()>("LTRIM", &cmd).await
    }

    async fn sorted_set_len(&self, key: &str) -> Result<usize, StoreError> {
        let mut cmd = ::redis::cmd("ZCARD");
        cmd.arg(key);
        self.query("ZCARD", &cmd).await
    }

    async fn remove_sorted_set_by_rank(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> Result<usize, StoreError> {
        let mut cmd = ::redis::cmd("ZREMRANGEBYRANK");
        cmd.arg(key).arg(start).arg(stop);
        self.query("ZREMRANGEBYRANK", &cmd).await
    }
}

#[cfg(test)]
#[path = "redis_tests.rs"]
mod tests;
