// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `lk lock` - run commands under a distributed lock

use crate::error::LkError;
use crate::store::{self, Store};
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use lk_adapters::StoreClient;
use lk_core::Config;
use lk_engine::{Mutex, MutexOptions, Outcome, SignalGuard};
use serde::Serialize;
use std::fmt;
use std::process::ExitStatus;
use std::time::Duration;

#[derive(Args)]
pub struct LockArgs {
    #[command(subcommand)]
    pub command: LockCommand,
}

#[derive(Subcommand)]
pub enum LockCommand {
    /// Run a command while holding the lock
    Run(RunArgs),
    /// Show whether a lock is held
    Status {
        /// Lock name
        name: String,
        /// Print JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a lock regardless of who holds it
    Clear {
        /// Lock name
        name: String,
    },
}

#[derive(Args)]
pub struct RunArgs {
    /// Lock name
    pub name: String,

    /// Expire the lock after this long (e.g. "30s")
    #[arg(long, value_parser = humantime::parse_duration)]
    pub lease: Option<Duration>,

    /// Try once instead of waiting for the lock
    #[arg(long)]
    pub no_wait: bool,

    /// Stop waiting after this long
    #[arg(long, value_parser = humantime::parse_duration, conflicts_with = "no_wait")]
    pub wait_timeout: Option<Duration>,

    /// Delay between attempts while waiting
    #[arg(long, value_parser = humantime::parse_duration)]
    pub poll: Option<Duration>,

    /// Command to run, after `--`
    #[arg(last = true, required = true)]
    pub command: Vec<String>,
}

impl RunArgs {
    /// Config defaults with command-line overrides applied
    fn options(&self, config: &Config) -> MutexOptions {
        let mut options = MutexOptions::from(&config.lock);
        if self.lease.is_some() {
            options.lease = self.lease;
        }
        if self.no_wait {
            options.blocking = false;
        }
        if self.wait_timeout.is_some() {
            options.blocking_timeout = self.wait_timeout;
        }
        if let Some(poll) = self.poll {
            options.poll_interval = poll.max(Duration::from_millis(1));
        }
        options
    }
}

#[derive(Serialize)]
struct LockStatus {
    name: String,
    key: String,
    locked: bool,
    holder: Option<String>,
}

impl fmt::Display for LockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.holder {
            Some(holder) => write!(f, "{} ({}) held by {}", self.name, self.key, holder),
            None => write!(f, "{} ({}) free", self.name, self.key),
        }
    }
}

pub async fn handle(args: LockArgs, config: &Config) -> Result<i32> {
    let store = store::connect(config).await?;
    match args.command {
        LockCommand::Run(args) => run_locked(args, store, config).await,
        LockCommand::Status { name, json } => status(&name, json, &store, config).await,
        LockCommand::Clear { name } => clear(&name, &store, config).await,
    }
}

async fn run_locked(args: RunArgs, store: Store, config: &Config) -> Result<i32> {
    let options = args.options(config);
    let waited = options.blocking.then_some(options.blocking_timeout).flatten();
    let mutex = Mutex::with_namer(store, &args.name, options, &config.key_namer());
    let key = mutex.key().to_string();
    let mut guard = SignalGuard::new(mutex);

    let program = args.command.join(" ");
    let outcome = guard.run(|| run_child(&args.command)).await?;

    match outcome {
        Outcome::Completed(status) => {
            let status = status.with_context(|| format!("failed to run `{}`", program))?;
            tracing::info!(lock = %args.name, %status, "command finished");
            Ok(exit_code(status))
        }
        Outcome::NotAcquired => Err(LkError::lock_held(&args.name, &key, waited).into()),
        Outcome::Interrupted(signal) => Ok(128 + signal as i32),
    }
}

async fn run_child(command: &[String]) -> std::io::Result<ExitStatus> {
    let Some((program, rest)) = command.split_first() else {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "no command given",
        ));
    };
    tokio::process::Command::new(program)
        .args(rest)
        .kill_on_drop(true)
        .status()
        .await
}

fn exit_code(status: ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    status.code().unwrap_or(1)
}

async fn status(name: &str, json: bool, store: &Store, config: &Config) -> Result<i32> {
    let key = config.key_namer().lock_key(name);
    let holder = store.get(&key).await?;
    let status = LockStatus {
        name: name.to_string(),
        key,
        locked: holder.is_some(),
        holder,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("{}", status);
    }
    Ok(0)
}

async fn clear(name: &str, store: &Store, config: &Config) -> Result<i32> {
    let key = config.key_namer().lock_key(name);
    if !store.exists(&key).await? {
        println!("{} is not held", key);
        return Ok(0);
    }
    store.delete(&key).await?;
    tracing::warn!(lock = %name, key = %key, "lock cleared by operator");
    println!("Cleared {}", key);
    Ok(0)
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
