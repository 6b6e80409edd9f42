// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lk - distributed locks and collection reclamation

mod commands;
mod error;
mod store;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{key, lock, reclaim};
use lk_core::Config;
use std::path::PathBuf;

use crate::error::LkError;

#[derive(Parser)]
#[command(
    name = "lk",
    version,
    about = "latchkey - distributed locks and non-blocking collection cleanup"
)]
struct Cli {
    /// Store URL (overrides config and LK_REDIS_URL)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Config file (default: $LK_CONFIG, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run commands under a lock and inspect locks
    Lock(lock::LockArgs),
    /// Remove a large collection in bounded batches
    Reclaim(reclaim::ReclaimArgs),
    /// Print store key names without connecting
    Key(key::KeyArgs),
}

#[tokio::main]
async fn main() {
    setup_logging();
    let cli = Cli::parse();

    let code = match run(cli).await {
        Ok(code) => code,
        Err(err) => match err.downcast_ref::<LkError>() {
            Some(lk) => {
                eprint!("{}", lk);
                lk.exit_code
            }
            None => {
                eprintln!("error: {:#}", err);
                1
            }
        },
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<i32> {
    let mut config = Config::discover(cli.config.as_deref())?;
    if let Some(url) = cli.url {
        config.store.url = url;
    }

    match cli.command {
        Commands::Key(args) => key::handle(args, &config),
        Commands::Lock(args) => lock::handle(args, &config).await,
        Commands::Reclaim(args) => reclaim::handle(args, &config).await,
    }
}

fn setup_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
