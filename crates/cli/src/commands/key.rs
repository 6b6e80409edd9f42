// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `lk key` - print derived key names

use anyhow::Result;
use clap::{Args, Subcommand};
use lk_core::{CollectionKind, Config};

#[derive(Args)]
pub struct KeyArgs {
    #[command(subcommand)]
    pub command: KeyCommand,
}

#[derive(Subcommand)]
pub enum KeyCommand {
    /// Key that stores a lock
    Lock {
        /// Lock name
        name: String,
    },
    /// Scratch key a collection is renamed to while it is reclaimed
    Scratch {
        /// Collection type: hash, list, set or zset
        kind: CollectionKind,
        /// Key holding the collection
        key: String,
    },
}

pub fn handle(args: KeyArgs, config: &Config) -> Result<i32> {
    println!("{}", render(&args.command, config));
    Ok(0)
}

fn render(command: &KeyCommand, config: &Config) -> String {
    let namer = config.key_namer();
    match command {
        KeyCommand::Lock { name } => namer.lock_key(name),
        KeyCommand::Scratch { kind, key } => namer.scratch_key(*kind, key),
    }
}
