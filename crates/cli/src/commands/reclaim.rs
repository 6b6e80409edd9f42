// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `lk reclaim <kind> <key>` - remove a large collection in batches

use crate::error::LkError;
use crate::store;
use anyhow::Result;
use clap::Args;
use lk_core::{CollectionKind, Config};
use lk_engine::{ReclaimError, Reclaimer};

#[derive(Args)]
pub struct ReclaimArgs {
    /// Collection type: hash, list, set or zset
    pub kind: CollectionKind,

    /// Key holding the collection
    pub key: String,

    /// Members removed per command (default depends on the kind)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub batch: Option<u64>,

    /// Finish an earlier reclaim of this key that was interrupted
    #[arg(long)]
    pub resume: bool,
}

pub async fn handle(args: ReclaimArgs, config: &Config) -> Result<i32> {
    let store = store::connect(config).await?;
    let batch_size = args
        .batch
        .map(|b| b as usize)
        .or(config.reclaim.batch_size);
    let reclaimer = Reclaimer::new(store)
        .with_namer(config.key_namer())
        .with_batch_size(batch_size);

    let result = if args.resume {
        reclaimer.resume(args.kind, &args.key).await
    } else {
        reclaimer.reclaim(args.kind, &args.key).await
    };

    match result {
        Ok(report) => {
            println!("{}", report);
            Ok(0)
        }
        Err(ReclaimError::WrongType {
            key,
            expected,
            found,
        }) => Err(LkError::wrong_type(&key, expected.as_str(), &found).into()),
        Err(e) => Err(e.into()),
    }
}
