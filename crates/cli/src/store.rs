// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store connection for commands that need one

use crate::error::LkError;
use lk_adapters::{RedisStore, TracedStore};
use lk_core::Config;

pub type Store = TracedStore<RedisStore>;

pub async fn connect(config: &Config) -> Result<Store, LkError> {
    let url = &config.store.url;
    tracing::debug!(url = %url, "connecting");
    RedisStore::connect(url)
        .await
        .map(TracedStore::new)
        .map_err(|e| LkError::unreachable(url, e))
}
