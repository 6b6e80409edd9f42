// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lk-core: shared building blocks for latchkey
//!
//! This crate provides:
//! - Key naming for locks and reclaim scratch keys
//! - Lock token generation
//! - Clock abstractions for lease expiry
//! - TOML configuration

pub mod clock;
pub mod config;
pub mod keys;
pub mod token;

pub use clock::{Clock, ManualClock, SystemClock, TokioClock};
pub use config::{Config, ConfigError, KeysConfig, LockConfig, ReclaimConfig, StoreConfig};
pub use keys::{digest, CollectionKind, KeyNamer, UnknownKind};
pub use token::{SequentialTokens, TokenSource, UuidTokens};
