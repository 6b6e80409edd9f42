// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User-friendly error display with context and suggestions.
//!
//! This module provides enhanced error types that include:
//! - What went wrong (message)
//! - Why it might have happened (context)
//! - How to fix it (suggestions)

use std::fmt;

/// Exit status when a lock could not be acquired (`EX_TEMPFAIL`)
pub const EXIT_NOT_ACQUIRED: i32 = 75;

/// Error with context and recovery suggestions for user-friendly display.
#[derive(Debug)]
pub struct LkError {
    /// What went wrong
    pub message: String,
    /// Why it might have happened
    pub context: Vec<String>,
    /// How to fix it
    pub suggestions: Vec<String>,
    /// Process exit status
    pub exit_code: i32,
    /// Original error if any
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl LkError {
    /// Create a new error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: Vec::new(),
            suggestions: Vec::new(),
            exit_code: 1,
            source: None,
        }
    }

    /// Add context about why this error might have happened.
    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context.push(ctx.into());
        self
    }

    /// Add a suggestion for how to fix this error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    /// Set the source error that caused this error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for LkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "error: {}", self.message)?;

        if !self.context.is_empty() {
            writeln!(f)?;
            for ctx in &self.context {
                writeln!(f, "  -> {}", ctx)?;
            }
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            writeln!(f, "suggestions:")?;
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                writeln!(f, "  {}. {}", i + 1, suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for LkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Common error builders for typical failure scenarios.
impl LkError {
    /// The lock is held by someone else.
    pub fn lock_held(name: &str, key: &str, waited: Option<std::time::Duration>) -> Self {
        let err = LkError::new(format!("Failed to acquire lock '{}'", name))
            .with_exit_code(EXIT_NOT_ACQUIRED)
            .with_context(format!("Key '{}' is held by another process", key));
        let err = match waited {
            Some(waited) => err.with_context(format!(
                "Gave up after {}",
                humantime::format_duration(waited)
            )),
            None => err.with_context("Acquisition was non-blocking"),
        };
        err.with_suggestion(format!("See who holds it: lk lock status {}", name))
            .with_suggestion("Wait longer with --wait-timeout")
            .with_suggestion(format!(
                "If the holder is gone and the lock has no lease: lk lock clear {}",
                name
            ))
    }

    /// The store could not be reached.
    pub fn unreachable(url: &str, source: lk_adapters::StoreError) -> Self {
        LkError::new(format!("Cannot connect to {}", url))
            .with_context(source.to_string())
            .with_suggestion("Check that the server is running")
            .with_suggestion("Point at another server with --url or LK_REDIS_URL")
            .with_source(source)
    }

    /// The key holds a different type than the one requested.
    pub fn wrong_type(key: &str, expected: &str, found: &str) -> Self {
        LkError::new(format!("'{}' is a {}, not a {}", key, found, expected))
            .with_context("Nothing was renamed or removed")
            .with_suggestion(format!("Reclaim it as its actual type: lk reclaim {} {}", found, key))
    }
}
