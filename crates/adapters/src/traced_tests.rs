// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::store::FakeStore;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

/// A writer that captures log output for testing
#[derive(Clone, Default)]
struct CapturedLogs {
    logs: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    fn new() -> Self {
        Self::default()
    }

    fn contents(&self) -> String {
        let logs = self.logs.lock().unwrap();
        String::from_utf8_lossy(&logs).to_string()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.logs.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run a test with captured tracing output
fn with_tracing<F, Fut>(f: F) -> (String, Fut::Output)
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future,
{
    let logs = CapturedLogs::new();
    let logs_clone = logs.clone();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_writer(logs_clone)
        .with_ansi(false)
        .without_time()
        .finish();

    let result = tracing::subscriber::with_default(subscriber, || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(f())
    });

    (logs.contents(), result)
}

#[test]
fn traced_set_if_absent_logs_span_and_timing() {
    let (logs, result) = with_tracing(|| async {
        let traced = TracedStore::new(FakeStore::new());
        traced
            .set_if_absent("lock:deploy", "token-1", Some(Duration::from_secs(5)))
            .await
    });

    assert!(result.unwrap());
    assert!(logs.contains("store.set_if_absent"), "Logs:\n{}", logs);
    assert!(logs.contains("lock:deploy"), "Logs:\n{}", logs);
    assert!(logs.contains("written=true"), "Logs:\n{}", logs);
    assert!(logs.contains("ttl_ms=5000"), "Logs:\n{}", logs);
    assert!(logs.contains("elapsed_ms"), "Logs:\n{}", logs);
}

#[test]
fn traced_set_if_absent_never_logs_token() {
    let (logs, _) = with_tracing(|| async {
        let traced = TracedStore::new(FakeStore::new());
        traced
            .set_if_absent("lock:deploy", "secret-token", None)
            .await
    });

    assert!(!logs.contains("secret-token"), "Logs:\n{}", logs);
}

#[test]
fn traced_rename_of_absent_key_is_not_an_error_log() {
    let (logs, result) = with_tracing(|| async {
        let traced = TracedStore::new(FakeStore::new());
        traced.rename("missing", "gc:hash:abc").await
    });

    assert!(matches!(result, Err(StoreError::NoSuchKey(_))));
    assert!(logs.contains("source absent"), "Logs:\n{}", logs);
    assert!(!logs.contains("ERROR"), "Logs:\n{}", logs);
}

#[test]
fn traced_failure_logs_error() {
    let (logs, result) = with_tracing(|| async {
        let fake = FakeStore::new();
        fake.fail_after("DEL", 0);
        let traced = TracedStore::new(fake);
        traced.delete("k").await
    });

    assert!(matches!(result, Err(StoreError::Connection(_))));
    assert!(logs.contains("delete failed"), "Logs:\n{}", logs);
    assert!(logs.contains("injected failure"), "Logs:\n{}", logs);
}

#[tokio::test]
async fn traced_store_delegates_to_inner() {
    let fake = FakeStore::new();
    fake.sadd("s", ["a", "b", "c"]);
    let traced = TracedStore::new(fake.clone());

    let page = traced.scan_set_members("s", 0, 10).await.unwrap();
    assert_eq!(page.members.len(), 3);
    let removed = traced.remove_set_members("s", &page.members).await.unwrap();
    assert_eq!(removed, 3);
    assert!(!fake.contains("s"));
    assert_eq!(traced.inner().calls().len(), 2);
}
