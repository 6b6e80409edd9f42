//! Error reporting specs

use crate::prelude::*;

#[test]
fn unknown_collection_kind_is_rejected() {
    Project::empty()
        .lk()
        .args(&["key", "scratch", "stream", "K"])
        .fails()
        .stderr_has("unknown collection kind");
}

#[test]
fn zero_batch_is_rejected() {
    Project::empty()
        .lk()
        .args(&["reclaim", "hash", "K", "--batch", "0"])
        .fails()
        .stderr_has("--batch");
}

#[test]
fn lock_run_requires_a_command() {
    Project::empty()
        .lk()
        .args(&["lock", "run", "deploy"])
        .fails();
}

#[test]
fn bad_duration_is_rejected() {
    Project::empty()
        .lk()
        .args(&["lock", "run", "deploy", "--lease", "soon", "--", "true"])
        .fails()
        .stderr_has("--lease");
}

#[test]
fn unreachable_store_explains_itself() {
    Project::empty()
        .lk()
        .args(&["--url", DEAD_URL, "lock", "status", "deploy"])
        .fails()
        .code_is(1)
        .stderr_has("Cannot connect to redis://127.0.0.1:1/")
        .stderr_has("LK_REDIS_URL");
}

#[test]
fn unreachable_store_from_environment() {
    Project::empty()
        .lk()
        .env("LK_REDIS_URL", DEAD_URL)
        .args(&["reclaim", "list", "jobs"])
        .fails()
        .stderr_has("Cannot connect to redis://127.0.0.1:1/");
}

#[test]
fn lock_run_does_not_start_child_without_store() {
    let project = Project::empty();
    project
        .lk()
        .args(&["--url", DEAD_URL, "lock", "run", "deploy", "--", "touch", "ran"])
        .fails();

    assert!(!project.path().join("ran").exists());
}
