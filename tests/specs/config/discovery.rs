//! Config discovery specs

use crate::prelude::*;

const CUSTOM_PREFIXES: &str = r#"
[keys]
lock_prefix = "locks/"
scratch_prefix = "trash"
"#;

#[test]
fn explicit_config_flag_wins() {
    let project = Project::empty();
    project.file("lk.toml", CUSTOM_PREFIXES);

    project
        .lk()
        .args(&["--config", "lk.toml", "key", "lock", "foo"])
        .passes()
        .stdout_eq("locks/foo\n");
}

#[test]
fn config_from_environment() {
    let project = Project::empty();
    project.file("env.toml", CUSTOM_PREFIXES);

    let expected = format!("trash:hash:{}\n", DIGEST_OF_K);
    project
        .lk()
        .env("LK_CONFIG", project.path().join("env.toml"))
        .args(&["key", "scratch", "hash", "K"])
        .passes()
        .stdout_eq(&expected);
}

#[test]
fn user_config_is_picked_up() {
    let project = Project::empty();
    project.user_config(CUSTOM_PREFIXES);

    project
        .lk()
        .args(&["key", "lock", "foo"])
        .passes()
        .stdout_eq("locks/foo\n");
}

#[test]
fn missing_explicit_config_fails() {
    Project::empty()
        .lk()
        .args(&["--config", "nope.toml", "key", "lock", "foo"])
        .fails()
        .stderr_has("failed to read");
}

#[test]
fn invalid_values_are_named() {
    let project = Project::empty();
    project.file("bad.toml", "[reclaim]\nbatch_size = 0\n");

    project
        .lk()
        .args(&["--config", "bad.toml", "key", "lock", "foo"])
        .fails()
        .stderr_has("reclaim.batch_size");
}

#[test]
fn unknown_fields_are_rejected() {
    let project = Project::empty();
    project.file("typo.toml", "[lock]\nleese = \"30s\"\n");

    project
        .lk()
        .args(&["--config", "typo.toml", "key", "lock", "foo"])
        .fails()
        .stderr_has("leese");
}
