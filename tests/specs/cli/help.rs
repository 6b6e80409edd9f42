//! Help and version specs

use crate::prelude::*;

#[test]
fn top_level_help_lists_commands() {
    Project::empty()
        .lk()
        .args(&["--help"])
        .passes()
        .stdout_has("lock")
        .stdout_has("reclaim")
        .stdout_has("key");
}

#[test]
fn lock_help_lists_subcommands() {
    Project::empty()
        .lk()
        .args(&["lock", "--help"])
        .passes()
        .stdout_has("run")
        .stdout_has("status")
        .stdout_has("clear");
}

#[test]
fn lock_run_help_shows_wait_flags() {
    Project::empty()
        .lk()
        .args(&["lock", "run", "--help"])
        .passes()
        .stdout_has("--lease")
        .stdout_has("--no-wait")
        .stdout_has("--wait-timeout");
}

#[test]
fn reclaim_help_shows_batch_and_resume() {
    Project::empty()
        .lk()
        .args(&["reclaim", "--help"])
        .passes()
        .stdout_has("--batch")
        .stdout_has("--resume");
}

#[test]
fn version_flag() {
    Project::empty()
        .lk()
        .args(&["--version"])
        .passes()
        .stdout_has("lk ");
}
