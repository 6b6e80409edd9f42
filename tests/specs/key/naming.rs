//! Key naming specs
//!
//! `lk key` works offline, so these run without a store.

use crate::prelude::*;

#[test]
fn lock_key_is_prefixed_name() {
    Project::empty()
        .lk()
        .args(&["key", "lock", "foo"])
        .passes()
        .stdout_eq("lock:foo\n");
}

#[test]
fn scratch_key_is_kind_and_digest() {
    let expected = format!("gc:hash:{}\n", DIGEST_OF_K);
    Project::empty()
        .lk()
        .args(&["key", "scratch", "hash", "K"])
        .passes()
        .stdout_eq(&expected);
}

#[test]
fn sorted_set_aliases_share_a_scratch_key() {
    let expected = format!("gc:zset:{}\n", DIGEST_OF_K);
    for alias in ["zset", "sorted-set", "SortedSet"] {
        Project::empty()
            .lk()
            .args(&["key", "scratch", alias, "K"])
            .passes()
            .stdout_eq(&expected);
    }
}

#[test]
fn scratch_key_differs_per_kind() {
    let project = Project::empty();
    let list = project.lk().args(&["key", "scratch", "list", "K"]).passes();
    let set = project.lk().args(&["key", "scratch", "set", "K"]).passes();

    assert_ne!(list.stdout, set.stdout);
    assert!(list.stdout.starts_with("gc:list:"));
    assert!(set.stdout.starts_with("gc:set:"));
}
