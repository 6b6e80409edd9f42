// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use lk_adapters::{FakeStore, StoreCall};
use lk_core::digest;
use proptest::prelude::*;
use yare::parameterized;

const BIG: usize = 10_000;

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

/// Seed `key` with `count` members of `kind`
fn seed(store: &FakeStore, kind: CollectionKind, key: &str, count: usize) {
    match kind {
        CollectionKind::Hash => store.hset(key, (0..count).map(|i| (format!("f{i}"), format!("v{i}")))),
        CollectionKind::List => store.rpush(key, (0..count).map(|i| format!("item{i}"))),
        CollectionKind::Set => store.sadd(key, (0..count).map(|i| format!("m{i}"))),
        CollectionKind::SortedSet => {
            store.zadd(key, (0..count).map(|i| (i as f64, format!("m{i}"))))
        }
    }
}

/// Largest number of members any single removal command could touch
fn largest_removal(calls: &[StoreCall]) -> Option<usize> {
    calls
        .iter()
        .filter_map(|call| match call {
            StoreCall::RemoveHashFields { count, .. } | StoreCall::RemoveSetMembers { count, .. } => {
                Some(*count)
            }
            StoreCall::TrimList { stop, .. } => Some((-stop - 1) as usize),
            StoreCall::RemoveSortedSetByRank { start, stop, .. } => Some((stop - start + 1) as usize),
            _ => None,
        })
        .max()
}

#[parameterized(
    hash = { CollectionKind::Hash, 25 },
    list = { CollectionKind::List, 103 },
    set = { CollectionKind::Set, 25 },
    sorted_set = { CollectionKind::SortedSet, 100 },
)]
fn large_collection_is_fully_reclaimed(kind: CollectionKind, expected_batches: u64) {
    let store = FakeStore::new();
    seed(&store, kind, "K", BIG);

    let report = block_on(Reclaimer::new(store.clone()).reclaim(kind, "K")).unwrap();

    let scratch = format!("gc:{}:{}", kind, digest("K"));
    assert_eq!(report.scratch_key.as_deref(), Some(scratch.as_str()));
    assert_eq!(report.removed, BIG as u64);
    assert_eq!(report.batches, expected_batches);
    assert!(!store.contains("K"));
    assert!(!store.contains(&scratch));
    assert!(store.keys().is_empty());
}

#[parameterized(
    hash = { CollectionKind::Hash },
    list = { CollectionKind::List },
    set = { CollectionKind::Set },
    sorted_set = { CollectionKind::SortedSet },
)]
fn removals_never_exceed_batch_size(kind: CollectionKind) {
    let store = FakeStore::new();
    seed(&store, kind, "K", 1_000);
    let reclaimer = Reclaimer::new(store.clone()).with_batch_size(Some(64));

    block_on(reclaimer.reclaim(kind, "K")).unwrap();

    let largest = largest_removal(&store.calls()).unwrap();
    assert!(largest <= 64, "{kind} removal touched {largest} members");
    assert!(!store.calls().contains(&StoreCall::Delete {
        key: "K".to_string()
    }));
}

#[test]
fn default_batch_sizes_bound_every_removal() {
    for kind in CollectionKind::ALL {
        let store = FakeStore::new();
        seed(&store, kind, "K", 2_000);

        block_on(Reclaimer::new(store.clone()).reclaim(kind, "K")).unwrap();

        let largest = largest_removal(&store.calls()).unwrap();
        assert!(largest <= kind.default_batch_size(), "{kind}: {largest}");
    }
}

#[tokio::test]
async fn list_is_trimmed_from_the_tail() {
    let store = FakeStore::new();
    seed(&store, CollectionKind::List, "jobs", 250);

    reclaim_list(&store, "jobs", None).await.unwrap();

    let trims: Vec<(i64, i64)> = store
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            StoreCall::TrimList { start, stop, .. } => Some((start, stop)),
            _ => None,
        })
        .collect();
    assert_eq!(trims, vec![(0, -99); 3]);
}

#[tokio::test]
async fn sorted_set_is_removed_by_lowest_rank() {
    let store = FakeStore::new();
    seed(&store, CollectionKind::SortedSet, "scores", 150);

    let report = reclaim_sorted_set(&store, "scores", None).await.unwrap();

    let ranges: Vec<(i64, i64)> = store
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            StoreCall::RemoveSortedSetByRank { start, stop, .. } => Some((start, stop)),
            _ => None,
        })
        .collect();
    assert_eq!(ranges, vec![(0, 100); 2]);
    assert_eq!(report.removed, 150);
}

#[tokio::test]
async fn absent_key_is_a_noop_every_time() {
    let store = FakeStore::new();

    let first = reclaim_hash(&store, "missing", None).await.unwrap();
    let second = reclaim_hash(&store, "missing", None).await.unwrap();

    assert!(first.is_noop());
    assert_eq!(first, second);
    assert_eq!(first.removed, 0);
    assert!(!store.calls().iter().any(|call| call.command() == "RENAME"));
}

#[tokio::test]
async fn reclaiming_twice_only_drains_once() {
    let store = FakeStore::new();
    seed(&store, CollectionKind::Set, "members", 500);

    let first = reclaim_set(&store, "members", None).await.unwrap();
    let second = reclaim_set(&store, "members", None).await.unwrap();

    assert_eq!(first.removed, 500);
    assert!(second.is_noop());
}

#[tokio::test]
async fn wrong_type_renames_nothing() {
    let store = FakeStore::new();
    store.set("config", "value");
    seed(&store, CollectionKind::List, "queue", 10);

    let err = reclaim_hash(&store, "config", None).await.unwrap_err();
    assert!(matches!(
        &err,
        ReclaimError::WrongType { key, expected: CollectionKind::Hash, found }
            if key == "config" && found == "string"
    ));

    let err = reclaim_set(&store, "queue", None).await.unwrap_err();
    assert!(matches!(err, ReclaimError::WrongType { found, .. } if found == "list"));

    assert!(store.contains("config"));
    assert_eq!(store.len_of("queue"), 10);
    assert!(!store.calls().iter().any(|call| call.command() == "RENAME"));
}

#[tokio::test]
async fn concurrent_reclaims_of_one_key_drain_it_once() {
    let store = FakeStore::new();
    seed(&store, CollectionKind::Hash, "sessions", 1_200);
    let a = Reclaimer::new(store.clone());
    let b = Reclaimer::new(store.clone());

    let (first, second) = tokio::join!(
        a.reclaim(CollectionKind::Hash, "sessions"),
        b.reclaim(CollectionKind::Hash, "sessions"),
    );
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_eq!(first.removed + second.removed, 1_200);
    assert!(first.is_noop() || second.is_noop());
    assert_eq!(
        store
            .calls()
            .iter()
            .filter(|call| call.command() == "RENAME")
            .count(),
        1
    );
    assert!(store.keys().is_empty());
}

#[tokio::test]
async fn interrupted_drain_can_be_resumed() {
    let store = FakeStore::new();
    seed(&store, CollectionKind::Hash, "K", BIG);
    let reclaimer = Reclaimer::new(store.clone());
    let scratch = reclaimer.namer().scratch_key(CollectionKind::Hash, "K");

    store.fail_after("HDEL", 3);
    let err = reclaimer.reclaim(CollectionKind::Hash, "K").await.unwrap_err();
    assert!(matches!(err, ReclaimError::Store(StoreError::Connection(_))));

    // The source is already hidden; what is left sits under the scratch key
    assert!(!store.contains("K"));
    assert_eq!(store.len_of(&scratch), BIG - 3 * 400);

    let report = reclaimer.resume(CollectionKind::Hash, "K").await.unwrap();
    assert_eq!(report.removed, (BIG - 3 * 400) as u64);
    assert!(store.keys().is_empty());
}

#[tokio::test]
async fn resume_without_scratch_key_is_a_noop() {
    let store = FakeStore::new();
    let report = Reclaimer::new(store.clone())
        .resume(CollectionKind::List, "K")
        .await
        .unwrap();

    assert!(report.is_noop());
}

#[tokio::test]
async fn stranded_scratch_key_is_drained_before_rename() {
    let store = FakeStore::new();
    let reclaimer = Reclaimer::new(store.clone());
    let scratch = reclaimer.namer().scratch_key(CollectionKind::Set, "K");
    seed(&store, CollectionKind::Set, &scratch, 50);
    store.sadd("K", (0..100).map(|i| format!("new{i}")));

    let report = reclaimer.reclaim(CollectionKind::Set, "K").await.unwrap();

    assert_eq!(report.removed, 150);
    assert!(store.keys().is_empty());

    let commands: Vec<&str> = store.calls().iter().map(StoreCall::command).collect();
    let rename_at = commands.iter().position(|c| *c == "RENAME").unwrap();
    let first_srem = commands.iter().position(|c| *c == "SREM").unwrap();
    assert!(first_srem < rename_at, "{commands:?}");
}

#[tokio::test]
async fn zero_batch_size_is_clamped_to_one() {
    let store = FakeStore::new();
    seed(&store, CollectionKind::List, "tiny", 3);
    let reclaimer = Reclaimer::new(store.clone()).with_batch_size(Some(0));

    assert_eq!(reclaimer.batch_size(CollectionKind::List), 1);
    let report = reclaimer.reclaim(CollectionKind::List, "tiny").await.unwrap();

    assert_eq!(report.batches, 3);
    assert_eq!(report.removed, 3);
}

#[tokio::test]
async fn custom_scratch_prefix_is_used() {
    let store = FakeStore::new();
    seed(&store, CollectionKind::SortedSet, "board", 5);
    let reclaimer = Reclaimer::new(store.clone()).with_namer(KeyNamer::new("lock:", "trash"));

    let report = reclaimer.reclaim(CollectionKind::SortedSet, "board").await.unwrap();

    assert_eq!(
        report.scratch_key,
        Some(format!("trash:zset:{}", digest("board")))
    );
}

#[test]
fn report_display() {
    let empty = ReclaimReport::empty(CollectionKind::Hash, "K");
    assert_eq!(empty.to_string(), "hash K: nothing to reclaim");

    let report = ReclaimReport {
        kind: CollectionKind::List,
        source_key: "K".to_string(),
        scratch_key: Some("gc:list:abc".to_string()),
        removed: 196,
        batches: 2,
    };
    assert_eq!(
        report.to_string(),
        "list K: removed 196 members in 2 batches via gc:list:abc"
    );
}

proptest! {
    #[test]
    fn list_batches_match_length(len in 1usize..600, batch in 1usize..64) {
        let store = FakeStore::new();
        seed(&store, CollectionKind::List, "L", len);

        let report = block_on(reclaim_list(&store, "L", Some(batch))).unwrap();

        prop_assert_eq!(report.removed, len as u64);
        prop_assert_eq!(report.batches, len.div_ceil(batch) as u64);
        prop_assert!(store.keys().is_empty());
    }

    #[test]
    fn set_removals_stay_within_batch(len in 1usize..600, batch in 1usize..64) {
        let store = FakeStore::new();
        seed(&store, CollectionKind::Set, "S", len);

        let report = block_on(reclaim_set(&store, "S", Some(batch))).unwrap();

        prop_assert_eq!(report.removed, len as u64);
        prop_assert!(largest_removal(&store.calls()).unwrap_or(0) <= batch);
        prop_assert!(store.keys().is_empty());
    }
}
