//! Property tests for file classification

use chrono::{DateTime, TimeZone, Utc};
use pmps_core::{Classification, FileRecord, TieBreak, classify};
use pmps_fs::fingerprint_bytes;
use proptest::prelude::*;

fn at(secs: Option<i64>) -> Option<DateTime<Utc>> {
    secs.and_then(|s| Utc.timestamp_opt(s, 0).single())
}

fn tie_break() -> impl Strategy<Value = TieBreak> {
    prop_oneof![Just(TieBreak::PreferLocal), Just(TieBreak::PreferRemote)]
}

proptest! {
    #[test]
    fn test_equal_content_is_identical_despite_clock_skew(
        content in proptest::collection::vec(any::<u8>(), 0..256),
        local_at in proptest::option::of(0i64..4_000_000_000),
        remote_at in proptest::option::of(0i64..4_000_000_000),
        policy in tie_break(),
    ) {
        let fingerprint = fingerprint_bytes(&content);
        let local = FileRecord::fingerprinted("a.dbd", fingerprint, at(local_at));
        let remote = FileRecord::fingerprinted("a.dbd", fingerprint, at(remote_at));

        prop_assert_eq!(classify(Some(&local), Some(&remote), policy), Classification::Identical);
    }

    #[test]
    fn test_one_sided_files_are_missing_on_the_other_side(
        size in 0u64..1_000_000,
        modified in proptest::option::of(0i64..4_000_000_000),
        policy in tie_break(),
    ) {
        let record = FileRecord::listed("a.dbd", size, at(modified));

        prop_assert_eq!(classify(Some(&record), None, policy), Classification::LocalMissing);
        prop_assert_eq!(classify(None, Some(&record), policy), Classification::RemoteMissing);
    }

    #[test]
    fn test_different_content_is_never_identical(
        a in proptest::collection::vec(any::<u8>(), 1..128),
        b in proptest::collection::vec(any::<u8>(), 1..128),
        local_at in proptest::option::of(0i64..4_000_000_000),
        remote_at in proptest::option::of(0i64..4_000_000_000),
        policy in tie_break(),
    ) {
        prop_assume!(a != b);
        let local = FileRecord::fingerprinted("a.dbd", fingerprint_bytes(&a), at(local_at));
        let remote = FileRecord::fingerprinted("a.dbd", fingerprint_bytes(&b), at(remote_at));

        let classification = classify(Some(&local), Some(&remote), policy);
        prop_assert!(matches!(classification, Classification::LocalNewer | Classification::RemoteNewer));
        prop_assert_eq!(classification, classify(Some(&local), Some(&remote), policy));
    }

    #[test]
    fn test_unreadable_side_is_always_unreadable(
        content in proptest::collection::vec(any::<u8>(), 0..64),
        policy in tie_break(),
    ) {
        let readable = FileRecord::fingerprinted("a.dbd", fingerprint_bytes(&content), None);
        let unreadable = FileRecord::listed("a.dbd", content.len() as u64, None).into_unreadable();

        prop_assert_eq!(classify(Some(&readable), Some(&unreadable), policy), Classification::Unreadable);
        prop_assert_eq!(classify(Some(&unreadable), Some(&readable), policy), Classification::Unreadable);
        prop_assert_eq!(classify(Some(&unreadable), None, policy), Classification::Unreadable);
    }
}
