//! Property-based tests for the entity and change merges.
//!
//! # Invariants tested
//!
//! - **Identity:** merging with an empty stream returns the other stream.
//! - **Idempotence:** merging a stream with itself returns the stream.
//! - **Commutativity:** timestamp and version merges ignore input order,
//!   declared bounds included.
//! - **Last source:** the right input wins every collision.
//! - **Ordering:** output is strictly increasing.
//! - **Validation:** a single ordering violation anywhere fails the merge.
//! - **Whole records:** a change merge emits the winning record, action
//!   included, exactly as it was read.


use std::collections::BTreeMap;
use std::convert::Infallible;

use osmerge_core::{
    ChangeMerger, ChangeRecord, ConflictResolutionMethod, EntityItem, EntityMerger, Keyed,
    MergeError, MergeOptions, VecSource, Winner,
};
use proptest::prelude::*;

use proptest_support::{
    assert_strictly_increasing, break_order, sorted_changes, sorted_changes_with_any_action,
    sorted_entities, sorted_stream,
};

fn merge(
    left: Vec<EntityItem>,
    right: Vec<EntityItem>,
    method: ConflictResolutionMethod,
) -> Result<Vec<EntityItem>, MergeError<Infallible>> {
    EntityMerger::new(
        VecSource::new(left),
        VecSource::new(right),
        MergeOptions::with_method(method),
    )
    .into_records()
}

fn merge_changes(
    left: Vec<ChangeRecord>,
    right: Vec<ChangeRecord>,
    method: ConflictResolutionMethod,
) -> Result<Vec<ChangeRecord>, MergeError<Infallible>> {
    ChangeMerger::new(VecSource::new(left), VecSource::new(right), method).into_records()
}

/// Records of `right` replace those of `left` with the same key.
fn overlay<T: Keyed + Clone>(left: &[T], right: &[T]) -> Vec<T> {
    let mut merged: BTreeMap<_, _> =
        left.iter().map(|record| (record.key(), record.clone())).collect();
    merged.extend(right.iter().map(|record| (record.key(), record.clone())));
    merged.into_values().collect()
}

fn any_method() -> impl Strategy<Value = ConflictResolutionMethod> {
    prop_oneof![
        Just(ConflictResolutionMethod::Timestamp),
        Just(ConflictResolutionMethod::Version),
        Just(ConflictResolutionMethod::LastSource),
    ]
}

fn symmetric_method() -> impl Strategy<Value = ConflictResolutionMethod> {
    prop_oneof![
        Just(ConflictResolutionMethod::Timestamp),
        Just(ConflictResolutionMethod::Version),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn empty_stream_is_the_identity(stream in sorted_stream(40), method in any_method()) {
        let left = merge(stream.clone(), Vec::new(), method);
        let right = merge(Vec::new(), stream.clone(), method);
        prop_assert!(matches!(left, Ok(ref merged) if *merged == stream));
        prop_assert!(matches!(right, Ok(ref merged) if *merged == stream));
    }

    #[test]
    fn self_merge_returns_the_stream(stream in sorted_stream(40), method in symmetric_method()) {
        let merged = merge(stream.clone(), stream.clone(), method);
        prop_assert!(matches!(merged, Ok(ref records) if *records == stream));
    }

    #[test]
    fn symmetric_methods_commute(
        a in sorted_stream(30),
        b in sorted_stream(30),
        method in symmetric_method(),
    ) {
        let forward = merge(a.clone(), b.clone(), method);
        let backward = merge(b, a, method);
        match (forward, backward) {
            (Ok(forward), Ok(backward)) => prop_assert_eq!(forward, backward),
            (forward, backward) => {
                prop_assert!(false, "merge failed: {forward:?} / {backward:?}");
            }
        }
    }

    #[test]
    fn last_source_always_takes_the_right_record(
        a in sorted_entities(30),
        b in sorted_entities(30),
    ) {
        let expected = overlay(&a, &b);
        let merged = merge(a, b, ConflictResolutionMethod::LastSource);
        prop_assert!(matches!(merged, Ok(ref records) if *records == expected));
    }

    #[test]
    fn output_is_strictly_increasing(
        a in sorted_stream(30),
        b in sorted_stream(30),
        method in any_method(),
    ) {
        let merged = merge(a, b, method);
        prop_assert!(merged.is_ok());
        if let Ok(records) = merged {
            assert_strictly_increasing(&records)?;
        }
    }

    #[test]
    fn any_ordering_violation_fails_the_merge(
        stream in sorted_stream(30).prop_filter("needs two records", |s| s.len() >= 2),
        position in any::<prop::sample::Index>(),
        duplicate in any::<bool>(),
        on_left in any::<bool>(),
    ) {
        let broken = break_order(stream, position, duplicate);
        let (left, right) = if on_left { (broken, Vec::new()) } else { (Vec::new(), broken) };

        let merged = merge(left, right, ConflictResolutionMethod::Timestamp);
        let is_unsorted_err = matches!(merged, Err(MergeError::UnsortedInput { .. }));
        prop_assert!(is_unsorted_err);
    }

    #[test]
    fn empty_change_stream_is_the_identity(stream in sorted_changes(40), method in any_method()) {
        let left = merge_changes(stream.clone(), Vec::new(), method);
        let right = merge_changes(Vec::new(), stream.clone(), method);
        prop_assert!(matches!(left, Ok(ref merged) if *merged == stream));
        prop_assert!(matches!(right, Ok(ref merged) if *merged == stream));
    }

    #[test]
    fn change_self_merge_returns_the_stream(
        stream in sorted_changes(40),
        method in symmetric_method(),
    ) {
        let merged = merge_changes(stream.clone(), stream.clone(), method);
        prop_assert!(matches!(merged, Ok(ref records) if *records == stream));
    }

    #[test]
    fn symmetric_methods_commute_for_changes(
        a in sorted_changes(30),
        b in sorted_changes(30),
        method in symmetric_method(),
    ) {
        let forward = merge_changes(a.clone(), b.clone(), method);
        let backward = merge_changes(b, a, method);
        match (forward, backward) {
            (Ok(forward), Ok(backward)) => prop_assert_eq!(forward, backward),
            (forward, backward) => {
                prop_assert!(false, "merge failed: {forward:?} / {backward:?}");
            }
        }
    }

    #[test]
    fn last_source_always_takes_the_right_change(
        a in sorted_changes_with_any_action(30),
        b in sorted_changes_with_any_action(30),
    ) {
        let expected = overlay(&a, &b);
        let merged = merge_changes(a, b, ConflictResolutionMethod::LastSource);
        prop_assert!(matches!(merged, Ok(ref records) if *records == expected));
    }

    #[test]
    fn change_output_is_strictly_increasing(
        a in sorted_changes_with_any_action(30),
        b in sorted_changes_with_any_action(30),
        method in any_method(),
    ) {
        let merged = merge_changes(a, b, method);
        prop_assert!(merged.is_ok());
        if let Ok(records) = merged {
            assert_strictly_increasing(&records)?;
        }
    }

    #[test]
    fn any_ordering_violation_fails_the_change_merge(
        stream in sorted_changes(30).prop_filter("needs two records", |s| s.len() >= 2),
        position in any::<prop::sample::Index>(),
        duplicate in any::<bool>(),
        on_left in any::<bool>(),
    ) {
        let broken = break_order(stream, position, duplicate);
        let (left, right) = if on_left { (broken, Vec::new()) } else { (Vec::new(), broken) };

        let merged = merge_changes(left, right, ConflictResolutionMethod::Version);
        let is_unsorted_err = matches!(merged, Err(MergeError::UnsortedInput { .. }));
        prop_assert!(is_unsorted_err);
    }

    #[test]
    fn winning_change_is_emitted_whole(
        a in sorted_changes_with_any_action(30),
        b in sorted_changes_with_any_action(30),
        method in any_method(),
    ) {
        let mut expected: BTreeMap<_, _> =
            a.iter().map(|record| (record.key(), record.clone())).collect();
        for record in &b {
            let winner = match expected.remove(&record.key()) {
                Some(left) if method.choose(&left, record) == Winner::Left => left,
                _ => record.clone(),
            };
            expected.insert(record.key(), winner);
        }
        let expected: Vec<_> = expected.into_values().collect();

        let merged = merge_changes(a, b, method);
        prop_assert!(matches!(merged, Ok(ref records) if *records == expected));
    }
}
