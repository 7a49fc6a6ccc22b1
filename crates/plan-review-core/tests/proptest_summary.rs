// crates/plan-review-core/tests/proptest_summary.rs
// ============================================================================
// Module: Change Summary Property Tests
// Description: Randomized plans checked against summary invariants.
// Purpose: Validate ordering, truncation and count conservation.
// ============================================================================

//! ## Overview
//! Generates arbitrary resource-change lists and checks that the per-type table
//! is sorted, capped, stable on ties and never exceeds the global counts.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use plan_review_core::ActionSet;
use plan_review_core::ChangeSummary;
use plan_review_core::MAX_TYPE_ENTRIES;
use plan_review_core::ObjectLocation;
use plan_review_core::ResourceChange;
use proptest::prelude::*;

fn action_set() -> impl Strategy<Value = ActionSet> {
    (any::<bool>(), any::<bool>(), any::<bool>()).prop_map(|(create, update, delete)| ActionSet {
        create,
        update,
        delete,
    })
}

fn changes() -> impl Strategy<Value = Vec<ResourceChange>> {
    prop::collection::vec((0_u8 .. 16, action_set()), 0 .. 64).prop_map(|entries| {
        entries
            .into_iter()
            .enumerate()
            .map(|(index, (kind, actions))| ResourceChange {
                resource_type: format!("aws_type_{kind}"),
                address: format!("r.{index}"),
                actions,
                after: None,
            })
            .collect()
    })
}

fn location() -> ObjectLocation {
    ObjectLocation::new("artifacts", "p/tfplan.json")
}

proptest! {
    #[test]
    fn by_type_is_sorted_and_capped(changes in changes()) {
        let summary = ChangeSummary::from_changes(&changes, location());
        prop_assert!(summary.by_type.len() <= MAX_TYPE_ENTRIES);
        for pair in summary.by_type.windows(2) {
            prop_assert!(pair[0].total() >= pair[1].total());
        }
    }

    #[test]
    fn global_counts_match_action_sets(changes in changes()) {
        let summary = ChangeSummary::from_changes(&changes, location());
        let expected = |pick: fn(&ActionSet) -> bool| {
            changes.iter().filter(|change| pick(&change.actions)).count() as u64
        };
        prop_assert_eq!(summary.creates, expected(|actions| actions.create));
        prop_assert_eq!(summary.updates, expected(|actions| actions.update));
        prop_assert_eq!(summary.deletes, expected(|actions| actions.delete));
        let listed: u64 = summary.by_type.iter().map(|tally| tally.total()).sum();
        prop_assert!(listed <= summary.creates + summary.updates + summary.deletes);
    }

    #[test]
    fn ties_keep_first_seen_order(changes in changes()) {
        let summary = ChangeSummary::from_changes(&changes, location());
        let first_seen = |resource_type: &str| {
            changes
                .iter()
                .position(|change| !change.actions.is_empty() && change.resource_type == resource_type)
        };
        for pair in summary.by_type.windows(2) {
            if pair[0].total() == pair[1].total() {
                prop_assert!(first_seen(&pair[0].resource_type) < first_seen(&pair[1].resource_type));
            }
        }
    }

    #[test]
    fn replace_is_never_an_update(count in 1_usize .. 20) {
        let changes: Vec<ResourceChange> = (0 .. count)
            .map(|index| ResourceChange {
                resource_type: "aws_instance".to_string(),
                address: format!("aws_instance.r{index}"),
                actions: ActionSet::from_verbs(&["delete", "create"]),
                after: None,
            })
            .collect();
        let summary = ChangeSummary::from_changes(&changes, location());
        prop_assert_eq!(summary.creates, count as u64);
        prop_assert_eq!(summary.deletes, count as u64);
        prop_assert_eq!(summary.updates, 0);
    }
}
