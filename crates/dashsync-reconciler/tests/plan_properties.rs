//! Property tests: the planner partitions slugs into creates, updates and deletes.

use dashsync_grafana::{DashboardDocument, RemoteDashboardRef, Slug};
use dashsync_reconciler::{plan, Action, PlanCounts};
use proptest::prelude::*;
use serde_json::json;
use std::collections::BTreeSet;

// ---------------------------------------------------------------------------
// Helpers / Strategies
// ---------------------------------------------------------------------------

/// Slugs split into three disjoint groups: only remote, on both sides, only declared.
fn arb_partition() -> impl Strategy<Value = (Vec<String>, Vec<String>, Vec<String>)> {
    prop::collection::btree_set("[a-z][a-z0-9]{0,8}", 0..24).prop_flat_map(|slugs| {
        let slugs: Vec<String> = slugs.into_iter().collect();
        let len = slugs.len();
        (Just(slugs), prop::collection::vec(0u8..3, len))
    })
    .prop_map(|(slugs, groups)| {
        let mut only_remote = Vec::new();
        let mut both = Vec::new();
        let mut only_declared = Vec::new();
        for (slug, group) in slugs.into_iter().zip(groups) {
            match group {
                0 => only_remote.push(slug),
                1 => both.push(slug),
                _ => only_declared.push(slug),
            }
        }
        (only_remote, both, only_declared)
    })
}

fn remote(slug: &str) -> RemoteDashboardRef {
    RemoteDashboardRef::for_slug(&Slug::new(slug))
}

fn declared(slug: &str) -> DashboardDocument {
    DashboardDocument::from_value(json!({"dashboard": {"title": slug}})).unwrap()
}

fn sides(
    only_remote: &[String],
    both: &[String],
    only_declared: &[String],
) -> (Vec<RemoteDashboardRef>, Vec<DashboardDocument>) {
    let actual = only_remote.iter().chain(both).map(|s| remote(s)).collect();
    let desired = both.iter().chain(only_declared).map(|s| declared(s)).collect();
    (actual, desired)
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn plan_partitions_by_slug((only_remote, both, only_declared) in arb_partition()) {
        let (actual, desired) = sides(&only_remote, &both, &only_declared);
        let p = plan(&actual, desired);

        prop_assert_eq!(
            p.counts(),
            PlanCounts {
                create: only_declared.len(),
                update: both.len(),
                delete: only_remote.len(),
            }
        );

        for action in p.actions() {
            let slug = action.slug().as_str().to_string();
            match action {
                Action::Create { .. } => prop_assert!(only_declared.contains(&slug)),
                Action::Update { .. } => prop_assert!(both.contains(&slug)),
                Action::Delete { .. } => prop_assert!(only_remote.contains(&slug)),
            }
        }
    }

    #[test]
    fn plan_has_one_action_per_slug_in_order((only_remote, both, only_declared) in arb_partition()) {
        let (actual, desired) = sides(&only_remote, &both, &only_declared);
        let p = plan(&actual, desired);

        let slugs: Vec<&str> = p.actions().iter().map(|a| a.slug().as_str()).collect();
        let unique: BTreeSet<&str> = slugs.iter().copied().collect();
        prop_assert_eq!(slugs.len(), unique.len());
        prop_assert!(slugs.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn plan_is_deterministic((only_remote, both, only_declared) in arb_partition()) {
        let (actual, desired) = sides(&only_remote, &both, &only_declared);
        let first = plan(&actual, desired.clone());
        let second = plan(&actual, desired);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn converged_state_only_updates(slugs in prop::collection::btree_set("[a-z][a-z0-9]{0,8}", 0..24)) {
        let slugs: Vec<String> = slugs.into_iter().collect();
        let (actual, desired) = sides(&[], &slugs, &[]);
        let p = plan(&actual, desired);

        prop_assert_eq!(p.counts(), PlanCounts { create: 0, update: slugs.len(), delete: 0 });
    }
}
