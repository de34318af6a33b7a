//! # Property-Based Tests
//!
//! Closure and partition invariants over generated catalogs and file sets.

use portkit_core::closure::resolve;
use portkit_core::{Catalog, FileSet, Module, ModuleStatus, Plan, Policy};
use proptest::collection::{btree_set, vec};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::path::PathBuf;

const STATUSES: [ModuleStatus; 3] = [
    ModuleStatus::Normal,
    ModuleStatus::Obsolete,
    ModuleStatus::LongrunningTest,
];

fn name(i: usize) -> String {
    format!("m{i}")
}

/// A catalog of `size` modules `m0..`, with the given status picks and edges.
fn catalog(size: usize, statuses: &[usize], edges: &[(usize, usize)]) -> Catalog {
    Catalog::from_modules((0..size).map(|i| {
        let deps: Vec<String> = edges
            .iter()
            .filter(|(from, _)| from % size == i)
            .map(|(_, to)| name(to % size))
            .collect();
        Module::new(name(i))
            .with_status(STATUSES[statuses.get(i).copied().unwrap_or(0) % STATUSES.len()])
            .depends_on(deps)
    }))
}

fn catalog_strategy() -> impl Strategy<Value = (usize, Vec<usize>, Vec<(usize, usize)>)> {
    (2usize..16).prop_flat_map(|size| {
        (
            Just(size),
            vec(0usize..3, size),
            vec((0..size, 0..size), 0..size * 3),
        )
    })
}

// =============================================================================
// CLOSURE PROPERTIES
// =============================================================================

proptest! {
    /// Resolving twice gives the same edges and classification.
    #[test]
    fn resolution_is_deterministic(
        (size, statuses, edges) in catalog_strategy(),
        requested in btree_set(0usize..16, 1..4),
    ) {
        let catalog = catalog(size, &statuses, &edges);
        let requested: BTreeSet<String> = requested.into_iter().map(|i| name(i % size)).collect();
        let policy = Policy::new();

        let first = resolve(&requested, &catalog, &policy, true).expect("resolve");
        let second = resolve(&requested, &catalog, &policy, true).expect("resolve");
        prop_assert_eq!(first, second);
    }

    /// Avoided modules never appear; every dependency of a resolved module is
    /// either resolved or excluded.
    #[test]
    fn closure_is_complete_and_respects_policy(
        (size, statuses, edges) in catalog_strategy(),
        requested in btree_set(0usize..16, 1..4),
        avoided in btree_set(0usize..16, 0..3),
    ) {
        let catalog = catalog(size, &statuses, &edges);
        let requested: BTreeSet<String> = requested.into_iter().map(|i| name(i % size)).collect();
        let policy = Policy::new().avoiding(avoided.into_iter().map(|i| name(i % size)));

        let result = resolve(&requested, &catalog, &policy, false).expect("resolve");

        for module in &result.main {
            prop_assert!(!policy.avoids(module));
            let m = catalog.require(module).expect("known");
            if !requested.contains(module) {
                prop_assert!(!policy.excludes(m));
            }
            for dep in m.dependencies() {
                let d = catalog.require(&dep.module).expect("known");
                prop_assert!(result.main.contains(&dep.module) || policy.excludes(d));
            }
        }
    }

    /// Turning tests on never loses a main module.
    #[test]
    fn main_is_subset_of_full(
        (size, statuses, edges) in catalog_strategy(),
        requested in btree_set(0usize..16, 1..4),
    ) {
        let catalog = catalog(size, &statuses, &edges);
        let requested: BTreeSet<String> = requested.into_iter().map(|i| name(i % size)).collect();
        let result = resolve(&requested, &catalog, &Policy::new(), true).expect("resolve");

        prop_assert!(result.main.is_subset(&result.full));
        prop_assert!(result.test_only.is_subset(&result.full));
    }
}

// =============================================================================
// PARTITION PROPERTIES
// =============================================================================

proptest! {
    /// removed, added and kept are disjoint and cover old ∪ new exactly.
    #[test]
    fn plan_partitions_union(
        old in btree_set(0usize..30, 0..20),
        new in btree_set(0usize..30, 0..20),
    ) {
        let files = |ids: &BTreeSet<usize>| -> FileSet {
            ids.iter().map(|i| format!("lib/f{i}.c")).collect()
        };
        let layout = portkit_core::DirLayout::default();
        let project = tempfile::TempDir::new().expect("tempdir");
        let plan = Plan::compute(
            &files(&old).table(&layout),
            &files(&new).table(&layout),
            project.path(),
        );

        let dest = |i: &usize| PathBuf::from(format!("lib/f{i}.c"));
        let collect = |files: &[portkit_core::reconcile::PlannedFile]| -> BTreeSet<PathBuf> {
            files.iter().map(|f| f.destination.clone()).collect()
        };
        let removed = collect(&plan.removed);
        let added = collect(&plan.added);
        let kept = collect(&plan.kept);

        prop_assert_eq!(&removed, &old.difference(&new).map(dest).collect::<BTreeSet<_>>());
        prop_assert_eq!(&added, &new.difference(&old).map(dest).collect::<BTreeSet<_>>());
        prop_assert_eq!(&kept, &old.intersection(&new).map(dest).collect::<BTreeSet<_>>());
        prop_assert_eq!(
            removed.len() + added.len() + kept.len(),
            old.union(&new).count()
        );
    }
}
