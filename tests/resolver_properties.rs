//! Property-based tests for path resolution using proptest.

use proptest::prelude::*;
use proptest::sample::Index;

use qbfs_tool::mount::resolver::virtual_candidate;
use qbfs_tool::mount::{MountEntry, MountTable, PathResolver, ResolveError};

/// Mount point such as `ab/c/def`
fn virtual_path() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z]{1,3}", 1..4).prop_map(|segments| segments.join("/"))
}

/// Zero or more `/segment` parts appended to a mount point
fn suffix() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z0-9_]{1,6}", 0..3)
        .prop_map(|segments| segments.iter().map(|s| format!("/{s}")).collect())
}

/// Tables with deliberately colliding mount points and targets
fn colliding_entries() -> impl Strategy<Value = Vec<MountEntry>> {
    prop::collection::vec((virtual_path(), 0..3usize, 0..3usize), 0..8).prop_map(|raw| {
        raw.into_iter()
            .map(|(path, target, cluster)| {
                MountEntry::new(
                    path,
                    format!("hdfs://cluster-{target}/data"),
                    format!("cluster-{cluster}"),
                )
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn forward_then_reverse_recovers_candidate(
        paths in prop::collection::btree_set(virtual_path(), 1..6),
        pick in any::<Index>(),
        tail in suffix(),
    ) {
        let paths: Vec<String> = paths.into_iter().collect();
        // Targets differ in the cluster authority, so none is a prefix of another
        let table = MountTable::new(
            paths
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    MountEntry::new(p.clone(), format!("hdfs://cluster-{i}/t{i}"), format!("cluster-{i}"))
                })
                .collect(),
        );
        let resolver = PathResolver::new(&table);

        let query = format!("qbfs://{}{}", pick.get(&paths), tail);
        let physical = resolver.forward(&query).unwrap();
        let back = resolver.reverse(&physical).unwrap();

        prop_assert_eq!(virtual_candidate(&back).unwrap(), virtual_candidate(&query).unwrap());
    }

    #[test]
    fn result_ignores_table_order(
        (original, shuffled) in colliding_entries()
            .prop_flat_map(|e| (Just(e.clone()), Just(e).prop_shuffle())),
        path in virtual_path(),
        tail in suffix(),
        target in 0..3usize,
    ) {
        let a = MountTable::new(original);
        let b = MountTable::new(shuffled);
        let (ra, rb) = (PathResolver::new(&a), PathResolver::new(&b));

        let query = format!("qbfs://{path}{tail}");
        prop_assert_eq!(ra.forward(&query), rb.forward(&query));

        let physical = format!("hdfs://cluster-{target}/data{tail}");
        prop_assert_eq!(ra.reverse(&physical), rb.reverse(&physical));
    }

    #[test]
    fn empty_table_never_resolves(path in virtual_path(), tail in suffix(), raw in ".*") {
        let table = MountTable::default();
        let resolver = PathResolver::new(&table);

        let is_not_found = matches!(
            resolver.forward(&format!("qbfs://{path}{tail}")),
            Err(ResolveError::NotFound { .. })
        );
        prop_assert!(is_not_found);

        let is_not_found = matches!(resolver.reverse(&raw), Err(ResolveError::NotFound { .. }));
        prop_assert!(is_not_found);
    }

    #[test]
    fn forward_result_starts_with_a_target(
        entries in colliding_entries(),
        path in virtual_path(),
        tail in suffix(),
    ) {
        let table = MountTable::new(entries);
        let resolver = PathResolver::new(&table);

        if let Ok(physical) = resolver.forward(&format!("qbfs://{path}{tail}")) {
            prop_assert!(table.iter().any(|e| physical.starts_with(&e.target_path)));
        }
    }
}
