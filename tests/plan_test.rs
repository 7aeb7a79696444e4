//! Property tests for fan-out planning and chunk partitioning.

use proptest::prelude::*;
use sandsync::plan::{plan, split, MAX_PARALLELISM};
use sandsync::scan::TopLevelEntry;
use std::collections::HashSet;

fn entries(names: &[(String, bool)]) -> Vec<TopLevelEntry> {
    names
        .iter()
        .map(|(name, is_dir)| TopLevelEntry {
            name: name.clone(),
            is_dir: *is_dir,
        })
        .collect()
}

proptest! {
    #[test]
    fn split_covers_every_entry_exactly_once(
        names in prop::collection::hash_set("[a-z]{1,8}", 1..60),
        dirs in prop::collection::vec(any::<bool>(), 60),
        degree_seed in 1usize..100,
    ) {
        let names: Vec<(String, bool)> = names.into_iter().zip(dirs).collect();
        let input = entries(&names);
        let degree = 1 + degree_seed % input.len();

        let chunks = split(input.clone(), degree);

        prop_assert_eq!(chunks.len(), degree);
        let mut seen = HashSet::new();
        for chunk in &chunks {
            prop_assert!(!chunk.entries.is_empty());
            for entry in &chunk.entries {
                prop_assert!(seen.insert(entry.name.clone()), "duplicate {}", entry.name);
            }
        }
        prop_assert_eq!(seen.len(), input.len());

        let ids: Vec<usize> = chunks.iter().map(|c| c.worker_id).collect();
        prop_assert_eq!(ids, (1..=degree).collect::<Vec<_>>());
    }

    #[test]
    fn automatic_degree_stays_in_bounds(files in 0u64..50_000, top_level in 1usize..40) {
        let degree = plan(files, top_level, 0).unwrap();
        prop_assert!(degree >= 1);
        prop_assert!(degree <= MAX_PARALLELISM.min(top_level));
    }

    #[test]
    fn explicit_degree_never_exceeds_entries(explicit in 1usize..64, top_level in 1usize..40) {
        let degree = plan(0, top_level, explicit).unwrap();
        prop_assert_eq!(degree, explicit.min(top_level));
    }
}
