//! Fan-out planning: how many rsync invocations, and which entries each one gets.

use crate::scan::TopLevelEntry;

/// Upper bound for the automatically chosen degree
pub const MAX_PARALLELISM: usize = 8;

/// File-count thresholds: below `limit`, use `degree`
const THRESHOLDS: &[(u64, usize)] = &[(50, 1), (500, 2), (2000, 4), (5000, 6)];

/// One partition of top-level entries, handled by one rsync invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// 1-based identifier used in logs and error messages
    pub worker_id: usize,
    pub entries: Vec<TopLevelEntry>,
}

/// Degree suggested by the syncable file count alone
pub fn degree_for_file_count(total_files: u64) -> usize {
    THRESHOLDS
        .iter()
        .find(|(limit, _)| total_files < *limit)
        .map(|(_, degree)| *degree)
        .unwrap_or(MAX_PARALLELISM)
}

/// Choose the fan-out degree.
///
/// Returns `None` when there is nothing to sync. An explicit override
/// (`> 0`) bypasses the thresholds and the cap of eight but is still
/// clamped to the number of entries, since extra buckets would be empty.
pub fn plan(total_files: u64, top_level_entries: usize, explicit: usize) -> Option<usize> {
    if top_level_entries == 0 {
        return None;
    }

    let degree = if explicit > 0 {
        explicit
    } else {
        degree_for_file_count(total_files)
    };

    Some(degree.clamp(1, top_level_entries))
}

/// Round-robin `entries` into `degree` buckets, dropping empty ones.
pub fn split(entries: Vec<TopLevelEntry>, degree: usize) -> Vec<Chunk> {
    let degree = degree.max(1);
    let mut buckets: Vec<Vec<TopLevelEntry>> = vec![Vec::new(); degree];

    for (i, entry) in entries.into_iter().enumerate() {
        buckets[i % degree].push(entry);
    }

    buckets
        .into_iter()
        .filter(|bucket| !bucket.is_empty())
        .enumerate()
        .map(|(i, entries)| Chunk {
            worker_id: i + 1,
            entries,
        })
        .collect()
}
