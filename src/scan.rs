//! Local tree inspection: top-level entry listing and syncable file counting.

use crate::error::{Result, SyncError};
use crate::filter::ExclusionFilter;
use ignore::WalkBuilder;
use std::fs;
use std::path::Path;

/// A direct child of the sync root that survived exclusion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopLevelEntry {
    pub name: String,
    pub is_dir: bool,
}

impl TopLevelEntry {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
        }
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
        }
    }
}

/// List the root's direct children, minus excluded names, sorted by name.
pub fn list_top_level(root: &Path, filter: &ExclusionFilter) -> Result<Vec<TopLevelEntry>> {
    let read_err = |source| SyncError::DirectoryRead {
        path: root.to_path_buf(),
        source,
    };

    let mut entries = Vec::new();
    for entry in fs::read_dir(root).map_err(read_err)? {
        let entry = entry.map_err(read_err)?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if filter.should_exclude(&name) {
            continue;
        }
        let is_dir = entry.file_type().map_err(read_err)?.is_dir();
        entries.push(TopLevelEntry { name, is_dir });
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

/// Count syncable files below `dir`.
///
/// Excluded directories are pruned without being descended into. Unreadable
/// entries are logged and skipped; the count only sizes the plan.
pub fn count_files(dir: &Path, filter: &ExclusionFilter) -> u64 {
    let prune = filter.clone();
    let walker = WalkBuilder::new(dir)
        .standard_filters(false)
        .follow_links(false)
        .filter_entry(move |entry| {
            entry.depth() == 0 || !prune.should_exclude(&entry.file_name().to_string_lossy())
        })
        .build();

    let mut count = 0;
    for entry in walker {
        match entry {
            // Symlinks are not followed, so a linked dir counts as one entry
            Ok(entry) => {
                if entry.depth() > 0 && entry.file_type().is_some_and(|ft| !ft.is_dir()) {
                    count += 1;
                }
            }
            Err(e) => tracing::warn!("Skipping unreadable entry: {}", e),
        }
    }
    count
}
