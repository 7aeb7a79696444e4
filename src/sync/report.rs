//! Transfer report and the human-readable summary line.

use crate::rsync::TransferStats;
use std::time::Duration;

const MB: f64 = 1024.0 * 1024.0;

/// Outcome of a whole sync call
#[derive(Debug, Clone, PartialEq)]
pub struct TransferReport {
    pub stats: TransferStats,
    pub elapsed: Duration,
    /// Number of rsync invocations that ran
    pub chunks: usize,
    /// The source had no syncable top-level entries; nothing was spawned
    pub nothing_to_sync: bool,
}

impl TransferReport {
    pub fn new(stats: TransferStats, elapsed: Duration, chunks: usize) -> Self {
        Self {
            stats,
            elapsed,
            chunks,
            nothing_to_sync: false,
        }
    }

    pub fn nothing_to_sync(elapsed: Duration) -> Self {
        Self {
            stats: TransferStats::default(),
            elapsed,
            chunks: 0,
            nothing_to_sync: true,
        }
    }

    /// Megabytes per second over the whole call
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.stats.bytes_transferred as f64 / secs / MB
        } else {
            0.0
        }
    }

    /// `Synced <files> files (<MB>) in <s>s (<MB/s>)`, without the check mark
    pub fn summary(&self) -> String {
        format!(
            "Synced {} files ({}) in {:.1}s ({:.2} MB/s)",
            self.stats.files_transferred,
            format_megabytes(self.stats.bytes_transferred),
            self.elapsed.as_secs_f64(),
            self.throughput()
        )
    }
}

pub fn format_megabytes(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / MB)
}
