//! Sync entry point: plan the fan-out, run every chunk, merge the results.
//!
//! ```text
//! list top-level ─> count files ─> plan degree ─> split ─┬─> chunk 1 ─> rsync ─┐
//!                                                        ├─> chunk 2 ─> rsync ─┼─> merge
//!                                                        └─> chunk N ─> rsync ─┘
//! ```
//!
//! Chunks are independent, best-effort units: if any fails the call fails,
//! and chunks that succeeded are neither rolled back nor reported as partial
//! success.

pub mod report;

pub use report::{format_megabytes, TransferReport};

use crate::config::{EngineConfig, SyncRequest};
use crate::error::{ChunkFailure, Result, SyncError};
use crate::filter::ExclusionFilter;
use crate::plan::{self, Chunk};
use crate::rsync::{self, Selection, TransferStats};
use crate::scan;
use crate::transport::{detect_transport, Invocation, Transport};
use colored::Colorize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, OnceCell};
use tokio_util::sync::CancellationToken;

/// Result of one chunk's rsync invocation
#[derive(Debug)]
pub struct ChunkResult {
    pub worker_id: usize,
    pub outcome: Result<TransferStats>,
}

/// Runs syncs with one engine configuration.
///
/// The transport is detected on first use and reused for every chunk and
/// every later call on the same `Syncer`.
pub struct Syncer {
    engine: EngineConfig,
    transport: OnceCell<Arc<dyn Transport>>,
}

/// State shared by every chunk task of one sync call
struct ChunkContext {
    request: SyncRequest,
    filter: ExclusionFilter,
    engine: EngineConfig,
    transport: Arc<dyn Transport>,
}

impl ChunkContext {
    async fn run(
        &self,
        worker_id: usize,
        selection: Selection,
        cancel: &CancellationToken,
    ) -> Result<TransferStats> {
        let invocation = Invocation {
            worker_id,
            request: &self.request,
            filter: &self.filter,
            selection: &selection,
            engine: &self.engine,
        };

        let output = self.transport.run(&invocation, cancel).await?;
        if self.request.options.verbose && !output.stdout.is_empty() {
            print!("{}", output.stdout);
        }
        rsync::classify(worker_id, &output)
    }
}

impl Syncer {
    pub fn new(engine: EngineConfig) -> Self {
        Self {
            engine,
            transport: OnceCell::new(),
        }
    }

    /// Use `transport` instead of probing the host
    pub fn with_transport(engine: EngineConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            engine,
            transport: OnceCell::new_with(Some(transport)),
        }
    }

    pub fn engine(&self) -> &EngineConfig {
        &self.engine
    }

    pub async fn transport(&self) -> Arc<dyn Transport> {
        self.transport
            .get_or_init(|| detect_transport(&self.engine))
            .await
            .clone()
    }

    /// Sync `request.local_path` into `request.remote_path` on the worker.
    pub async fn sync(
        &self,
        request: &SyncRequest,
        cancel: &CancellationToken,
    ) -> Result<TransferReport> {
        let started = Instant::now();
        let options = &request.options;

        rsync::ensure_available(&self.engine.rsync, self.engine.timeouts.probe).await?;

        let filter = ExclusionFilter::new(options.exclude_patterns.iter().cloned());
        let entries = scan::list_top_level(&request.local_path, &filter)?;

        // Only the automatic plan needs a file count
        let total_files = if options.parallelism == 0 && !entries.is_empty() {
            let root = request.local_path.clone();
            let walk_filter = filter.clone();
            tokio::task::spawn_blocking(move || scan::count_files(&root, &walk_filter))
                .await
                .map_err(|e| SyncError::Io(std::io::Error::other(e)))?
        } else {
            0
        };

        let Some(degree) = plan::plan(total_files, entries.len(), options.parallelism) else {
            println!("Nothing to sync");
            return Ok(TransferReport::nothing_to_sync(started.elapsed()));
        };

        let transport = self.transport().await;
        tracing::info!(
            "Syncing {} top-level entries ({} files) with {} rsync invocation(s) via {}",
            entries.len(),
            total_files,
            degree,
            transport.name()
        );

        let ctx = Arc::new(ChunkContext {
            request: request.clone(),
            filter,
            engine: self.engine.clone(),
            transport,
        });

        let (stats, chunks) = if degree == 1 {
            (ctx.run(1, Selection::All, cancel).await?, 1)
        } else {
            let chunks = plan::split(entries, degree);
            let total = chunks.len();
            (run_chunks(ctx, chunks, cancel).await?, total)
        };

        let report = TransferReport::new(stats, started.elapsed(), chunks);
        println!("{} {}", "✓".green(), report.summary());
        Ok(report)
    }
}

/// Run every chunk concurrently; sum the stats or fail with every chunk error.
async fn run_chunks(
    ctx: Arc<ChunkContext>,
    chunks: Vec<Chunk>,
    cancel: &CancellationToken,
) -> Result<TransferStats> {
    let total = chunks.len();
    let (tx, mut rx) = mpsc::channel::<ChunkResult>(total);
    let mut pending: BTreeSet<usize> = chunks.iter().map(|c| c.worker_id).collect();

    for Chunk {
        worker_id,
        entries,
    } in chunks
    {
        let ctx = Arc::clone(&ctx);
        let tx = tx.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let outcome = ctx.run(worker_id, Selection::Entries(entries), &cancel).await;
            let _ = tx.send(ChunkResult { worker_id, outcome }).await;
        });
    }
    drop(tx);

    let mut stats = TransferStats::default();
    let mut failed = Vec::new();
    while let Some(result) = rx.recv().await {
        pending.remove(&result.worker_id);
        match result.outcome {
            Ok(chunk_stats) => {
                tracing::debug!("Chunk {} done: {:?}", result.worker_id, chunk_stats);
                stats.merge(chunk_stats);
            }
            Err(error) => {
                eprintln!("{} chunk {}: {}", "Error:".red(), result.worker_id, error);
                failed.push(ChunkFailure {
                    worker_id: result.worker_id,
                    error,
                });
            }
        }
    }

    // A task that panicked never reports back
    for worker_id in pending {
        let error = SyncError::Io(std::io::Error::other("chunk task exited without a result"));
        eprintln!("{} chunk {}: {}", "Error:".red(), worker_id, error);
        failed.push(ChunkFailure { worker_id, error });
    }

    if cancel.is_cancelled() {
        return Err(SyncError::Cancelled);
    }
    if !failed.is_empty() {
        failed.sort_by_key(|f| f.worker_id);
        return Err(SyncError::AggregateFailure { failed, total });
    }
    Ok(stats)
}

/// Sync with default engine settings and no external cancellation.
pub async fn sync(request: &SyncRequest) -> Result<TransferReport> {
    Syncer::new(EngineConfig::default())
        .sync(request, &CancellationToken::new())
        .await
}
