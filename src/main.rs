use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use sandsync::{FileConfig, SyncOptions, SyncRequest, Syncer, TransportPreference};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Sync a local directory into a remote sandbox over its WebSocket endpoint
#[derive(Debug, Parser)]
#[command(name = "sandsync", version, about)]
struct Cli {
    /// Local directory to sync
    local: PathBuf,

    /// Destination path inside the sandbox
    remote: String,

    /// Base URL of the sandbox worker
    #[arg(long, env = "SANDSYNC_WORKER_URL")]
    worker_url: String,

    /// Access token for the worker
    #[arg(long, env = "SANDSYNC_TOKEN", hide_env_values = true)]
    token: String,

    /// Delete remote files that don't exist locally
    #[arg(long)]
    delete: bool,

    /// Show what would be transferred without changing anything
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Verbose output (rsync file list, debug logs)
    #[arg(short, long)]
    verbose: bool,

    /// Additional exclude pattern (repeatable)
    #[arg(long = "exclude", value_name = "PATTERN")]
    exclude: Vec<String>,

    /// Number of parallel rsync invocations (0 = auto)
    #[arg(long = "parallel", value_name = "N", default_value_t = 0)]
    parallel: usize,

    /// Transport to the worker
    #[arg(long, value_enum)]
    transport: Option<TransportPreference>,

    /// Config file (default: <config dir>/sandsync/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "sandsync=debug" } else { "sandsync=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let file_config = match cli.config.clone().or_else(FileConfig::default_path) {
        Some(path) => FileConfig::load(&path)?,
        None => FileConfig::default(),
    };

    let mut engine = file_config.engine();
    if let Some(transport) = cli.transport {
        engine.transport = transport;
    }

    let mut options = SyncOptions {
        delete: cli.delete,
        dry_run: cli.dry_run,
        verbose: cli.verbose,
        exclude_patterns: cli.exclude,
        parallelism: cli.parallel,
    };
    file_config.apply_to(&mut options);

    let request = SyncRequest {
        worker_url: cli.worker_url,
        token: cli.token,
        local_path: cli.local,
        remote_path: cli.remote,
        options,
    };

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted; stopping rsync");
            on_signal.cancel();
        }
    });

    Syncer::new(engine)
        .sync(&request, &cancel)
        .await
        .with_context(|| format!("sync of {} failed", request.local_path.display()))?;
    Ok(())
}
