//! # sandsync - rsync into network-isolated sandboxes
//!
//! Transfers a local directory tree into a remote sandbox whose only
//! reachable surface is an HTTP(S)/WebSocket endpoint. rsync's ssh stream is
//! tunnelled through the worker's `/ssh` WebSocket, either by curl acting as
//! ssh's `ProxyCommand` or by an in-process TCP-to-WebSocket bridge.
//!
//! Large trees are split by top-level entry into up to eight independent
//! rsync invocations that run concurrently; their `--stats` output is merged
//! into one report.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sandsync::{SyncOptions, SyncRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let request = SyncRequest {
//!         worker_url: "https://worker.example.com".to_string(),
//!         token: std::env::var("SANDSYNC_TOKEN")?,
//!         local_path: "./my-project".into(),
//!         remote_path: "/home/user/app".to_string(),
//!         options: SyncOptions::default(),
//!     };
//!     let report = sandsync::sync(&request).await?;
//!     println!("{} files", report.stats.files_transferred);
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod config;
pub mod error;
pub mod filter;
pub mod plan;
pub mod rsync;
pub mod scan;
pub mod sync;
pub mod transport;

pub use config::{EngineConfig, FileConfig, SyncOptions, SyncRequest, Timeouts, TransportPreference};
pub use error::{ChunkFailure, Result, SyncError};
pub use filter::ExclusionFilter;
pub use rsync::TransferStats;
pub use sync::{sync, ChunkResult, Syncer, TransferReport};
pub use transport::{detect_transport, Transport};
