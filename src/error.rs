//! Error types for sandbox sync operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SyncError>;

/// Main error type for sync operations
#[derive(Debug, Error)]
pub enum SyncError {
    /// A required local binary could not be started
    #[error("{tool} is not available on this host (install {tool} to sync files): {source}")]
    ToolMissing {
        tool: String,
        #[source]
        source: io::Error,
    },

    /// The local source tree could not be listed
    #[error("failed to read directory {}: {source}", .path.display())]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Listener, accept, dial or handshake failure
    #[error("connection error: {0}")]
    Connection(String),

    /// Worker URL could not be turned into a WebSocket endpoint
    #[error("invalid worker URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// rsync exited unsuccessfully
    #[error("rsync exited with {}: {}", exit_label(.code), stderr_label(.stderr))]
    RsyncProcess { code: Option<i32>, stderr: String },

    /// One or more parallel chunks failed
    #[error("{} of {total} chunks failed: {}", .failed.len(), describe_failures(.failed))]
    AggregateFailure {
        failed: Vec<ChunkFailure>,
        total: usize,
    },

    /// Caller aborted the sync
    #[error("sync cancelled")]
    Cancelled,

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl SyncError {
    pub fn connection(context: &str, err: impl std::fmt::Display) -> Self {
        SyncError::Connection(format!("{}: {}", context, err))
    }

    /// Whether this error is a transport-level failure rather than an rsync failure
    pub fn is_connection(&self) -> bool {
        matches!(self, SyncError::Connection(_))
    }
}

/// A single failed chunk inside an aggregate failure
#[derive(Debug)]
pub struct ChunkFailure {
    pub worker_id: usize,
    pub error: SyncError,
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "a signal".to_string(),
    }
}

fn stderr_label(stderr: &str) -> &str {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        "(no stderr output)"
    } else {
        trimmed
    }
}

fn describe_failures(failed: &[ChunkFailure]) -> String {
    failed
        .iter()
        .map(|f| format!("chunk {}: {}", f.worker_id, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsync_process_message() {
        let err = SyncError::RsyncProcess {
            code: Some(23),
            stderr: "rsync: some files vanished\n".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "rsync exited with exit code 23: rsync: some files vanished"
        );

        let err = SyncError::RsyncProcess {
            code: None,
            stderr: String::new(),
        };
        assert_eq!(err.to_string(), "rsync exited with a signal: (no stderr output)");
    }

    #[test]
    fn test_aggregate_failure_names_every_chunk() {
        let err = SyncError::AggregateFailure {
            failed: vec![
                ChunkFailure {
                    worker_id: 2,
                    error: SyncError::Connection("dial timed out".to_string()),
                },
                ChunkFailure {
                    worker_id: 4,
                    error: SyncError::Cancelled,
                },
            ],
            total: 4,
        };
        let msg = err.to_string();
        assert!(msg.starts_with("2 of 4 chunks failed"));
        assert!(msg.contains("chunk 2: connection error: dial timed out"));
        assert!(msg.contains("chunk 4: sync cancelled"));
    }
}
