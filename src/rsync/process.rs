//! rsync child process supervision.

use crate::error::{Result, SyncError};
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Captured result of one rsync run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RsyncOutput {
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl RsyncOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// A spawned rsync whose stdout/stderr are being drained in the background
pub struct RunningRsync {
    child: Child,
    stdout: JoinHandle<String>,
    stderr: JoinHandle<String>,
}

impl RunningRsync {
    pub fn spawn(program: &Path, args: &[String]) -> Result<Self> {
        tracing::debug!("Spawning {} with {} arguments", program.display(), args.len());

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(program, e))?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        Ok(Self {
            child,
            stdout,
            stderr,
        })
    }

    pub fn child_mut(&mut self) -> &mut Child {
        &mut self.child
    }

    /// Wait for exit, killing the process if `cancel` fires first.
    pub async fn wait(mut self, cancel: &CancellationToken) -> Result<RsyncOutput> {
        let status = tokio::select! {
            status = self.child.wait() => status?,
            _ = cancel.cancelled() => {
                self.kill().await;
                return Err(SyncError::Cancelled);
            }
        };

        Ok(RsyncOutput {
            exit_code: status.code(),
            stdout: self.stdout.await.unwrap_or_default(),
            stderr: self.stderr.await.unwrap_or_default(),
        })
    }

    /// Kill and reap the process
    pub async fn kill(&mut self) {
        if let Err(e) = self.child.kill().await {
            tracing::debug!("Failed to kill rsync: {}", e);
        }
    }
}

fn spawn_error(program: &Path, e: std::io::Error) -> SyncError {
    if e.kind() == std::io::ErrorKind::NotFound {
        SyncError::ToolMissing {
            tool: program.display().to_string(),
            source: e,
        }
    } else {
        SyncError::Io(e)
    }
}

fn drain<R>(pipe: Option<R>) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            if let Err(e) = pipe.read_to_end(&mut buf).await {
                tracing::debug!("Error reading rsync output: {}", e);
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

/// Fail with `ToolMissing` unless `<program> --version` can be started.
pub async fn ensure_available(program: &Path, timeout: std::time::Duration) -> Result<()> {
    let mut cmd = Command::new(program);
    cmd.arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    match tokio::time::timeout(timeout, cmd.status()).await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) => Err(SyncError::ToolMissing {
            tool: program.display().to_string(),
            source: e,
        }),
        // It started, so it exists
        Err(_) => Ok(()),
    }
}
