//! rsync invocation: arguments, process handling, and result classification.

pub mod args;
pub mod process;
pub mod stats;

pub use args::{redact_args, remote_destination, RsyncArgs, Selection};
pub use process::{ensure_available, RsyncOutput, RunningRsync};
pub use stats::{parse_stats, TransferStats};

use crate::error::{Result, SyncError};

/// Prefix of the notice ssh prints when it records a host key in a throwaway known_hosts
const HOST_KEY_NOTICE: &str = "Warning: Permanently added";

/// True if stderr holds nothing but ssh host-key notices
pub fn is_benign_ssh_warning(stderr: &str) -> bool {
    let mut lines = stderr.lines().map(str::trim).filter(|l| !l.is_empty()).peekable();
    lines.peek().is_some() && lines.all(|l| l.starts_with(HOST_KEY_NOTICE))
}

/// Turn a finished rsync run into stats or an error.
///
/// A non-zero exit whose only stderr is the host-key notice still counts as
/// success when files were transferred.
pub fn classify(worker_id: usize, output: &RsyncOutput) -> Result<TransferStats> {
    let stats = parse_stats(&output.stdout);

    if output.success() {
        return Ok(stats);
    }

    if stats.files_transferred > 0 && is_benign_ssh_warning(&output.stderr) {
        tracing::warn!(
            "Chunk {}: rsync exited with {:?} but only reported a host-key notice; treating as success",
            worker_id,
            output.exit_code
        );
        return Ok(stats);
    }

    Err(SyncError::RsyncProcess {
        code: output.exit_code,
        stderr: output.stderr.clone(),
    })
}
