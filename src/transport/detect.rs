//! Probe local curl binaries for WebSocket support.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Candidate curl binaries, most preferred first.
///
/// macOS ships a system curl built without WebSocket support, so Homebrew's
/// keg-only curl is tried before it.
pub fn curl_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if cfg!(target_os = "macos") {
        candidates.extend(
            [
                "/opt/homebrew/opt/curl/bin/curl",
                "/usr/local/opt/curl/bin/curl",
                "/opt/homebrew/bin/curl",
                "/usr/local/bin/curl",
            ]
            .into_iter()
            .map(PathBuf::from),
        );
    }
    candidates.push(PathBuf::from("curl"));
    candidates
}

/// True if `curl --version` output lists `ws` or `wss` among its protocols
pub fn supports_websocket(version_output: &str) -> bool {
    version_output
        .lines()
        .filter_map(|line| line.trim().strip_prefix("Protocols:"))
        .flat_map(str::split_whitespace)
        .any(|proto| proto == "ws" || proto == "wss")
}

/// Run `<curl> --version` and check its protocol list
pub async fn probe_curl(curl: &Path, timeout: Duration) -> bool {
    let mut cmd = Command::new(curl);
    cmd.arg("--version")
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);
    let output = cmd.output();

    match tokio::time::timeout(timeout, output).await {
        Ok(Ok(output)) if output.status.success() => {
            let supported = supports_websocket(&String::from_utf8_lossy(&output.stdout));
            tracing::debug!("{}: WebSocket support = {}", curl.display(), supported);
            supported
        }
        Ok(Ok(output)) => {
            tracing::debug!("{} --version exited with {}", curl.display(), output.status);
            false
        }
        Ok(Err(e)) => {
            tracing::debug!("{} not usable: {}", curl.display(), e);
            false
        }
        Err(_) => {
            tracing::debug!("{} --version timed out", curl.display());
            false
        }
    }
}

/// First candidate whose curl speaks WebSocket
pub async fn find_websocket_curl(candidates: &[PathBuf], timeout: Duration) -> Option<PathBuf> {
    for candidate in candidates {
        if probe_curl(candidate, timeout).await {
            return Some(candidate.clone());
        }
    }
    None
}
