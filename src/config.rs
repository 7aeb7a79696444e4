//! Sync request, per-call options, and engine configuration.

use crate::error::{Result, SyncError};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// User-facing options for a single sync call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Pass `--delete` to rsync
    pub delete: bool,
    /// Pass `-n` to rsync
    pub dry_run: bool,
    /// Pass `-v` to rsync and echo its output
    pub verbose: bool,
    /// Extra patterns appended to the built-in exclusion list
    pub exclude_patterns: Vec<String>,
    /// Number of parallel rsync invocations (0 = auto)
    pub parallelism: usize,
}

/// Everything one sync needs from the caller
#[derive(Debug, Clone)]
pub struct SyncRequest {
    /// HTTP(S) base URL of the sandbox worker
    pub worker_url: String,
    /// Opaque token; sent as a query parameter and, for the bridge, as SSH username
    pub token: String,
    pub local_path: PathBuf,
    pub remote_path: String,
    pub options: SyncOptions,
}

/// How to reach the worker's `/ssh` endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransportPreference {
    /// Probe curl for WebSocket support, fall back to the built-in bridge
    #[default]
    Auto,
    /// Always use curl as the SSH ProxyCommand
    Curl,
    /// Always use the built-in TCP-to-WebSocket bridge
    Bridge,
}

/// Fixed timeouts for blocking points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Waiting for ssh to connect to the local bridge listener
    pub accept: Duration,
    /// WebSocket dial including the HTTP upgrade
    pub handshake: Duration,
    /// How long the bridge may linger after rsync exits
    pub bridge_shutdown: Duration,
    /// `curl --version` / `rsync --version` probes
    pub probe: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            accept: Duration::from_secs(30),
            handshake: Duration::from_secs(30),
            bridge_shutdown: Duration::from_secs(5),
            probe: Duration::from_secs(5),
        }
    }
}

/// Host tooling and transport settings, shared by every chunk of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub rsync: PathBuf,
    pub transport: TransportPreference,
    /// Explicit curl binary; skips the candidate list when probing
    pub curl: Option<PathBuf>,
    pub timeouts: Timeouts,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rsync: PathBuf::from("rsync"),
            transport: TransportPreference::Auto,
            curl: None,
            timeouts: Timeouts::default(),
        }
    }
}

/// On-disk configuration (`<config_dir>/sandsync/config.toml`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub exclude: Vec<String>,
    pub parallel: Option<usize>,
    pub transport: Option<TransportPreference>,
    pub curl: Option<PathBuf>,
    pub rsync: Option<PathBuf>,
    pub accept_timeout_secs: Option<u64>,
    pub handshake_timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Default location, if the platform has a config directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("sandsync").join("config.toml"))
    }

    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content)
                .map_err(|e| SyncError::Config(format!("{}: {}", path.display(), e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(SyncError::Config(format!(
                "cannot read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Engine settings with file values layered over the defaults
    pub fn engine(&self) -> EngineConfig {
        let defaults = EngineConfig::default();
        let mut timeouts = defaults.timeouts;
        if let Some(secs) = self.accept_timeout_secs {
            timeouts.accept = Duration::from_secs(secs);
        }
        if let Some(secs) = self.handshake_timeout_secs {
            timeouts.handshake = Duration::from_secs(secs);
        }

        EngineConfig {
            rsync: self.rsync.clone().unwrap_or(defaults.rsync),
            transport: self.transport.unwrap_or(defaults.transport),
            curl: self.curl.clone(),
            timeouts,
        }
    }

    /// Merge file defaults into CLI-provided options (CLI wins, excludes accumulate)
    pub fn apply_to(&self, options: &mut SyncOptions) {
        options.exclude_patterns.extend(self.exclude.iter().cloned());
        if options.parallelism == 0 {
            options.parallelism = self.parallel.unwrap_or(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_full_file() {
        let config = FileConfig::parse(
            r#"
            exclude = ["fixtures", "*.bak"]
            parallel = 3
            transport = "bridge"
            rsync = "/opt/rsync/bin/rsync"
            accept_timeout_secs = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.exclude, vec!["fixtures", "*.bak"]);
        assert_eq!(config.parallel, Some(3));
        assert_eq!(config.transport, Some(TransportPreference::Bridge));

        let engine = config.engine();
        assert_eq!(engine.rsync, PathBuf::from("/opt/rsync/bin/rsync"));
        assert_eq!(engine.transport, TransportPreference::Bridge);
        assert_eq!(engine.timeouts.accept, Duration::from_secs(10));
        assert_eq!(engine.timeouts.handshake, Duration::from_secs(30));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(FileConfig::parse("paralel = 3").is_err());
    }

    #[test]
    fn test_missing_file_is_default() {
        let temp = TempDir::new().unwrap();
        let config = FileConfig::load(&temp.path().join("config.toml")).unwrap();
        assert_eq!(config, FileConfig::default());
        assert_eq!(config.engine(), EngineConfig::default());
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "parallel = \"many\"").unwrap();
        let err = FileConfig::load(&path).unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }

    #[test]
    fn test_apply_to_cli_wins() {
        let file = FileConfig {
            exclude: vec!["tmp".to_string()],
            parallel: Some(4),
            ..Default::default()
        };

        let mut options = SyncOptions {
            exclude_patterns: vec!["*.bak".to_string()],
            parallelism: 2,
            ..Default::default()
        };
        file.apply_to(&mut options);
        assert_eq!(options.parallelism, 2);
        assert_eq!(options.exclude_patterns, vec!["*.bak", "tmp"]);

        let mut auto = SyncOptions::default();
        file.apply_to(&mut auto);
        assert_eq!(auto.parallelism, 4);
    }
}
