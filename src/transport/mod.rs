//! How rsync's ssh reaches the worker.
//!
//! Two strategies share one [`Transport`] interface:
//!
//! - [`CurlProxyTransport`]: ssh runs `curl` as its `ProxyCommand`, relying on
//!   curl's own WebSocket support.
//! - [`BridgeTransport`]: ssh connects to a local one-shot listener and an
//!   in-process [`BridgeSession`](crate::bridge::BridgeSession) relays bytes
//!   to the worker.
//!
//! [`detect_transport`] picks one per run based on what the host's curl can do.

pub mod detect;
pub mod proxy;
pub mod tunnel;

pub use detect::{curl_candidates, find_websocket_curl, supports_websocket};
pub use proxy::CurlProxyTransport;
pub use tunnel::BridgeTransport;

use crate::config::{EngineConfig, SyncRequest, TransportPreference};
use crate::error::{Result, SyncError};
use crate::filter::ExclusionFilter;
use crate::rsync::{redact_args, RsyncArgs, RsyncOutput, Selection};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Everything one rsync invocation needs, independent of transport
#[derive(Debug)]
pub struct Invocation<'a> {
    pub worker_id: usize,
    pub request: &'a SyncRequest,
    pub filter: &'a ExclusionFilter,
    pub selection: &'a Selection,
    pub engine: &'a EngineConfig,
}

impl Invocation<'_> {
    pub fn rsync_args(&self, remote_shell: String, destination: String) -> Vec<String> {
        RsyncArgs {
            options: &self.request.options,
            filter: self.filter,
            selection: self.selection,
            local_path: &self.request.local_path,
            remote_shell,
            destination,
        }
        .build()
    }

    /// `args` with the token masked, for logs
    pub fn redacted(&self, args: &[String]) -> Vec<String> {
        redact_args(args, &self.request.token)
    }

    pub fn websocket_url(&self) -> Result<Url> {
        websocket_url(&self.request.worker_url, &self.request.token)
    }
}

/// A way of running rsync against the worker
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Run rsync to completion for one invocation
    async fn run(
        &self,
        invocation: &Invocation<'_>,
        cancel: &CancellationToken,
    ) -> Result<RsyncOutput>;
}

/// `{ws,wss}://<host>/<path>/ssh?token=<urlencoded token>`
pub fn websocket_url(worker_url: &str, token: &str) -> Result<Url> {
    let invalid = |reason: String| SyncError::InvalidUrl {
        url: worker_url.to_string(),
        reason,
    };

    let mut url = Url::parse(worker_url).map_err(|e| invalid(e.to_string()))?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(invalid(format!("unsupported scheme '{}'", other))),
    };
    url.set_scheme(scheme)
        .map_err(|_| invalid(format!("cannot switch scheme to {}", scheme)))?;

    let path = format!("{}/ssh", url.path().trim_end_matches('/'));
    url.set_path(&path);
    url.set_fragment(None);
    url.set_query(None);
    url.query_pairs_mut().append_pair("token", token);

    Ok(url)
}

/// Choose the transport for this run.
pub async fn detect_transport(engine: &EngineConfig) -> Arc<dyn Transport> {
    match engine.transport {
        TransportPreference::Bridge => {
            tracing::debug!("Using built-in WebSocket bridge (forced)");
            Arc::new(BridgeTransport)
        }
        TransportPreference::Curl => {
            let curl = engine.curl.clone().unwrap_or_else(|| PathBuf::from("curl"));
            tracing::debug!("Using {} as ProxyCommand (forced)", curl.display());
            Arc::new(CurlProxyTransport::new(curl))
        }
        TransportPreference::Auto => {
            let candidates = match &engine.curl {
                Some(curl) => vec![curl.clone()],
                None => curl_candidates(),
            };
            match find_websocket_curl(&candidates, engine.timeouts.probe).await {
                Some(curl) => {
                    tracing::info!("Using {} as ProxyCommand", curl.display());
                    Arc::new(CurlProxyTransport::new(curl))
                }
                None => {
                    tracing::info!("No WebSocket-capable curl found; using built-in bridge");
                    Arc::new(BridgeTransport)
                }
            }
        }
    }
}
