//! curl ProxyCommand transport: ssh reaches the worker through `curl`.
//!
//! `curl -T .` streams stdin as the request body and `-N` disables output
//! buffering, so once the WebSocket upgrade succeeds curl is a plain
//! bidirectional relay between ssh and the worker. `--http1.1` is required
//! because the upgrade does not happen over HTTP/2.

use super::{Invocation, Transport};
use crate::error::Result;
use crate::rsync::{remote_destination, RsyncOutput, RunningRsync};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Placeholder host; ProxyCommand owns the connection, only the path matters
pub const SANDBOX_HOST: &str = "e2b-sandbox";

/// Placeholder user for the ProxyCommand transport
pub const SANDBOX_USER: &str = "user";

#[derive(Debug, Clone)]
pub struct CurlProxyTransport {
    curl: PathBuf,
}

impl CurlProxyTransport {
    pub fn new(curl: PathBuf) -> Self {
        Self { curl }
    }

    pub fn curl(&self) -> &PathBuf {
        &self.curl
    }

    pub fn proxy_command(&self, ws_url: &Url) -> String {
        format!(
            "{} --no-progress-meter -N --http1.1 -T . '{}'",
            self.curl.display(),
            ws_url
        )
    }

    /// Value for rsync's `-e`.
    ///
    /// ssh expands `%` tokens in ProxyCommand, so the percent-encoded token
    /// in the URL has every `%` doubled.
    pub fn remote_shell(&self, ws_url: &Url) -> String {
        format!(
            "ssh -o StrictHostKeyChecking=no -o UserKnownHostsFile=/dev/null -o \"ProxyCommand={}\"",
            self.proxy_command(ws_url).replace('%', "%%")
        )
    }
}

#[async_trait]
impl Transport for CurlProxyTransport {
    fn name(&self) -> &'static str {
        "curl"
    }

    async fn run(
        &self,
        invocation: &Invocation<'_>,
        cancel: &CancellationToken,
    ) -> Result<RsyncOutput> {
        let ws_url = invocation.websocket_url()?;
        let args = invocation.rsync_args(
            self.remote_shell(&ws_url),
            remote_destination(
                SANDBOX_USER,
                SANDBOX_HOST,
                &invocation.request.remote_path,
            ),
        );

        tracing::debug!(
            "Chunk {}: rsync via curl proxy {:?}",
            invocation.worker_id,
            invocation.redacted(&args)
        );
        RunningRsync::spawn(&invocation.engine.rsync, &args)?
            .wait(cancel)
            .await
    }
}
