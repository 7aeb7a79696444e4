//! Bridge transport: ssh to a local listener, relayed to the worker in-process.
//!
//! The worker authenticates the "none" SSH method by username, so the token
//! travels as the user part of the rsync destination.

use super::{Invocation, Transport};
use crate::bridge::{BridgeSession, BridgeStats};
use crate::error::{Result, SyncError};
use crate::rsync::{remote_destination, RsyncOutput, RunningRsync};
use async_trait::async_trait;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

const LOOPBACK: &str = "127.0.0.1";

#[derive(Debug, Clone, Copy, Default)]
pub struct BridgeTransport;

/// Value for rsync's `-e`, pointed at the local bridge port
pub fn remote_shell(port: u16) -> String {
    format!(
        "ssh -p {} -o PreferredAuthentications=none -o PubkeyAuthentication=no \
         -o StrictHostKeyChecking=no -o UserKnownHostsFile=/dev/null",
        port
    )
}

enum Accepted {
    Stream(TcpStream),
    /// rsync exited before ssh ever connected
    Exited,
    Failed(SyncError),
}

#[async_trait]
impl Transport for BridgeTransport {
    fn name(&self) -> &'static str {
        "bridge"
    }

    async fn run(
        &self,
        invocation: &Invocation<'_>,
        cancel: &CancellationToken,
    ) -> Result<RsyncOutput> {
        let ws_url = invocation.websocket_url()?;
        let timeouts = invocation.engine.timeouts;

        let listener = TcpListener::bind((LOOPBACK, 0))
            .await
            .map_err(|e| SyncError::connection("cannot open local bridge listener", e))?;
        let port = listener
            .local_addr()
            .map_err(|e| SyncError::connection("cannot read bridge listener address", e))?
            .port();

        let args = invocation.rsync_args(
            remote_shell(port),
            remote_destination(
                &invocation.request.token,
                LOOPBACK,
                &invocation.request.remote_path,
            ),
        );

        tracing::debug!(
            "Chunk {}: rsync via bridge on {}:{} {:?}",
            invocation.worker_id,
            LOOPBACK,
            port,
            invocation.redacted(&args)
        );
        let mut rsync = RunningRsync::spawn(&invocation.engine.rsync, &args)?;

        let accepted = tokio::select! {
            res = tokio::time::timeout(timeouts.accept, listener.accept()) => match res {
                Ok(Ok((stream, peer))) => {
                    tracing::debug!("Chunk {}: ssh connected from {}", invocation.worker_id, peer);
                    Accepted::Stream(stream)
                }
                Ok(Err(e)) => Accepted::Failed(SyncError::connection("bridge accept failed", e)),
                Err(_) => Accepted::Failed(SyncError::Connection(format!(
                    "ssh did not connect to the bridge within {}s",
                    timeouts.accept.as_secs()
                ))),
            },
            _ = rsync.child_mut().wait() => Accepted::Exited,
            _ = cancel.cancelled() => Accepted::Failed(SyncError::Cancelled),
        };
        // One connection per session
        drop(listener);

        let stream = match accepted {
            Accepted::Stream(stream) => stream,
            Accepted::Exited => return rsync.wait(cancel).await,
            Accepted::Failed(e) => {
                rsync.kill().await;
                return Err(e);
            }
        };

        let bridge_cancel = cancel.child_token();
        let session = BridgeSession::new(ws_url, timeouts.handshake);
        let mut bridge = tokio::spawn(session.run(stream, bridge_cancel.clone()));

        let output = rsync.wait(cancel).await;

        // ssh closing its socket normally ends the bridge; don't wait forever if the worker stalls
        let bridge_result = match tokio::time::timeout(timeouts.bridge_shutdown, &mut bridge).await
        {
            Ok(joined) => flatten(joined),
            Err(_) => {
                bridge_cancel.cancel();
                flatten(bridge.await)
            }
        };

        let output = output?;
        match bridge_result {
            Err(e) if !output.success() && e.is_connection() => Err(e),
            Err(e) => {
                tracing::debug!("Chunk {}: bridge ended with {}", invocation.worker_id, e);
                Ok(output)
            }
            Ok(stats) => {
                tracing::debug!("Chunk {}: {:?}", invocation.worker_id, stats);
                Ok(output)
            }
        }
    }
}

fn flatten(
    joined: std::result::Result<Result<BridgeStats>, tokio::task::JoinError>,
) -> Result<BridgeStats> {
    joined.map_err(|e| SyncError::connection("bridge task failed", e))?
}
