//! TCP-to-WebSocket byte relay.
//!
//! Used when no WebSocket-capable curl exists: ssh connects to a local
//! listener and every byte it writes is forwarded as a binary frame to the
//! worker's `/ssh` endpoint, and vice versa.
//!
//! ```text
//!   ssh ──tcp──> [tcp reader] ──queue──> [forwarder] ──binary frames──> worker
//!   ssh <─tcp─── [ws reader]  <──────────────────────────────frames──── worker
//! ```
//!
//! The TCP reader starts before the dial completes. Whatever ssh writes in
//! the meantime waits in a bounded queue and is flushed in order once the
//! WebSocket is up.

use crate::error::{Result, SyncError};
use bytes::Bytes;
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Read size for the TCP side
pub const TCP_READ_SIZE: usize = 32 * 1024;

/// Chunks buffered between the TCP reader and the WebSocket writer
pub const QUEUE_DEPTH: usize = 64;

/// How long to wait for the worker to answer our close frame
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Bytes relayed in each direction
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BridgeStats {
    pub tcp_to_ws: u64,
    pub ws_to_tcp: u64,
}

/// One relay between a single accepted TCP connection and one WebSocket.
///
/// Never shared across chunks.
#[derive(Debug, Clone)]
pub struct BridgeSession {
    url: Url,
    handshake_timeout: Duration,
}

impl BridgeSession {
    pub fn new(url: Url, handshake_timeout: Duration) -> Self {
        Self {
            url,
            handshake_timeout,
        }
    }

    /// Dial the worker and relay until the TCP side closes.
    pub async fn run<S>(self, tcp: S, cancel: CancellationToken) -> Result<BridgeStats>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let Self {
            url,
            handshake_timeout,
        } = self;

        let dial = async move {
            tracing::debug!("Dialing {}", redact(&url));
            let connect = tokio_tungstenite::connect_async(url.as_str());
            match tokio::time::timeout(handshake_timeout, connect).await {
                Ok(Ok((ws, _response))) => Ok(ws),
                Ok(Err(e)) => Err(SyncError::connection("WebSocket dial failed", e)),
                Err(_) => Err(SyncError::Connection(format!(
                    "WebSocket handshake timed out after {}s",
                    handshake_timeout.as_secs()
                ))),
            }
        };

        relay(tcp, dial, cancel).await
    }
}

/// Relay between `tcp` and the WebSocket produced by `dial`.
///
/// Reading from `tcp` begins immediately, before `dial` resolves. Returns
/// once the TCP-to-WebSocket direction has finished and both directions'
/// tasks have exited.
pub async fn relay<S, D, W>(tcp: S, dial: D, cancel: CancellationToken) -> Result<BridgeStats>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
    D: Future<Output = Result<W>>,
    W: Stream<Item = std::result::Result<Message, WsError>>
        + Sink<Message, Error = WsError>
        + Send
        + Unpin
        + 'static,
{
    let (tcp_rd, mut tcp_wr) = tokio::io::split(tcp);
    let (tx, mut rx) = mpsc::channel::<Bytes>(QUEUE_DEPTH);

    let reader = tokio::spawn(read_tcp(tcp_rd, tx, cancel.clone()));

    let ws = tokio::select! {
        ws = dial => ws,
        _ = cancel.cancelled() => Err(SyncError::Cancelled),
    };
    let ws = match ws {
        Ok(ws) => ws,
        Err(e) => {
            // ssh sees EOF and gives up
            reader.abort();
            let _ = tcp_wr.shutdown().await;
            return Err(e);
        }
    };
    tracing::debug!("WebSocket connected; flushing queued TCP data");

    let (mut ws_tx, ws_rx) = ws.split();
    let writer = tokio::spawn(write_tcp(ws_rx, tcp_wr));

    let mut stats = BridgeStats::default();
    loop {
        let chunk = tokio::select! {
            chunk = rx.recv() => chunk,
            _ = cancel.cancelled() => break,
        };
        let Some(chunk) = chunk else {
            // TCP EOF
            let close = Message::Close(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: "".into(),
            }));
            if let Err(e) = ws_tx.send(close).await {
                tracing::debug!("Failed to send close frame: {}", e);
            }
            break;
        };

        let len = chunk.len() as u64;
        if let Err(e) = ws_tx.send(Message::Binary(chunk)).await {
            tracing::debug!("WebSocket write failed: {}", e);
            break;
        }
        stats.tcp_to_ws += len;
    }

    // The forwarding loop is done; stop reading TCP and give the worker a moment to close
    reader.abort();
    let _ = reader.await;

    let mut writer = writer;
    stats.ws_to_tcp = match tokio::time::timeout(CLOSE_GRACE, &mut writer).await {
        Ok(Ok(n)) => n,
        Ok(Err(_)) => 0,
        Err(_) => {
            writer.abort();
            let _ = writer.await;
            0
        }
    };

    tracing::debug!(
        "Bridge closed: {} bytes to worker, {} bytes from worker",
        stats.tcp_to_ws,
        stats.ws_to_tcp
    );

    if cancel.is_cancelled() {
        return Err(SyncError::Cancelled);
    }
    Ok(stats)
}

async fn read_tcp<R>(mut tcp: R, tx: mpsc::Sender<Bytes>, cancel: CancellationToken)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; TCP_READ_SIZE];
    loop {
        let n = tokio::select! {
            n = tcp.read(&mut buf) => n,
            _ = cancel.cancelled() => return,
        };
        match n {
            Ok(0) => return,
            Ok(n) => {
                if tx.send(Bytes::copy_from_slice(&buf[..n])).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                tracing::debug!("TCP read failed: {}", e);
                return;
            }
        }
    }
}

async fn write_tcp<R, W>(mut ws: R, mut tcp: W) -> u64
where
    R: Stream<Item = std::result::Result<Message, WsError>> + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut written = 0u64;
    while let Some(msg) = ws.next().await {
        let payload = match msg {
            Ok(Message::Binary(data)) => data,
            Ok(Message::Text(text)) => Bytes::copy_from_slice(text.as_bytes()),
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!("WebSocket read failed: {}", e);
                break;
            }
        };
        if let Err(e) = tcp.write_all(&payload).await {
            tracing::debug!("TCP write failed: {}", e);
            break;
        }
        written += payload.len() as u64;
    }
    let _ = tcp.shutdown().await;
    written
}

/// URL with the token query value hidden, for logs
pub fn redact(url: &Url) -> String {
    let mut shown = url.clone();
    if url.query().is_some() {
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| {
                let v = if k == "token" { "***".to_string() } else { v.into_owned() };
                (k.into_owned(), v)
            })
            .collect();
        shown.query_pairs_mut().clear().extend_pairs(pairs);
    }
    shown.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_token() {
        let url = Url::parse("wss://worker.example.com/ssh?token=secret").unwrap();
        assert_eq!(redact(&url), "wss://worker.example.com/ssh?token=***");
        assert!(!redact(&url).contains("secret"));

        let plain = Url::parse("ws://localhost:9000/ssh").unwrap();
        assert_eq!(redact(&plain), "ws://localhost:9000/ssh");
    }

    #[tokio::test]
    async fn test_dial_failure_closes_tcp() {
        let (bridge_side, mut ssh_side) = tokio::io::duplex(1024);
        let dial = async {
            Err::<tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>, _>(
                SyncError::Connection("refused".to_string()),
            )
        };

        let err = relay(bridge_side, dial, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_connection());

        let mut buf = [0u8; 8];
        let n = ssh_side.read(&mut buf).await.unwrap();
        assert_eq!(n, 0);
    }
}
