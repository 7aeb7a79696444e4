//! Bridge fidelity tests against a local WebSocket server standing in for the worker.

use futures::{SinkExt, StreamExt};
use sandsync::bridge::{relay, BridgeSession};
use sandsync::SyncError;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Accept one WebSocket client, record every binary payload until it closes
async fn collecting_worker() -> anyhow::Result<(Url, JoinHandle<Vec<u8>>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let url = Url::parse(&format!("ws://{}/ssh?token=t", listener.local_addr()?))?;

    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let mut received = Vec::new();
        while let Some(Ok(msg)) = ws.next().await {
            if let Message::Binary(data) = msg {
                received.extend_from_slice(&data);
            }
        }
        received
    });

    Ok((url, handle))
}

fn delayed_dial(
    url: Url,
    delay: Duration,
) -> impl std::future::Future<
    Output = sandsync::Result<
        tokio_tungstenite::WebSocketStream<
            tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
        >,
    >,
> {
    async move {
        tokio::time::sleep(delay).await;
        let (ws, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| SyncError::connection("dial", e))?;
        Ok(ws)
    }
}

fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

// =============================================================================
// TCP -> WebSocket
// =============================================================================

#[tokio::test]
async fn test_bytes_written_before_dial_are_delivered() -> anyhow::Result<()> {
    let (url, worker) = collecting_worker().await?;
    let (bridge_side, mut ssh_side) = tokio::io::duplex(64 * 1024);

    let relay_task = tokio::spawn(relay(
        bridge_side,
        delayed_dial(url, Duration::from_millis(200)),
        CancellationToken::new(),
    ));

    // ssh speaks first: its banner goes out before the WebSocket exists
    let data = payload(150_000);
    ssh_side.write_all(&data[..40_000]).await?;
    tokio::time::sleep(Duration::from_millis(400)).await;
    ssh_side.write_all(&data[40_000..]).await?;
    ssh_side.shutdown().await?;

    let stats = relay_task.await??;
    assert_eq!(stats.tcp_to_ws, data.len() as u64);

    let received = worker.await?;
    assert_eq!(received.len(), data.len());
    assert!(received == data, "byte stream was reordered or corrupted");
    Ok(())
}

#[tokio::test]
async fn test_order_preserved_across_timings() -> anyhow::Result<()> {
    let cases = [
        (Duration::ZERO, 1usize),
        (Duration::from_millis(50), 7),
        (Duration::from_millis(150), 4096),
        (Duration::from_millis(10), 100_000),
    ];

    for (delay, write_size) in cases {
        let (url, worker) = collecting_worker().await?;
        let (bridge_side, mut ssh_side) = tokio::io::duplex(16 * 1024);
        let relay_task = tokio::spawn(relay(
            bridge_side,
            delayed_dial(url, delay),
            CancellationToken::new(),
        ));

        let data = payload(60_000);
        for piece in data.chunks(write_size) {
            ssh_side.write_all(piece).await?;
        }
        ssh_side.shutdown().await?;

        relay_task.await??;
        let received = worker.await?;
        assert!(
            received == data,
            "mismatch with dial delay {:?} and write size {}",
            delay,
            write_size
        );
    }
    Ok(())
}

// =============================================================================
// WebSocket -> TCP
// =============================================================================

#[tokio::test]
async fn test_worker_frames_reach_tcp() -> anyhow::Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let url = Url::parse(&format!("ws://{}/ssh?token=t", listener.local_addr()?))?;

    let worker = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        ws.send(Message::Binary("SSH-2.0-worker\r\n".into())).await.unwrap();
        ws.send(Message::Binary("payload".into())).await.unwrap();
        ws.close(None).await.unwrap();
        while let Some(Ok(_)) = ws.next().await {}
    });

    let (bridge_side, mut ssh_side) = tokio::io::duplex(64 * 1024);
    let relay_task = tokio::spawn(relay(
        bridge_side,
        delayed_dial(url, Duration::ZERO),
        CancellationToken::new(),
    ));

    let mut got = Vec::new();
    ssh_side.read_to_end(&mut got).await?;
    assert_eq!(got, b"SSH-2.0-worker\r\npayload");

    ssh_side.shutdown().await?;
    let stats = relay_task.await??;
    assert_eq!(stats.ws_to_tcp, got.len() as u64);
    worker.await?;
    Ok(())
}

// =============================================================================
// Failure and cancellation
// =============================================================================

#[tokio::test]
async fn test_handshake_timeout() -> anyhow::Result<()> {
    // Accepts TCP but never answers the HTTP upgrade
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let url = Url::parse(&format!("ws://{}/ssh?token=t", listener.local_addr()?))?;
    let silent = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        drop(stream);
    });

    let (bridge_side, _ssh_side) = tokio::io::duplex(1024);
    let session = BridgeSession::new(url, Duration::from_millis(200));
    let err = session
        .run(bridge_side, CancellationToken::new())
        .await
        .unwrap_err();

    assert!(err.is_connection(), "unexpected error: {}", err);
    assert!(err.to_string().contains("timed out"));
    silent.abort();
    Ok(())
}

#[tokio::test]
async fn test_dial_refused() -> anyhow::Result<()> {
    // Grab a free port, then close it so the dial is refused
    let port = TcpListener::bind("127.0.0.1:0").await?.local_addr()?.port();
    let url = Url::parse(&format!("ws://127.0.0.1:{}/ssh?token=t", port))?;

    let (bridge_side, _ssh_side) = tokio::io::duplex(1024);
    let err = BridgeSession::new(url, Duration::from_secs(5))
        .run(bridge_side, CancellationToken::new())
        .await
        .unwrap_err();
    assert!(err.is_connection());
    Ok(())
}

#[tokio::test]
async fn test_cancel_stops_relay() -> anyhow::Result<()> {
    let (url, _worker) = collecting_worker().await?;
    let (bridge_side, _ssh_side) = tokio::io::duplex(1024);
    let cancel = CancellationToken::new();

    let relay_task = tokio::spawn(relay(
        bridge_side,
        delayed_dial(url, Duration::ZERO),
        cancel.clone(),
    ));
    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();

    let result = tokio::time::timeout(Duration::from_secs(5), relay_task).await??;
    assert!(matches!(result, Err(SyncError::Cancelled)));
    Ok(())
}
