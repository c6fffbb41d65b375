//! WebSocket transport: accept loop and per-viewer tasks.
//!
//! This module is responsible for:
//!
//! 1. Binding a TCP listener (with `SO_REUSEADDR`) on the configured address.
//! 2. Accepting connections and upgrading each one to a WebSocket.
//! 3. Registering a [`WebSocketViewer`] sink for the connection in the
//!    session's [`ClientRegistry`].
//! 4. Running two halves per viewer:
//!    - **Writer**: waits on the viewer's frame slot and sends each new frame
//!      as one binary message.
//!    - **Reader**: feeds every text message to the [`ControlChannel`] on
//!      Tokio's blocking pool, one at a time.
//! 5. Unregistering the viewer when it closes or errors.
//! 6. Leaving the accept loop when the `running` flag is cleared.
//!
//! # Per-viewer frame slot
//!
//! The broadcast loop runs on a plain OS thread and must never wait on a
//! socket.  Each viewer therefore gets a `tokio::sync::watch` channel: the
//! sink overwrites the slot and returns immediately, and the writer task
//! sends whatever is newest when the socket is ready.  A slow viewer skips
//! stale frames instead of building a backlog.  Once the writer task is
//! gone the slot has no receiver, `deliver` fails, and the broadcast loop
//! drops the viewer.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::watch;
use tokio::time::timeout;
use tokio_tungstenite::{accept_async, tungstenite::Message as WsMessage, WebSocketStream};
use tracing::{debug, error, info, warn};

use screen_relay_core::{ClientRegistry, DeliveryError, Frame, ViewerSink};

use crate::application::ControlChannel;

/// How often the accept loop re-checks the `running` flag.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Pending-connection backlog passed to `listen(2)`.
const LISTEN_BACKLOG: u32 = 1024;

type WsSink = SplitSink<WebSocketStream<TcpStream>, WsMessage>;

// ── Viewer sink ───────────────────────────────────────────────────────────────

/// Registry entry for one WebSocket viewer.
pub struct WebSocketViewer {
    slot: watch::Sender<Option<Frame>>,
}

impl WebSocketViewer {
    /// Creates the sink and the receiving end its writer task waits on.
    pub fn channel() -> (Self, watch::Receiver<Option<Frame>>) {
        let (slot, rx) = watch::channel(None);
        (Self { slot }, rx)
    }
}

impl ViewerSink for WebSocketViewer {
    fn deliver(&self, frame: &Frame) -> Result<(), DeliveryError> {
        self.slot
            .send(Some(frame.clone()))
            .map_err(|_| DeliveryError::Disconnected)
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Binds the WebSocket listener with address reuse enabled.
///
/// # Errors
///
/// Returns an error if the socket cannot be created or bound (port in use,
/// missing permission, ...).
pub async fn bind_listener(addr: SocketAddr) -> anyhow::Result<TcpListener> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()
    } else {
        TcpSocket::new_v6()
    }
    .context("failed to create listener socket")?;
    socket
        .set_reuseaddr(true)
        .context("failed to set SO_REUSEADDR")?;
    socket
        .bind(addr)
        .with_context(|| format!("failed to bind WebSocket listener on {addr}"))?;
    socket
        .listen(LISTEN_BACKLOG)
        .with_context(|| format!("failed to listen on {addr}"))
}

/// Runs the accept loop on `listener` until `running` is set to `false`.
///
/// Each accepted connection is handed to its own Tokio task, so a slow
/// handshake never delays other viewers.
///
/// # Errors
///
/// Currently never fails once the listener exists; accept errors are logged
/// and the loop continues.
pub async fn serve(
    listener: TcpListener,
    registry: Arc<ClientRegistry>,
    channel: Arc<ControlChannel>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("WebSocket server listening on ws://{addr}");
    }

    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        match timeout(ACCEPT_POLL_INTERVAL, listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                debug!("new connection from {peer_addr}");
                let registry = Arc::clone(&registry);
                let channel = Arc::clone(&channel);
                tokio::spawn(async move {
                    handle_viewer(stream, peer_addr, registry, channel).await;
                });
            }
            Ok(Err(e)) => {
                // Transient accept error (e.g. too many open file descriptors).
                error!("accept error: {e}");
            }
            Err(_) => {
                // Timeout; loop back to check the `running` flag.
            }
        }
    }

    Ok(())
}

/// Binds `addr` and runs [`serve`] on it.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound.
pub async fn run_server(
    addr: SocketAddr,
    registry: Arc<ClientRegistry>,
    channel: Arc<ControlChannel>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let listener = bind_listener(addr).await?;
    serve(listener, registry, channel, running).await
}

// ── Per-viewer handler ────────────────────────────────────────────────────────

async fn handle_viewer(
    stream: TcpStream,
    peer_addr: SocketAddr,
    registry: Arc<ClientRegistry>,
    channel: Arc<ControlChannel>,
) {
    match run_viewer(stream, peer_addr, registry, channel).await {
        Ok(()) => info!("viewer {peer_addr} disconnected"),
        Err(e) => warn!("viewer {peer_addr} closed with error: {e:#}"),
    }
}

/// Runs one viewer from handshake to close.
async fn run_viewer(
    stream: TcpStream,
    peer_addr: SocketAddr,
    registry: Arc<ClientRegistry>,
    channel: Arc<ControlChannel>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream)
        .await
        .with_context(|| format!("WebSocket handshake failed with {peer_addr}"))?;

    let (ws_tx, mut ws_rx) = ws_stream.split();
    let (sink, frames) = WebSocketViewer::channel();
    let id = registry.add(Arc::new(sink));
    info!("viewer {peer_addr} connected as {id}");

    let writer = tokio::spawn(write_frames(ws_tx, frames));

    let result = loop {
        match ws_rx.next().await {
            Some(Ok(WsMessage::Text(text))) => {
                dispatch_control(&channel, text).await;
            }
            Some(Ok(WsMessage::Close(_))) | None => break Ok(()),
            Some(Ok(_)) => {
                // Binary, ping and pong frames carry nothing for us.
            }
            Some(Err(e)) => break Err(anyhow::Error::new(e).context("read failed")),
        }
    };

    registry.remove(id);
    writer.abort();
    result
}

/// Runs one control message on the blocking pool.
///
/// Injection takes the X display lock, which the capture thread holds for a
/// whole `XGetImage`; that wait must not park a runtime worker.  Awaiting the
/// result keeps one viewer's messages in order.
async fn dispatch_control(channel: &Arc<ControlChannel>, text: String) {
    let channel = Arc::clone(channel);
    if let Err(e) = tokio::task::spawn_blocking(move || channel.handle_message(&text)).await {
        error!("control message dispatch failed: {e}");
    }
}

/// Sends each new frame from the viewer's slot until the slot's sender is
/// dropped or the socket fails.
async fn write_frames(mut ws_tx: WsSink, mut frames: watch::Receiver<Option<Frame>>) {
    while frames.changed().await.is_ok() {
        let frame = frames.borrow_and_update().clone();
        let Some(frame) = frame else { continue };
        if let Err(e) = ws_tx.send(WsMessage::Binary(frame.to_vec())).await {
            debug!("frame write failed: {e}");
            break;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
