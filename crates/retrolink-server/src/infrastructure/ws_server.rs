//! WebSocket server: accept loop and per-session task management.
//!
//! This module is responsible for:
//!
//! 1. Binding a TCP listener on the configured address.
//! 2. Accepting incoming TCP connections and upgrading them to WebSocket.
//! 3. Running one Tokio task per session: inbound text frames go through the
//!    [`Session`] request path, responses and subscribed events go back on
//!    the same socket.
//! 4. Shutting down gracefully when the `running` flag is cleared.
//!
//! The accept loop never blocks on a slow client: each accepted connection
//! is handed to its own task before the next `accept()`.  Slow or stalled
//! clients only ever delay themselves.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::{
    accept_async,
    tungstenite::{Error as WsError, Message as WsMessage},
};
use tracing::{debug, error, info, warn};

use retrolink_host::bridge::RequestBridge;

use crate::application::Session;
use crate::domain::ServerConfig;
use crate::infrastructure::broadcast::EventBroadcaster;

// ── Public API ────────────────────────────────────────────────────────────────

/// Binds the configured address and runs the accept loop until `running` is
/// cleared.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot be bound (port in use, no
/// permission to bind).
pub async fn run_server(
    config: &ServerConfig,
    bridge: RequestBridge,
    broadcaster: Arc<EventBroadcaster>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind WebSocket listener on {}", config.bind_addr))?;

    info!("control server listening on {}", config.bind_addr);
    serve(listener, bridge, broadcaster, running).await
}

/// Runs the accept loop on an already-bound listener.
///
/// Split out from [`run_server`] so tests can bind an ephemeral port first
/// and learn its address before serving.
pub async fn serve(
    listener: TcpListener,
    bridge: RequestBridge,
    broadcaster: Arc<EventBroadcaster>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        // A short timeout on accept() lets the loop re-check the running
        // flag even when no clients are connecting.
        let accept_result = timeout(Duration::from_millis(200), listener.accept()).await;

        match accept_result {
            Ok(Ok((stream, peer_addr))) => {
                info!("new client connection from {peer_addr}");
                let bridge = bridge.clone();
                let broadcaster = Arc::clone(&broadcaster);
                tokio::spawn(async move {
                    handle_client_session(stream, peer_addr, bridge, broadcaster).await;
                });
            }
            Ok(Err(e)) => {
                // Transient accept error; keep serving other clients.
                error!("accept error: {e}");
            }
            Err(_) => {
                // Timeout with no connection; loop back to the flag check.
            }
        }
    }

    Ok(())
}

// ── Per-session handler ───────────────────────────────────────────────────────

/// Entry point of each per-session task.  Wraps [`run_session`] and logs the
/// outcome, keeping `?` available inside.
async fn handle_client_session(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    bridge: RequestBridge,
    broadcaster: Arc<EventBroadcaster>,
) {
    match run_session(raw_stream, peer_addr, bridge, broadcaster).await {
        Ok(()) => info!("session {peer_addr} closed normally"),
        Err(e) => warn!("session {peer_addr} closed with error: {e:#}"),
    }
}

/// Runs the complete lifecycle of one client session.
///
/// Inbound text frames are handled sequentially: one frame, one response,
/// in order.  The moment the session subscribes to events, a forwarding
/// task starts pushing event frames onto the same socket; the write sink is
/// shared behind an async mutex so responses and events interleave safely.
async fn run_session(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    bridge: RequestBridge,
    broadcaster: Arc<EventBroadcaster>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(raw_stream)
        .await
        .with_context(|| format!("WebSocket handshake failed with {peer_addr}"))?;

    let (ws_tx, mut ws_rx) = ws_stream.split();
    let ws_tx = Arc::new(tokio::sync::Mutex::new(ws_tx));

    let mut session = Session::new(bridge, broadcaster);
    info!("session {} established for {peer_addr}", session.id());

    let mut event_forwarder: Option<tokio::task::JoinHandle<()>> = None;

    loop {
        let ws_msg = match ws_rx.next().await {
            Some(Ok(msg)) => msg,
            Some(Err(WsError::ConnectionClosed | WsError::Protocol(_))) => {
                debug!("session {peer_addr}: WebSocket closed normally");
                break;
            }
            Some(Err(e)) => {
                warn!("session {peer_addr}: WebSocket error: {e}");
                break;
            }
            None => {
                debug!("session {peer_addr}: stream ended");
                break;
            }
        };

        match ws_msg {
            WsMessage::Text(text) => {
                let response = session.handle_frame(&text).await;

                let mut sink = ws_tx.lock().await;
                if sink.send(WsMessage::Text(response)).await.is_err() {
                    debug!("session {peer_addr}: send failed (client disconnected)");
                    break;
                }
                drop(sink);

                // A fresh subscription hands over its event receiver here;
                // start forwarding events onto the shared sink.
                if let Some(mut event_rx) = session.take_event_rx() {
                    let ws_tx_events = Arc::clone(&ws_tx);
                    event_forwarder = Some(tokio::spawn(async move {
                        while let Some(frame) = event_rx.recv().await {
                            let text = match serde_json::to_string(&frame) {
                                Ok(t) => t,
                                Err(e) => {
                                    error!("event serialization error: {e}");
                                    continue;
                                }
                            };
                            let mut sink = ws_tx_events.lock().await;
                            if sink.send(WsMessage::Text(text)).await.is_err() {
                                break;
                            }
                        }
                    }));
                }
            }

            WsMessage::Binary(_) => {
                // The control protocol is JSON text only.
                warn!("session {peer_addr}: unexpected binary frame (ignored)");
            }

            WsMessage::Ping(data) => {
                // tokio-tungstenite replies with the Pong automatically.
                debug!("session {peer_addr}: WebSocket ping ({} bytes)", data.len());
            }

            WsMessage::Pong(_) => {
                debug!("session {peer_addr}: WebSocket pong received");
            }

            WsMessage::Close(_) => {
                debug!("session {peer_addr}: Close frame received");
                break;
            }

            WsMessage::Frame(_) => {
                debug!("session {peer_addr}: raw frame (ignored)");
            }
        }
    }

    // Dropping the session unsubscribes it; the forwarder then sees its
    // channel close. Abort covers the case where it is mid-send.
    drop(session);
    if let Some(handle) = event_forwarder {
        handle.abort();
    }

    Ok(())
}
