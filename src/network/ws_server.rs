use std::net::SocketAddr;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use futures::FutureExt;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::trace;
use tracing::warn;
use warp::ws::Message;
use warp::ws::WebSocket;
use warp::ws::Ws;
use warp::Filter;
use warp::Rejection;
use warp::Reply;

use super::ConnectionEvent;
use crate::metrics::metrics_route;
use crate::ConnectionId;
use crate::Result;
use crate::SystemError;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

fn next_connection_id() -> ConnectionId {
    NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed)
}

/// WebSocket upgrade at `/`, plus `GET /metrics` when `metrics_enabled`.
pub fn routes(
    event_tx: mpsc::UnboundedSender<ConnectionEvent>,
    metrics_enabled: bool,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let socket = warp::path::end()
        .and(warp::ws())
        .and(warp::any().map(move || event_tx.clone()))
        .map(|ws: Ws, event_tx: mpsc::UnboundedSender<ConnectionEvent>| {
            let id = next_connection_id();
            ws.on_upgrade(move |socket| handle_socket(socket, id, event_tx))
        });

    socket.or(metrics_gate(metrics_enabled).and(metrics_route()))
}

fn metrics_gate(enabled: bool) -> impl Filter<Extract = (), Error = Rejection> + Clone {
    warp::any()
        .and_then(move || async move {
            if enabled {
                Ok(())
            } else {
                Err(warp::reject::not_found())
            }
        })
        .untuple_one()
}

/// Pumps one socket: inbound text frames become [`ConnectionEvent::Frame`],
/// outbound frames are drained from the channel announced in `Opened`.
async fn handle_socket(
    socket: WebSocket,
    id: ConnectionId,
    event_tx: mpsc::UnboundedSender<ConnectionEvent>,
) {
    let (ws_tx, mut ws_rx) = socket.split();
    let (outbound, outbound_rx) = mpsc::unbounded_channel::<String>();

    tokio::spawn(
        UnboundedReceiverStream::new(outbound_rx)
            .map(|text| Ok::<_, warp::Error>(Message::text(text)))
            .forward(ws_tx)
            .map(move |result| {
                if let Err(e) = result {
                    debug!("connection {} write half closed: {}", id, e);
                }
            }),
    );

    if event_tx.send(ConnectionEvent::Opened { id, outbound }).is_err() {
        warn!("connection {} accepted after the node stopped", id);
        return;
    }
    info!("connection {} opened", id);

    while let Some(result) = ws_rx.next().await {
        let message = match result {
            Ok(message) => message,
            Err(e) => {
                warn!("connection {} read error: {}", id, e);
                break;
            }
        };

        if let Ok(text) = message.to_str() {
            trace!("connection {} <- {}", id, text);
            let frame = ConnectionEvent::Frame {
                id,
                text: text.to_string(),
            };
            if event_tx.send(frame).is_err() {
                break;
            }
        } else if message.is_close() {
            break;
        } else {
            trace!("connection {} sent a non-text frame", id);
        }
    }

    info!("connection {} closed", id);
    let _ = event_tx.send(ConnectionEvent::Closed { id });
}

/// Running listener. Stops accepting once the shutdown signal fires.
#[derive(Debug)]
pub struct ConnectionServer {
    local_addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl ConnectionServer {
    /// Binds `listen_address` and serves in a background task.
    pub fn start(
        listen_address: SocketAddr,
        metrics_enabled: bool,
        event_tx: mpsc::UnboundedSender<ConnectionEvent>,
        mut shutdown_signal: watch::Receiver<()>,
    ) -> Result<Self> {
        let (local_addr, server) = warp::serve(routes(event_tx, metrics_enabled))
            .try_bind_with_graceful_shutdown(listen_address, async move {
                let _ = shutdown_signal.changed().await;
                warn!("stopping connection server. {}", listen_address);
            })
            .map_err(|e| {
                error!("failed to bind {}: {}", listen_address, e);
                SystemError::ServerBind(format!("{listen_address}: {e}"))
            })?;

        info!("listening on ws://{}", local_addr);
        let handle = tokio::spawn(server);
        Ok(Self { local_addr, handle })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Waits for the listener task to finish.
    pub async fn join(self) -> Result<()> {
        self.handle.await?;
        Ok(())
    }
}
