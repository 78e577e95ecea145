//! Connection boundary: framed text messages over WebSocket.
//!
//! Each upgraded socket gets a [`ConnectionId`] and is surfaced to the node
//! loop as a stream of [`ConnectionEvent`]s. Outbound frames travel back on
//! the unbounded sender handed over in [`ConnectionEvent::Opened`]; dropping
//! that sender ends the write half of the socket.
mod ws_server;
pub use ws_server::*;


use tokio::sync::mpsc;

use crate::ConnectionId;

#[derive(Debug)]
pub enum ConnectionEvent {
    Opened {
        id: ConnectionId,
        outbound: mpsc::UnboundedSender<String>,
    },
    Frame {
        id: ConnectionId,
        text: String,
    },
    Closed {
        id: ConnectionId,
    },
}

impl ConnectionEvent {
    pub fn id(&self) -> ConnectionId {
        match self {
            ConnectionEvent::Opened { id, .. } => *id,
            ConnectionEvent::Frame { id, .. } => *id,
            ConnectionEvent::Closed { id } => *id,
        }
    }
}
