//! Connection and device bookkeeping.
//!
//! Each connection moves `Unidentified -> Identified -> Closed`. A device id
//! maps to at most one live connection; registering the same id from another
//! connection takes the mapping over.

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::metrics::CONNECTED_DEVICES_METRIC;
use crate::Result;
use crate::SessionError;

pub type ConnectionId = u64;

/// Client-supplied identifier, stable across reconnects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Unidentified,
    Identified(DeviceId),
    Closed,
}

#[derive(Debug)]
struct Connection {
    state: ConnectionState,
    outbound: mpsc::UnboundedSender<String>,
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    connections: HashMap<ConnectionId, Connection>,
    devices: HashMap<DeviceId, ConnectionId>,
    /// Connection that last asked for the drag-and-drop area
    drag_target: Option<ConnectionId>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(
        &mut self,
        id: ConnectionId,
        outbound: mpsc::UnboundedSender<String>,
    ) {
        debug!("connection {} opened", id);
        self.connections.insert(
            id,
            Connection {
                state: ConnectionState::Unidentified,
                outbound,
            },
        );
    }

    /// Binds `device` to connection `id`. Returns the connection the device
    /// was previously mapped to, if this registration took it over.
    pub fn identify(
        &mut self,
        id: ConnectionId,
        device: DeviceId,
    ) -> Result<Option<ConnectionId>> {
        let previous_device = match self.connections.get(&id) {
            Some(connection) => match &connection.state {
                ConnectionState::Identified(current) => Some(current.clone()),
                _ => None,
            },
            None => return Err(SessionError::ConnectionClosed(id).into()),
        };

        // a connection re-identifying under another id releases the old one
        if let Some(old) = previous_device.filter(|old| *old != device) {
            if self.devices.get(&old) == Some(&id) {
                self.devices.remove(&old);
            }
        }

        let displaced = self.devices.insert(device.clone(), id).filter(|&other| other != id);
        if let Some(other) = displaced {
            if let Some(connection) = self.connections.get_mut(&other) {
                connection.state = ConnectionState::Unidentified;
            }
            info!("device {} moved from connection {} to {}", device, other, id);
        } else {
            info!("device {} registered on connection {}", device, id);
        }

        if let Some(connection) = self.connections.get_mut(&id) {
            connection.state = ConnectionState::Identified(device);
        }
        CONNECTED_DEVICES_METRIC.set(self.devices.len() as i64);
        Ok(displaced)
    }

    /// Forgets connection `id`. The device mapping is dropped only when it
    /// still points at this connection. Returns the device that went offline.
    pub fn close(
        &mut self,
        id: ConnectionId,
    ) -> Option<DeviceId> {
        if self.drag_target == Some(id) {
            self.drag_target = None;
        }

        let connection = self.connections.remove(&id)?;
        debug!("connection {} closed", id);
        let device = match connection.state {
            ConnectionState::Identified(device) => device,
            _ => return None,
        };

        if self.devices.get(&device) != Some(&id) {
            return None;
        }
        self.devices.remove(&device);
        CONNECTED_DEVICES_METRIC.set(self.devices.len() as i64);
        info!("device {} disconnected", device);
        Some(device)
    }

    pub fn state(
        &self,
        id: ConnectionId,
    ) -> ConnectionState {
        self.connections
            .get(&id)
            .map(|c| c.state.clone())
            .unwrap_or(ConnectionState::Closed)
    }

    /// Devices with a live connection, in id order
    pub fn registered_devices(&self) -> Vec<DeviceId> {
        let mut devices: Vec<DeviceId> = self.devices.keys().cloned().collect();
        devices.sort();
        devices
    }

    pub fn is_registered(
        &self,
        device: &DeviceId,
    ) -> bool {
        self.devices.contains_key(device)
    }

    pub fn connection_of(
        &self,
        device: &DeviceId,
    ) -> Option<ConnectionId> {
        self.devices.get(device).copied()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn send_to_device(
        &self,
        device: &DeviceId,
        frame: String,
    ) -> Result<()> {
        let id = self
            .devices
            .get(device)
            .ok_or_else(|| SessionError::UnknownDevice(device.to_string()))?;
        self.send_to_connection(*id, frame)
    }

    pub fn send_to_connection(
        &self,
        id: ConnectionId,
        frame: String,
    ) -> Result<()> {
        let connection = self.connections.get(&id).ok_or(SessionError::ConnectionClosed(id))?;
        connection.outbound.send(frame).map_err(|_| {
            warn!("outbound queue of connection {} is gone", id);
            SessionError::ConnectionClosed(id)
        })?;
        Ok(())
    }

    pub fn set_drag_target(
        &mut self,
        id: ConnectionId,
    ) {
        debug!("connection {} requested the drag area", id);
        self.drag_target = Some(id);
    }

    pub fn drag_target(&self) -> Option<ConnectionId> {
        self.drag_target
    }
}
