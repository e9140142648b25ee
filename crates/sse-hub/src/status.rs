//! Point-in-time hub snapshots.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::ids::ConnectionId;

/// Snapshot of hub state, produced inside the control loop.
#[derive(Debug, Clone, Serialize)]
pub struct HubStatus {
    /// Broadcasts processed since the hub was created.
    pub sent_msgs: u64,
    /// When the hub was created.
    pub started_at: DateTime<Utc>,
    /// Seconds since the hub was created.
    pub uptime_secs: u64,
    /// Currently active connections.
    pub connections: Vec<ConnectionStatus>,
}

impl HubStatus {
    /// Number of active connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Look up a connection by ID.
    pub fn connection(&self, id: &ConnectionId) -> Option<&ConnectionStatus> {
        self.connections.iter().find(|c| &c.id == id)
    }
}

/// Snapshot of one active connection.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionStatus {
    /// Connection ID.
    pub id: ConnectionId,
    /// Subscribed namespace.
    pub namespace: String,
    /// When the connection was created.
    pub created_at: DateTime<Utc>,
    /// Frames queued to the connection so far.
    pub msgs_sent: u64,
    /// Frames waiting in the outbound queue.
    pub queued: usize,
}
