//! The hub control loop.
//!
//! A [`Hub`] is the single owner of the active-connection set. Callers never
//! touch that set directly: they submit requests through a cloneable
//! [`HubHandle`] into one bounded mailbox, and [`Hub::run`] processes them
//! strictly one at a time, in submission order.
//!
//! ## Lifecycle
//!
//! `Running → ShuttingDown → Terminated`. A shutdown request (or every
//! [`HubHandle`] being dropped) evicts all connections and ends the loop.
//! Subscriptions hold only a weak reference and do not keep it running.
//! There is no restart; later requests fail with [`HubError::Terminated`].
//!
//! ## Eviction
//!
//! Removing a connection from the set and closing its queue always happen
//! together, in that order, in `Hub::evict`. Because the hub holds the only
//! sender for each queue, a removed connection cannot be written to again.

use std::collections::HashMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::config::HubConfig;
use crate::connection::{Connection, Delivery, Subscription};
use crate::encoder;
use crate::errors::{HubError, Result};
use crate::ids::ConnectionId;
use crate::message::Message;
use crate::metrics::{
    BROADCASTS_TOTAL, CONNECTIONS_ACTIVE, CONNECTIONS_REGISTERED_TOTAL, DELIVERIES_TOTAL,
    EVICTIONS_TOTAL,
};
use crate::status::HubStatus;

/// Why a connection left the active set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionReason {
    /// Its queue was full during a broadcast.
    Backpressure,
    /// Its consumer dropped the subscription.
    Disconnected,
    /// An explicit unregister request.
    Unregistered,
    /// The hub shut down.
    Shutdown,
}

impl EvictionReason {
    /// Label used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Backpressure => "backpressure",
            Self::Disconnected => "disconnected",
            Self::Unregistered => "unregistered",
            Self::Shutdown => "shutdown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HubState {
    Running,
    ShuttingDown,
    Terminated,
}

#[derive(Debug)]
enum HubRequest {
    Register(Connection),
    Unregister(ConnectionId),
    Broadcast(Message),
    Status(oneshot::Sender<HubStatus>),
    Shutdown(oneshot::Sender<()>),
}

/// Owner of the active-connection set. Drive it with [`Hub::run`].
pub struct Hub {
    config: HubConfig,
    connections: HashMap<ConnectionId, Connection>,
    sent_msgs: u64,
    started_at: DateTime<Utc>,
    started: Instant,
    state: HubState,
    requests: mpsc::Receiver<HubRequest>,
    shutdown_waiters: Vec<oneshot::Sender<()>>,
}

impl Hub {
    /// Create a hub and the handle used to talk to it.
    pub fn new(config: HubConfig) -> (Self, HubHandle) {
        let (tx, rx) = mpsc::channel(config.mailbox_capacity.max(1));
        let handle = HubHandle {
            requests: tx,
            connection_buffer: config.connection_buffer,
        };
        let hub = Self {
            config,
            connections: HashMap::new(),
            sent_msgs: 0,
            started_at: Utc::now(),
            started: Instant::now(),
            state: HubState::Running,
            requests: rx,
            shutdown_waiters: Vec::new(),
        };
        (hub, handle)
    }

    /// Create a hub and spawn its loop on the current runtime.
    pub fn start(config: HubConfig) -> (HubHandle, JoinHandle<()>) {
        let (hub, handle) = Self::new(config);
        (handle, tokio::spawn(hub.run()))
    }

    /// Process requests until shutdown, or until every handle is dropped.
    pub async fn run(mut self) {
        info!(match_mode = ?self.config.match_mode, "hub running");
        while self.state == HubState::Running {
            let Some(request) = self.requests.recv().await else {
                debug!("all hub handles dropped");
                self.shutdown();
                break;
            };
            self.handle(request);
        }
        self.drain_mailbox();
        self.state = HubState::Terminated;
        info!(sent_msgs = self.sent_msgs, "hub terminated");
        for done in self.shutdown_waiters.drain(..) {
            let _ = done.send(());
        }
    }

    fn handle(&mut self, request: HubRequest) {
        match request {
            HubRequest::Register(conn) => self.register(conn),
            HubRequest::Unregister(id) => {
                if !self.evict(&id, EvictionReason::Unregistered) {
                    trace!(conn_id = %id, "unregister for unknown connection");
                }
            }
            HubRequest::Broadcast(msg) => self.broadcast(&msg),
            HubRequest::Status(reply) => {
                let _ = reply.send(self.status());
            }
            HubRequest::Shutdown(done) => {
                self.shutdown_waiters.push(done);
                self.shutdown();
            }
        }
    }

    fn register(&mut self, conn: Connection) {
        debug!(conn_id = %conn.id(), namespace = conn.namespace(), "registering connection");
        if let Some(previous) = self.connections.insert(conn.id().clone(), conn) {
            previous.close();
        }
        counter!(CONNECTIONS_REGISTERED_TOTAL).increment(1);
        self.record_active();
    }

    fn broadcast(&mut self, msg: &Message) {
        self.sent_msgs += 1;
        counter!(BROADCASTS_TOTAL).increment(1);

        let frame = encoder::encode(msg);
        let mut recipients = 0u64;
        let mut evictions = Vec::new();
        for conn in self.connections.values_mut() {
            if !self.config.match_mode.matches(conn.namespace(), msg.namespace()) {
                continue;
            }
            match conn.try_deliver(&frame) {
                Delivery::Queued => recipients += 1,
                Delivery::Full => {
                    warn!(conn_id = %conn.id(), namespace = conn.namespace(), "send queue full, evicting connection");
                    evictions.push((conn.id().clone(), EvictionReason::Backpressure));
                }
                Delivery::Closed => {
                    evictions.push((conn.id().clone(), EvictionReason::Disconnected));
                }
            }
        }
        counter!(DELIVERIES_TOTAL).increment(recipients);
        debug!(namespace = msg.namespace(), event = msg.event(), recipients, "broadcast message");

        for (id, reason) in evictions {
            let _ = self.evict(&id, reason);
        }
    }

    /// Remove a connection from the active set, then close its queue.
    ///
    /// Returns `false` if the connection was not active.
    fn evict(&mut self, id: &ConnectionId, reason: EvictionReason) -> bool {
        let Some(conn) = self.connections.remove(id) else {
            return false;
        };
        debug!(
            conn_id = %id,
            namespace = conn.namespace(),
            reason = reason.as_str(),
            msgs_sent = conn.msgs_sent(),
            "evicting connection"
        );
        conn.close();
        counter!(EVICTIONS_TOTAL, "reason" => reason.as_str()).increment(1);
        self.record_active();
        true
    }

    fn shutdown(&mut self) {
        if self.state != HubState::Running {
            return;
        }
        self.state = HubState::ShuttingDown;
        info!(connections = self.connections.len(), "hub shutting down, evicting connections");
        let ids: Vec<ConnectionId> = self.connections.keys().cloned().collect();
        for id in ids {
            let _ = self.evict(&id, EvictionReason::Shutdown);
        }
    }

    /// Refuse new requests and settle the ones already queued.
    fn drain_mailbox(&mut self) {
        self.requests.close();
        while let Ok(request) = self.requests.try_recv() {
            match request {
                HubRequest::Register(conn) => {
                    debug!(conn_id = %conn.id(), "closing connection registered during shutdown");
                    conn.close();
                }
                HubRequest::Shutdown(done) => self.shutdown_waiters.push(done),
                HubRequest::Unregister(_) | HubRequest::Broadcast(_) | HubRequest::Status(_) => {}
            }
        }
    }

    fn status(&self) -> HubStatus {
        HubStatus {
            sent_msgs: self.sent_msgs,
            started_at: self.started_at,
            uptime_secs: self.started.elapsed().as_secs(),
            connections: self.connections.values().map(Connection::status).collect(),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn record_active(&self) {
        gauge!(CONNECTIONS_ACTIVE).set(self.connections.len() as f64);
    }
}

/// Cloneable entry point into a running [`Hub`].
#[derive(Clone, Debug)]
pub struct HubHandle {
    requests: mpsc::Sender<HubRequest>,
    connection_buffer: usize,
}

impl HubHandle {
    async fn submit(&self, request: HubRequest) -> Result<()> {
        self.requests
            .send(request)
            .await
            .map_err(|_| HubError::Terminated)
    }

    /// Add a connection to the active set.
    ///
    /// If the hub has terminated the connection is dropped, which closes its
    /// queue.
    pub async fn register(&self, conn: Connection) -> Result<()> {
        self.submit(HubRequest::Register(conn)).await
    }

    /// Create, register and return a subscription to `namespace` using the
    /// hub's configured queue capacity. Dropping the subscription
    /// unregisters it.
    pub async fn subscribe(&self, namespace: impl Into<String>) -> Result<Subscription> {
        let (conn, mut sub) = Connection::new(namespace, self.connection_buffer);
        self.register(conn).await?;
        sub.unregister_on_drop(self);
        Ok(sub)
    }

    /// Evict a connection. Unknown IDs are ignored.
    pub async fn unregister(&self, id: &ConnectionId) -> Result<()> {
        self.submit(HubRequest::Unregister(id.clone())).await
    }

    /// Fan a message out to every matching connection.
    pub async fn broadcast(&self, msg: Message) -> Result<()> {
        self.submit(HubRequest::Broadcast(msg)).await
    }

    /// Snapshot of the hub's state.
    pub async fn status(&self) -> Result<HubStatus> {
        let (tx, rx) = oneshot::channel();
        self.submit(HubRequest::Status(tx)).await?;
        rx.await.map_err(|_| HubError::Terminated)
    }

    /// Evict every connection and stop the loop.
    ///
    /// Returns once the hub has terminated. Safe to call more than once and
    /// from several tasks.
    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        if self.submit(HubRequest::Shutdown(tx)).await.is_ok() {
            let _ = rx.await;
        }
    }

    /// Whether the hub loop has stopped accepting requests.
    pub fn is_terminated(&self) -> bool {
        self.requests.is_closed()
    }

    pub(crate) fn downgrade(&self) -> WeakHubHandle {
        WeakHubHandle {
            requests: self.requests.downgrade(),
        }
    }
}

/// Non-owning reference to a hub, held by subscriptions. It does not keep
/// the control loop alive.
#[derive(Clone, Debug)]
pub(crate) struct WeakHubHandle {
    requests: mpsc::WeakSender<HubRequest>,
}

impl WeakHubHandle {
    /// Submit an unregister request without waiting, for use in `Drop`.
    /// Does nothing once every [`HubHandle`] has been dropped.
    pub(crate) fn unregister_detached(&self, id: ConnectionId) {
        let Some(requests) = self.requests.upgrade() else {
            return;
        };
        match requests.try_send(HubRequest::Unregister(id)) {
            Ok(()) | Err(TrySendError::Closed(_)) => {}
            Err(TrySendError::Full(request)) => {
                // Without a runtime the next broadcast to this connection
                // finds the queue closed and evicts it.
                if let Ok(runtime) = tokio::runtime::Handle::try_current() {
                    let _ = runtime.spawn(async move {
                        let _ = requests.send(request).await;
                    });
                }
            }
        }
    }
}
