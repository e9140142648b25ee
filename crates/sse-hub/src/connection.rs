//! Subscriber connections.
//!
//! [`Connection::new`] returns two halves sharing one bounded queue:
//!
//! - [`Connection`]: the producer side, handed to the hub on registration.
//!   The hub is the only writer; dropping the `Connection` closes the queue.
//! - [`Subscription`]: the consumer side, kept by the transport layer. It is
//!   a [`Stream`] of encoded frames that ends once the queue is closed and
//!   drained.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::Stream;
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};

use crate::hub::{HubHandle, WeakHubHandle};
use crate::ids::ConnectionId;
use crate::status::ConnectionStatus;

/// Outcome of a non-blocking enqueue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delivery {
    /// The frame was queued.
    Queued,
    /// The queue is at capacity.
    Full,
    /// The consumer has gone away.
    Closed,
}

/// Server-side record of one subscriber.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    namespace: String,
    tx: mpsc::Sender<Bytes>,
    created_at: DateTime<Utc>,
    msgs_sent: u64,
}

impl Connection {
    /// Create a connection subscribed to `namespace` with an outbound queue
    /// of `capacity` frames (at least one).
    pub fn new(namespace: impl Into<String>, capacity: usize) -> (Self, Subscription) {
        let namespace = namespace.into();
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let id = ConnectionId::new();
        let conn = Self {
            id: id.clone(),
            namespace: namespace.clone(),
            tx,
            created_at: Utc::now(),
            msgs_sent: 0,
        };
        let sub = Subscription {
            id,
            namespace,
            rx,
            hub: None,
        };
        (conn, sub)
    }

    /// Connection ID.
    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// Namespace this connection is subscribed to.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// When the connection was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Frames queued to this connection so far.
    pub fn msgs_sent(&self) -> u64 {
        self.msgs_sent
    }

    /// Frames currently waiting in the queue.
    pub fn queued(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    /// Enqueue a frame without waiting.
    pub(crate) fn try_deliver(&mut self, frame: &Bytes) -> Delivery {
        match self.tx.try_send(frame.clone()) {
            Ok(()) => {
                self.msgs_sent += 1;
                Delivery::Queued
            }
            Err(TrySendError::Full(_)) => Delivery::Full,
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }

    /// Close the outbound queue. Consumes the connection, so nothing can be
    /// sent to it afterwards.
    pub(crate) fn close(self) {
        drop(self.tx);
    }

    pub(crate) fn status(&self) -> ConnectionStatus {
        ConnectionStatus {
            id: self.id.clone(),
            namespace: self.namespace.clone(),
            created_at: self.created_at,
            msgs_sent: self.msgs_sent,
            queued: self.queued(),
        }
    }
}

/// Consumer half of a connection's outbound queue.
///
/// When attached to a hub (see [`HubHandle::subscribe`]), dropping the
/// subscription submits an unregister request for its connection.
#[derive(Debug)]
pub struct Subscription {
    id: ConnectionId,
    namespace: String,
    rx: mpsc::Receiver<Bytes>,
    hub: Option<WeakHubHandle>,
}

impl Subscription {
    /// ID of the connection feeding this subscription.
    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// Namespace of the connection.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Receive the next frame, or `None` once the queue is closed and empty.
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }

    /// Receive a frame without waiting.
    pub fn try_recv(&mut self) -> Result<Bytes, TryRecvError> {
        self.rx.try_recv()
    }

    /// Unregister from `hub` when this subscription is dropped.
    ///
    /// Only a weak reference is kept: a live subscription does not stop the
    /// hub from terminating once every [`HubHandle`] is gone.
    pub fn unregister_on_drop(&mut self, hub: &HubHandle) {
        self.hub = Some(hub.downgrade());
    }
}

impl Stream for Subscription {
    type Item = Bytes;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.take() {
            hub.unregister_detached(self.id.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn create_connection() {
        let (conn, sub) = Connection::new("/foo", 8);
        assert_eq!(conn.namespace(), "/foo");
        assert_eq!(conn.id(), sub.id());
        assert_eq!(sub.namespace(), "/foo");
        assert_eq!(conn.msgs_sent(), 0);
        assert_eq!(conn.queued(), 0);
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let (mut conn, _sub) = Connection::new("/foo", 0);
        assert_eq!(conn.try_deliver(&Bytes::from_static(b"a")), Delivery::Queued);
        assert_eq!(conn.try_deliver(&Bytes::from_static(b"b")), Delivery::Full);
    }

    #[tokio::test]
    async fn deliver_and_receive() {
        let (mut conn, mut sub) = Connection::new("/foo", 8);
        let frame = Bytes::from_static(b"data: hi\n\n");
        assert_eq!(conn.try_deliver(&frame), Delivery::Queued);
        assert_eq!(conn.msgs_sent(), 1);
        assert_eq!(conn.queued(), 1);
        assert_eq!(sub.recv().await.unwrap(), frame);
        assert_eq!(conn.queued(), 0);
    }

    #[test]
    fn full_queue_reports_full() {
        let (mut conn, _sub) = Connection::new("/foo", 2);
        let frame = Bytes::from_static(b"x");
        assert_eq!(conn.try_deliver(&frame), Delivery::Queued);
        assert_eq!(conn.try_deliver(&frame), Delivery::Queued);
        assert_eq!(conn.try_deliver(&frame), Delivery::Full);
        assert_eq!(conn.msgs_sent(), 2);
    }

    #[test]
    fn dropped_subscription_reports_closed() {
        let (mut conn, sub) = Connection::new("/foo", 2);
        drop(sub);
        assert_eq!(conn.try_deliver(&Bytes::from_static(b"x")), Delivery::Closed);
    }

    #[tokio::test]
    async fn close_ends_stream_after_drain() {
        let (mut conn, mut sub) = Connection::new("/foo", 4);
        let _ = conn.try_deliver(&Bytes::from_static(b"one"));
        let _ = conn.try_deliver(&Bytes::from_static(b"two"));
        conn.close();

        let frames: Vec<Bytes> = (&mut sub).collect().await;
        assert_eq!(frames, vec![Bytes::from_static(b"one"), Bytes::from_static(b"two")]);
        assert_eq!(sub.try_recv(), Err(TryRecvError::Disconnected));
    }

    #[test]
    fn open_empty_queue_reports_empty() {
        let (_conn, mut sub) = Connection::new("/foo", 4);
        assert_eq!(sub.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn status_snapshot() {
        let (mut conn, _sub) = Connection::new("/pets", 4);
        let _ = conn.try_deliver(&Bytes::from_static(b"x"));
        let status = conn.status();
        assert_eq!(&status.id, conn.id());
        assert_eq!(status.namespace, "/pets");
        assert_eq!(status.msgs_sent, 1);
        assert_eq!(status.queued, 1);
    }
}
