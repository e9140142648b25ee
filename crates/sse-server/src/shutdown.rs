//! Shutdown ordering for the hub and the HTTP listener.
//!
//! Open event streams only end when the hub closes their queues, and
//! `axum::serve` does not finish a graceful shutdown while a response body is
//! still streaming. The coordinator therefore stops the hub first and only
//! then cancels the listener token.

use std::time::Duration;

use sse_hub::HubHandle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Default time to wait for the serve task after the token is cancelled.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Stops the hub, then the listener.
pub struct ShutdownCoordinator {
    hub: HubHandle,
    token: CancellationToken,
}

impl ShutdownCoordinator {
    /// Coordinator for the given hub.
    pub fn new(hub: HubHandle) -> Self {
        Self {
            hub,
            token: CancellationToken::new(),
        }
    }

    /// Token the serve task waits on. Cancelled only after the hub has
    /// terminated.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Whether the listener has been told to stop.
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Close every event stream by shutting the hub down, then cancel the
    /// listener token. Safe to call more than once.
    pub async fn shutdown(&self) {
        if !self.hub.is_terminated() {
            let open = self.hub.status().await.map_or(0, |s| s.connection_count());
            info!(streams = open, "closing event streams");
        }
        self.hub.shutdown().await;
        self.token.cancel();
    }

    /// [`shutdown`](Self::shutdown), then wait up to `timeout` for the serve
    /// task(s) in `handles` to drain.
    pub async fn graceful_shutdown(&self, handles: Vec<JoinHandle<()>>, timeout: Option<Duration>) {
        let timeout = timeout.unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT);
        self.shutdown().await;
        info!(
            task_count = handles.len(),
            timeout_secs = timeout.as_secs(),
            "hub stopped, waiting for listener"
        );

        let drain = futures::future::join_all(handles);
        if tokio::time::timeout(timeout, drain).await.is_err() {
            warn!(?timeout, "listener did not stop in time");
        }
    }
}
