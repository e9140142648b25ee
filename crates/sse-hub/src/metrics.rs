//! Metric names recorded by the hub.
//!
//! Recording goes through the `metrics` facade; nothing is exported unless
//! the embedding process installs a recorder.

/// Broadcasts processed (counter).
pub const BROADCASTS_TOTAL: &str = "sse_broadcasts_total";
/// Frames queued to connections (counter).
pub const DELIVERIES_TOTAL: &str = "sse_deliveries_total";
/// Connections registered (counter).
pub const CONNECTIONS_REGISTERED_TOTAL: &str = "sse_connections_registered_total";
/// Connections evicted (counter, labels: reason).
pub const EVICTIONS_TOTAL: &str = "sse_evictions_total";
/// Active connections (gauge).
pub const CONNECTIONS_ACTIVE: &str = "sse_connections_active";
