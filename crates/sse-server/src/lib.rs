//! # sse-server
//!
//! Axum HTTP transport in front of an [`sse_hub::Hub`].
//!
//! - `GET /subscribe/{*namespace}` streams `text/event-stream` frames
//! - `POST /publish/{*namespace}` broadcasts the request body
//! - `GET /health`, `GET /admin/status.json`, `GET /metrics`
//! - Graceful shutdown via `CancellationToken`, after the hub has closed
//!   every stream

#![deny(unsafe_code)]

pub mod errors;
pub mod health;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod stream;

pub use errors::{Result, ServerError};
pub use server::SseServer;
pub use shutdown::ShutdownCoordinator;
