//! # sse-hub
//!
//! The dispatch core of the SSE server: a single task that owns every live
//! subscriber connection and fans published messages out to the ones whose
//! namespace matches.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `message` | Immutable publish event (namespace, event label, payload) |
//! | `connection` | Per-subscriber record and its consumer half ([`Subscription`]) |
//! | `matcher` | Namespace matching rules |
//! | `encoder` | Wire rendering (`event:` / `data:` lines) |
//! | `hub` | Control loop, request mailbox, eviction |
//! | `status` | Point-in-time snapshot of hub state |
//!
//! ## Data Flow
//!
//! `HubHandle` → request mailbox → `Hub::run` → `encoder` (once per message)
//! → `Connection` queues → `Subscription` streams (drained by the transport).

#![deny(unsafe_code)]

pub mod config;
pub mod connection;
pub mod encoder;
pub mod errors;
pub mod hub;
pub mod ids;
pub mod matcher;
pub mod message;
pub mod metrics;
pub mod status;

pub use config::HubConfig;
pub use connection::{Connection, Subscription};
pub use errors::{HubError, Result};
pub use hub::{EvictionReason, Hub, HubHandle};
pub use ids::ConnectionId;
pub use matcher::MatchMode;
pub use message::Message;
pub use status::{ConnectionStatus, HubStatus};
