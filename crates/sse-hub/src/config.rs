//! Hub configuration.

use serde::{Deserialize, Serialize};

use crate::matcher::MatchMode;

/// Tunables for a [`Hub`](crate::Hub).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Outbound queue capacity for connections created via
    /// [`HubHandle::subscribe`](crate::HubHandle::subscribe).
    pub connection_buffer: usize,
    /// Capacity of the hub's request mailbox.
    pub mailbox_capacity: usize,
    /// Namespace matching rule.
    pub match_mode: MatchMode,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            connection_buffer: 256,
            mailbox_capacity: 1024,
            match_mode: MatchMode::Prefix,
        }
    }
}
