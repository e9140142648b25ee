//! Settings type definitions.
//!
//! Every section implements [`Default`] and is marked `#[serde(default)]`, so
//! a settings file only needs the keys it changes:
//!
//! ```json
//! { "server": { "port": 9000 }, "hub": { "match_mode": "segment" } }
//! ```

use serde::{Deserialize, Serialize};
use sse_hub::HubConfig;

use crate::errors::{Result, SettingsError};

/// Root settings type.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SseSettings {
    /// HTTP listener and transport settings.
    pub server: ServerSettings,
    /// Hub tunables.
    pub hub: HubConfig,
    /// Log output.
    pub logging: LoggingSettings,
}

impl SseSettings {
    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.hub.connection_buffer == 0 {
            return Err(SettingsError::InvalidValue(
                "hub.connection_buffer must be at least 1".into(),
            ));
        }
        if self.hub.mailbox_capacity == 0 {
            return Err(SettingsError::InvalidValue(
                "hub.mailbox_capacity must be at least 1".into(),
            ));
        }
        if self.server.host.is_empty() {
            return Err(SettingsError::InvalidValue("server.host must not be empty".into()));
        }
        Ok(())
    }
}

/// HTTP listener and transport settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port (`0` picks a free port).
    pub port: u16,
    /// Whether `POST /publish/...` is served.
    pub allow_publish: bool,
    /// Seconds between keepalive comments on idle streams (`0` disables).
    pub keepalive_interval_secs: u64,
    /// Seconds to wait for in-flight requests on shutdown.
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
            allow_publish: true,
            keepalive_interval_secs: 15,
            shutdown_timeout_secs: 30,
        }
    }
}

/// Log output settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
        }
    }
}
