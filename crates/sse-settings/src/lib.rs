//! # sse-settings
//!
//! Configuration for the SSE server, loaded from three layers (in priority
//! order):
//! 1. **Compiled defaults**: [`SseSettings::default()`]
//! 2. **Settings file**: `~/.sse-server/settings.json` or an explicit path
//!    (deep-merged over defaults)
//! 3. **Environment variables**: `SSE_*` overrides (highest priority)
//!
//! Settings are loaded once at startup and passed down explicitly; there is
//! no global instance.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::{LoggingSettings, ServerSettings, SseSettings};
