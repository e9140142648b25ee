//! Hub error types.

use thiserror::Error;

/// Errors surfaced by [`HubHandle`](crate::HubHandle) requests.
///
/// Steady-state dispatch never fails; the only failure a caller can observe
/// is submitting a request after the control loop has exited.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum HubError {
    /// The hub has shut down and no longer accepts requests.
    #[error("hub has terminated")]
    Terminated,
}

/// Result type for hub operations.
pub type Result<T> = std::result::Result<T, HubError>;
