//! Failure taxonomy for the cast flows.
//!
//! Every variant is recoverable: by the time one is returned the coordinator
//! has already projected the matching state and logged the cause.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CastError {
    /// No casting support in this environment.
    #[error("casting is not available in this environment")]
    CapabilityUnavailable,
    /// The user declined the session prompt or the device failed during negotiation.
    #[error("no cast session available: {0}")]
    SessionUnavailable(String),
    /// The local media element has no resolvable source.
    #[error("no playable source found on the media element")]
    NoPlayableSource,
    /// The receiver rejected or failed to start the media.
    #[error("receiver failed to load media: {0}")]
    LoadFailed(String),
}
