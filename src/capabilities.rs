//! Capability seams consumed by the cast coordinator.
//!
//! The casting SDK (device discovery, session negotiation, the receiver wire
//! protocol) stays behind `SessionProvider`, `CastSession` and
//! `RemotePlayerObserver`. The embedding page provides `MediaElement` and
//! `CastButton`. Subscriptions are broadcast receivers; dropping one
//! unsubscribes.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast::Receiver;

use crate::protocol::{ButtonProjection, CastConnectionState, CastOptions, LoadRequest};

/// Active cast session handle.
#[async_trait]
pub trait CastSession: Send + Sync {
    /// Opaque identifier assigned by the SDK.
    fn session_id(&self) -> String;

    /// Sends a load request to the receiver. Resolves once the receiver
    /// accepted or rejected the media.
    async fn load_media(&self, request: LoadRequest) -> Result<(), String>;
}

/// Session negotiation and connectivity reporting owned by the SDK.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    fn configure(&self, options: &CastOptions);

    fn current_connection_state(&self) -> CastConnectionState;

    fn subscribe_connection_state(&self) -> Receiver<CastConnectionState>;

    /// Session joined or negotiated earlier, if one is still live.
    fn current_session(&self) -> Option<Arc<dyn CastSession>>;

    /// Prompts for a receiver and negotiates a session.
    ///
    /// `Ok(None)` means the prompt closed without a session, `Err` carries the
    /// SDK-reported reason for a cancel or device error. Timeouts are the
    /// provider's own business.
    async fn request_session(&self) -> Result<Option<Arc<dyn CastSession>>, String>;
}

/// Remote player state reporting for the active session.
pub trait RemotePlayerObserver: Send + Sync {
    fn subscribe_paused(&self) -> Receiver<bool>;

    fn subscribe_connected(&self) -> Receiver<bool>;
}

/// Local media element whose playback the coordinator hands over to the receiver.
///
/// The user can change play/pause state at any time, so implementations must
/// report live state from `is_paused`.
pub trait MediaElement: Send + Sync {
    fn is_paused(&self) -> bool;

    fn play(&self);

    fn pause(&self);

    /// The element's own `src` attribute, empty when unset.
    fn src(&self) -> String;

    /// URL of the first child `<source>` entry, if any.
    fn first_source_url(&self) -> Option<String>;
}

/// Cast affordance rendered by the embedding page. Write-only from the
/// coordinator's point of view.
pub trait CastButton: Send + Sync {
    fn render(&self, projection: ButtonProjection);
}

/// SDK capabilities present in a cast-capable environment.
#[derive(Clone)]
pub struct CastCapabilities {
    pub session_provider: Arc<dyn SessionProvider>,
    pub remote_player: Arc<dyn RemotePlayerObserver>,
}
