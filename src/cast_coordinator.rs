//! Cast coordinator: keeps exactly one of local or remote playback active.
//!
//! The coordinator listens to three event sources (connection state, remote
//! paused, remote connected) and to explicit launch requests from the cast
//! button. Shared state sits behind a synchronous mutex that is never held
//! across an await, so every handler step is atomic with respect to the
//! others. The local media element is shared with the user, so its paused
//! state is always read back before acting on it.

use std::sync::{Arc, Mutex};

use log::{debug, info, warn};
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::broadcast::Receiver;
use tokio::sync::Notify;

use crate::capabilities::{CastButton, CastCapabilities, CastSession, MediaElement};
use crate::error::CastError;
use crate::lock_or_recover;
use crate::media_descriptor::build_descriptor;
use crate::protocol::{
    ButtonProjection, CastConnectionState, CastOptions, LoadRequest, MediaMetadata,
    RemotePlayerStatus,
};

struct CoordinatorState {
    init_outcome: Option<Result<(), CastError>>,
    connection_state: CastConnectionState,
    session: Option<Arc<dyn CastSession>>,
    remote_status: RemotePlayerStatus,
}

struct EventSubscriptions {
    connection_state: Receiver<CastConnectionState>,
    remote_paused: Receiver<bool>,
    remote_connected: Receiver<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CoordinatorEvent {
    ConnectionStateChanged(CastConnectionState),
    ConnectionStateLagged,
    RemotePausedChanged(bool),
    RemoteConnectedChanged(bool),
}

/// Collects everything buffered on `receiver`. A lag marker is appended after
/// the retained events so a resync never replays older state over newer.
fn drain_receiver<T: Clone>(
    receiver: &mut Receiver<T>,
    source: &str,
    events: &mut Vec<CoordinatorEvent>,
    to_event: impl Fn(T) -> CoordinatorEvent,
    on_lag: Option<CoordinatorEvent>,
) {
    let mut lagged = false;
    loop {
        match receiver.try_recv() {
            Ok(value) => events.push(to_event(value)),
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            Err(TryRecvError::Lagged(skipped)) => {
                warn!(
                    "CastCoordinator: {} subscription lagged by {} events",
                    source, skipped
                );
                lagged = true;
            }
        }
    }
    if lagged {
        if let Some(event) = on_lag {
            events.push(event);
        }
    }
}

/// Single authority over local/remote playback exclusivity.
pub struct CastCoordinator {
    capabilities: Option<CastCapabilities>,
    media: Arc<dyn MediaElement>,
    button: Arc<dyn CastButton>,
    options: CastOptions,
    metadata: MediaMetadata,
    state: Mutex<CoordinatorState>,
    subscriptions: Mutex<Option<EventSubscriptions>>,
    shutdown_signal: Notify,
    launch_gate: tokio::sync::Mutex<()>,
}

impl CastCoordinator {
    /// Creates a coordinator. `capabilities` is `None` in environments without
    /// casting support.
    pub fn new(
        capabilities: Option<CastCapabilities>,
        media: Arc<dyn MediaElement>,
        button: Arc<dyn CastButton>,
        options: CastOptions,
    ) -> Self {
        Self {
            capabilities,
            media,
            button,
            options,
            metadata: MediaMetadata::default(),
            state: Mutex::new(CoordinatorState {
                init_outcome: None,
                connection_state: CastConnectionState::NotConnected,
                session: None,
                remote_status: RemotePlayerStatus::default(),
            }),
            subscriptions: Mutex::new(None),
            shutdown_signal: Notify::new(),
            launch_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Display metadata attached to every load request.
    pub fn with_metadata(mut self, metadata: MediaMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn connection_state(&self) -> CastConnectionState {
        lock_or_recover(&self.state).connection_state
    }

    pub fn remote_status(&self) -> RemotePlayerStatus {
        lock_or_recover(&self.state).remote_status
    }

    pub fn has_session(&self) -> bool {
        lock_or_recover(&self.state).session.is_some()
    }

    pub fn is_initialized(&self) -> bool {
        lock_or_recover(&self.state).init_outcome.is_some()
    }

    fn project(&self, state: CastConnectionState) {
        self.button.render(ButtonProjection::for_state(state));
    }

    fn resume_local_if_paused(&self, reason: &str) {
        if self.media.is_paused() {
            info!("CastCoordinator: resuming local playback ({})", reason);
            self.media.play();
        }
    }

    /// Configures the SDK and registers the three event subscriptions.
    ///
    /// Only the first call has side effects; later calls return the first
    /// outcome. Without casting support the button is hidden and disabled and
    /// `CapabilityUnavailable` is returned.
    pub fn initialize(&self) -> Result<(), CastError> {
        let mut state = lock_or_recover(&self.state);
        if let Some(outcome) = state.init_outcome.as_ref() {
            debug!("CastCoordinator: already initialized");
            return outcome.clone();
        }

        let Some(capabilities) = self.capabilities.as_ref() else {
            warn!("CastCoordinator: casting is not available in this environment");
            state.connection_state = CastConnectionState::NoDevicesAvailable;
            state.init_outcome = Some(Err(CastError::CapabilityUnavailable));
            drop(state);
            self.project(CastConnectionState::NoDevicesAvailable);
            return Err(CastError::CapabilityUnavailable);
        };

        let provider = &capabilities.session_provider;
        provider.configure(&self.options);
        let subscriptions = EventSubscriptions {
            connection_state: provider.subscribe_connection_state(),
            remote_paused: capabilities.remote_player.subscribe_paused(),
            remote_connected: capabilities.remote_player.subscribe_connected(),
        };
        *lock_or_recover(&self.subscriptions) = Some(subscriptions);

        let initial_state = provider.current_connection_state();
        state.connection_state = initial_state;
        state.init_outcome = Some(Ok(()));
        drop(state);

        info!(
            "CastCoordinator: initialized receiver_app_id={} auto_join_policy={:?} state={}",
            self.options.receiver_app_id, self.options.auto_join_policy, initial_state
        );
        self.project(initial_state);
        Ok(())
    }

    /// Records a connection-state change and projects it onto the button.
    ///
    /// Entering `NotConnected` releases the held session and resumes local
    /// playback if it is paused. Local playback paused by the user before
    /// casting resumes too; the coordinator cannot tell the two apart.
    pub fn on_connection_state_changed(&self, new_state: CastConnectionState) {
        let (previous, released) = {
            let mut state = lock_or_recover(&self.state);
            let previous = state.connection_state;
            state.connection_state = new_state;
            let released = if new_state == CastConnectionState::NotConnected {
                state.session.take()
            } else {
                None
            };
            (previous, released)
        };

        debug!(
            "CastCoordinator: connection state {} -> {}",
            previous, new_state
        );
        if let Some(session) = released {
            info!("CastCoordinator: session {} released", session.session_id());
        }
        self.project(new_state);

        if new_state == CastConnectionState::NotConnected && previous != new_state {
            self.resume_local_if_paused("cast session ended");
        }
    }

    /// Mirrors the remote paused flag. Observational only.
    pub fn on_remote_paused_changed(&self, is_paused: bool) {
        let previous = {
            let mut state = lock_or_recover(&self.state);
            let previous = state.remote_status.is_paused;
            state.remote_status.is_paused = is_paused;
            previous
        };
        if previous != is_paused {
            debug!("CastCoordinator: remote player paused={}", is_paused);
        }
    }

    /// Treats a remote player disconnect while a session is held as the end of
    /// that session, even if no connection-state event follows.
    pub fn on_remote_connected_changed(&self, is_connected: bool) {
        let released = {
            let mut state = lock_or_recover(&self.state);
            state.remote_status.is_connected = is_connected;
            if is_connected {
                None
            } else {
                state.session.take()
            }
        };
        debug!("CastCoordinator: remote player connected={}", is_connected);

        if let Some(session) = released {
            info!(
                "CastCoordinator: session {} ended by remote player disconnect",
                session.session_id()
            );
            self.resume_local_if_paused("remote player disconnected");
        }
    }

    /// Returns the live session, requesting a new one if none exists.
    ///
    /// `Ok(None)` means the session prompt closed without a session. The
    /// obtained session becomes the one held by the coordinator.
    pub async fn acquire_session(&self) -> Result<Option<Arc<dyn CastSession>>, CastError> {
        let provider = match self.capabilities.as_ref() {
            Some(capabilities) => Arc::clone(&capabilities.session_provider),
            None => return Err(CastError::CapabilityUnavailable),
        };

        if let Some(session) = provider.current_session() {
            debug!(
                "CastCoordinator: reusing current session {}",
                session.session_id()
            );
            lock_or_recover(&self.state).session = Some(Arc::clone(&session));
            return Ok(Some(session));
        }

        debug!("CastCoordinator: requesting a new cast session");
        let requested = provider
            .request_session()
            .await
            .map_err(CastError::SessionUnavailable)?;
        if let Some(session) = requested.as_ref() {
            info!(
                "CastCoordinator: session {} established",
                session.session_id()
            );
            lock_or_recover(&self.state).session = Some(Arc::clone(session));
        }
        Ok(requested)
    }

    /// Hands playback of the local media element over to a cast receiver.
    ///
    /// Launches are serialized: a second call waits for the first to finish.
    /// Every failure is logged and projected before it is returned, so callers
    /// may ignore the result.
    pub async fn launch(&self) -> Result<(), CastError> {
        let _gate = self.launch_gate.lock().await;
        self.initialize()?;

        let session = match self.acquire_session().await {
            Ok(Some(session)) => session,
            Ok(None) => {
                warn!("CastCoordinator: session request closed without a session");
                return Err(CastError::SessionUnavailable(
                    "no session was selected".to_string(),
                ));
            }
            Err(err) => {
                warn!("CastCoordinator: failed to get cast session: {}", err);
                return Err(err);
            }
        };

        if !self.media.is_paused() {
            self.media.pause();
        }

        let Some(descriptor) = build_descriptor(self.media.as_ref()) else {
            warn!("CastCoordinator: no video source found to cast");
            return Err(CastError::NoPlayableSource);
        };

        info!(
            "CastCoordinator: loading {} ({}) on session {}",
            descriptor.source_url(),
            descriptor.content_type().mime_type(),
            session.session_id()
        );
        let request = LoadRequest {
            descriptor,
            autoplay: true,
            metadata: self.metadata.clone(),
        };
        match session.load_media(request).await {
            Ok(()) => {
                info!("CastCoordinator: media loaded on receiver");
                Ok(())
            }
            Err(reason) => {
                warn!("CastCoordinator: receiver failed to load media: {}", reason);
                self.resume_local_if_paused("load failed");
                lock_or_recover(&self.state).connection_state = CastConnectionState::Error;
                self.project(CastConnectionState::Error);
                Err(CastError::LoadFailed(reason))
            }
        }
    }

    fn resync_connection_state(&self) {
        if let Some(capabilities) = self.capabilities.as_ref() {
            let current = capabilities.session_provider.current_connection_state();
            self.on_connection_state_changed(current);
        }
    }

    fn dispatch(&self, event: CoordinatorEvent) {
        match event {
            CoordinatorEvent::ConnectionStateChanged(state) => {
                self.on_connection_state_changed(state)
            }
            CoordinatorEvent::ConnectionStateLagged => self.resync_connection_state(),
            CoordinatorEvent::RemotePausedChanged(is_paused) => {
                self.on_remote_paused_changed(is_paused)
            }
            CoordinatorEvent::RemoteConnectedChanged(is_connected) => {
                self.on_remote_connected_changed(is_connected)
            }
        }
    }

    /// Drains every subscription without waiting and dispatches the queued
    /// events. Returns the number of events handled.
    ///
    /// Order is kept within each source but not across sources: buffered
    /// connection-state events go first, then remote paused, then remote
    /// connected. Does nothing while [`run`](Self::run) owns the subscriptions.
    pub fn process_pending_events(&self) -> usize {
        let mut events = Vec::new();
        {
            let mut slot = lock_or_recover(&self.subscriptions);
            let Some(subscriptions) = slot.as_mut() else {
                return 0;
            };
            drain_receiver(
                &mut subscriptions.connection_state,
                "connection state",
                &mut events,
                CoordinatorEvent::ConnectionStateChanged,
                Some(CoordinatorEvent::ConnectionStateLagged),
            );
            drain_receiver(
                &mut subscriptions.remote_paused,
                "remote paused",
                &mut events,
                CoordinatorEvent::RemotePausedChanged,
                None,
            );
            drain_receiver(
                &mut subscriptions.remote_connected,
                "remote connected",
                &mut events,
                CoordinatorEvent::RemoteConnectedChanged,
                None,
            );
        }

        let handled = events.len();
        for event in events {
            self.dispatch(event);
        }
        handled
    }

    /// Dispatches events as they arrive until every source closes or
    /// [`shutdown`](Self::shutdown) is called.
    pub async fn run(&self) {
        let taken = lock_or_recover(&self.subscriptions).take();
        let Some(mut subscriptions) = taken else {
            warn!("CastCoordinator: event loop started without subscriptions");
            return;
        };
        info!("CastCoordinator: event loop started");

        let mut connection_open = true;
        let mut paused_open = true;
        let mut connected_open = true;
        while connection_open || paused_open || connected_open {
            let events = tokio::select! {
                _ = self.shutdown_signal.notified() => break,
                received = subscriptions.connection_state.recv(), if connection_open => match received {
                    Ok(state) => vec![CoordinatorEvent::ConnectionStateChanged(state)],
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("CastCoordinator: connection state subscription lagged by {} events", skipped);
                        let mut retained = Vec::new();
                        drain_receiver(
                            &mut subscriptions.connection_state,
                            "connection state",
                            &mut retained,
                            CoordinatorEvent::ConnectionStateChanged,
                            None,
                        );
                        retained.push(CoordinatorEvent::ConnectionStateLagged);
                        retained
                    }
                    Err(RecvError::Closed) => {
                        connection_open = false;
                        Vec::new()
                    }
                },
                received = subscriptions.remote_paused.recv(), if paused_open => match received {
                    Ok(is_paused) => vec![CoordinatorEvent::RemotePausedChanged(is_paused)],
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("CastCoordinator: remote paused subscription lagged by {} events", skipped);
                        Vec::new()
                    }
                    Err(RecvError::Closed) => {
                        paused_open = false;
                        Vec::new()
                    }
                },
                received = subscriptions.remote_connected.recv(), if connected_open => match received {
                    Ok(is_connected) => vec![CoordinatorEvent::RemoteConnectedChanged(is_connected)],
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("CastCoordinator: remote connected subscription lagged by {} events", skipped);
                        Vec::new()
                    }
                    Err(RecvError::Closed) => {
                        connected_open = false;
                        Vec::new()
                    }
                },
            };
            for event in events {
                self.dispatch(event);
            }
        }
        info!("CastCoordinator: event loop stopped");
    }

    /// Drops the event subscriptions and the held session, and stops
    /// [`run`](Self::run).
    pub fn shutdown(&self) {
        lock_or_recover(&self.subscriptions).take();
        if let Some(session) = lock_or_recover(&self.state).session.take() {
            debug!(
                "CastCoordinator: dropping session {} on shutdown",
                session.session_id()
            );
        }
        self.shutdown_signal.notify_one();
    }
}
