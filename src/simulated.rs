//! In-memory stand-ins for the casting SDK and the embedding page.
//!
//! Each simulated component records the calls made against it so flows can be
//! asserted after the fact. The demo driver uses the same components to run a
//! scripted cast scenario without a receiver on the network.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use log::debug;
use tokio::sync::broadcast::{self, Receiver, Sender};

use crate::capabilities::{
    CastButton, CastCapabilities, CastSession, MediaElement, RemotePlayerObserver,
    SessionProvider,
};
use crate::lock_or_recover;
use crate::protocol::{ButtonProjection, CastConnectionState, CastOptions, LoadRequest};

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Default)]
struct MediaElementState {
    paused: bool,
    src: String,
    first_source: Option<String>,
    play_calls: usize,
    pause_calls: usize,
}

/// Local media element backed by plain fields.
#[derive(Debug, Default)]
pub struct SimulatedMediaElement {
    state: Mutex<MediaElementState>,
}

impl SimulatedMediaElement {
    /// Creates an element that is currently playing `src`.
    pub fn new(src: &str) -> Self {
        Self {
            state: Mutex::new(MediaElementState {
                src: src.to_string(),
                ..MediaElementState::default()
            }),
        }
    }

    pub fn set_first_source(&self, url: Option<&str>) {
        lock_or_recover(&self.state).first_source = url.map(ToString::to_string);
    }

    /// Changes play/pause state the way a user would, without counting it as a
    /// coordinator call.
    pub fn set_paused_by_user(&self, paused: bool) {
        lock_or_recover(&self.state).paused = paused;
    }

    pub fn play_calls(&self) -> usize {
        lock_or_recover(&self.state).play_calls
    }

    pub fn pause_calls(&self) -> usize {
        lock_or_recover(&self.state).pause_calls
    }
}

impl MediaElement for SimulatedMediaElement {
    fn is_paused(&self) -> bool {
        lock_or_recover(&self.state).paused
    }

    fn play(&self) {
        let mut state = lock_or_recover(&self.state);
        state.paused = false;
        state.play_calls += 1;
    }

    fn pause(&self) {
        let mut state = lock_or_recover(&self.state);
        state.paused = true;
        state.pause_calls += 1;
    }

    fn src(&self) -> String {
        lock_or_recover(&self.state).src.clone()
    }

    fn first_source_url(&self) -> Option<String> {
        lock_or_recover(&self.state).first_source.clone()
    }
}

/// Cast affordance that keeps every projection it was asked to render.
#[derive(Debug, Default)]
pub struct RecordingCastButton {
    renders: Mutex<Vec<ButtonProjection>>,
}

impl RecordingCastButton {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<ButtonProjection> {
        lock_or_recover(&self.renders).last().copied()
    }

    pub fn render_count(&self) -> usize {
        lock_or_recover(&self.renders).len()
    }
}

impl CastButton for RecordingCastButton {
    fn render(&self, projection: ButtonProjection) {
        debug!(
            "RecordingCastButton: data-cast-state={} visible={}",
            projection.attribute, projection.visible
        );
        lock_or_recover(&self.renders).push(projection);
    }
}

/// Session whose load outcome is scripted up front.
pub struct SimulatedSession {
    id: String,
    load_outcome: Mutex<Result<(), String>>,
    loads: Mutex<Vec<LoadRequest>>,
    observed_media: Mutex<Option<Arc<dyn MediaElement>>>,
    paused_at_load: Mutex<Vec<bool>>,
}

impl SimulatedSession {
    pub fn new(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            load_outcome: Mutex::new(Ok(())),
            loads: Mutex::new(Vec::new()),
            observed_media: Mutex::new(None),
            paused_at_load: Mutex::new(Vec::new()),
        })
    }

    /// Samples `media` every time a load request arrives.
    pub fn observe_media(&self, media: Arc<dyn MediaElement>) {
        *lock_or_recover(&self.observed_media) = Some(media);
    }

    /// Makes every following load request fail with `reason`.
    pub fn fail_loads_with(&self, reason: &str) {
        *lock_or_recover(&self.load_outcome) = Err(reason.to_string());
    }

    pub fn loads(&self) -> Vec<LoadRequest> {
        lock_or_recover(&self.loads).clone()
    }

    /// Paused state of the observed media element at each load, in order.
    pub fn paused_at_load(&self) -> Vec<bool> {
        lock_or_recover(&self.paused_at_load).clone()
    }
}

#[async_trait]
impl CastSession for SimulatedSession {
    fn session_id(&self) -> String {
        self.id.clone()
    }

    async fn load_media(&self, request: LoadRequest) -> Result<(), String> {
        let observed = lock_or_recover(&self.observed_media).clone();
        if let Some(media) = observed {
            lock_or_recover(&self.paused_at_load).push(media.is_paused());
        }
        lock_or_recover(&self.loads).push(request);
        tokio::task::yield_now().await;
        lock_or_recover(&self.load_outcome).clone()
    }
}

/// Scripted answer to the next session request.
pub type SessionRequestOutcome = Result<Option<Arc<SimulatedSession>>, String>;

struct ProviderState {
    connection_state: CastConnectionState,
    current_session: Option<Arc<SimulatedSession>>,
    next_request_outcome: SessionRequestOutcome,
    configured_with: Vec<CastOptions>,
    subscribe_calls: usize,
    request_calls: usize,
}

/// Session provider driven by test or demo code.
pub struct SimulatedSessionProvider {
    state_events: Sender<CastConnectionState>,
    state: Mutex<ProviderState>,
}

impl SimulatedSessionProvider {
    /// Creates a provider that has devices around but no session yet.
    pub fn new() -> Arc<Self> {
        let (state_events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            state_events,
            state: Mutex::new(ProviderState {
                connection_state: CastConnectionState::NotConnected,
                current_session: None,
                next_request_outcome: Ok(None),
                configured_with: Vec::new(),
                subscribe_calls: 0,
                request_calls: 0,
            }),
        })
    }

    /// Scripts the result of the next `request_session` call.
    pub fn answer_next_request(&self, outcome: SessionRequestOutcome) {
        lock_or_recover(&self.state).next_request_outcome = outcome;
    }

    /// Installs an already-joined session without going through a request.
    pub fn join_existing(&self, session: Arc<SimulatedSession>) {
        lock_or_recover(&self.state).current_session = Some(session);
        self.set_connection_state(CastConnectionState::Connected);
    }

    /// Drops the current session and reports `NotConnected`.
    pub fn end_session(&self) {
        lock_or_recover(&self.state).current_session = None;
        self.set_connection_state(CastConnectionState::NotConnected);
    }

    pub fn set_connection_state(&self, state: CastConnectionState) {
        lock_or_recover(&self.state).connection_state = state;
        let _ = self.state_events.send(state);
    }

    pub fn subscribe_calls(&self) -> usize {
        lock_or_recover(&self.state).subscribe_calls
    }

    pub fn request_calls(&self) -> usize {
        lock_or_recover(&self.state).request_calls
    }

    pub fn configured_with(&self) -> Vec<CastOptions> {
        lock_or_recover(&self.state).configured_with.clone()
    }
}

#[async_trait]
impl SessionProvider for SimulatedSessionProvider {
    fn configure(&self, options: &CastOptions) {
        lock_or_recover(&self.state)
            .configured_with
            .push(options.clone());
    }

    fn current_connection_state(&self) -> CastConnectionState {
        lock_or_recover(&self.state).connection_state
    }

    fn subscribe_connection_state(&self) -> Receiver<CastConnectionState> {
        lock_or_recover(&self.state).subscribe_calls += 1;
        self.state_events.subscribe()
    }

    fn current_session(&self) -> Option<Arc<dyn CastSession>> {
        lock_or_recover(&self.state)
            .current_session
            .clone()
            .map(|session| session as Arc<dyn CastSession>)
    }

    async fn request_session(&self) -> Result<Option<Arc<dyn CastSession>>, String> {
        lock_or_recover(&self.state).request_calls += 1;
        self.set_connection_state(CastConnectionState::Connecting);
        tokio::task::yield_now().await;

        let outcome = std::mem::replace(
            &mut lock_or_recover(&self.state).next_request_outcome,
            Ok(None),
        );
        match outcome {
            Ok(Some(session)) => {
                lock_or_recover(&self.state).current_session = Some(Arc::clone(&session));
                self.set_connection_state(CastConnectionState::Connected);
                Ok(Some(session as Arc<dyn CastSession>))
            }
            Ok(None) => {
                self.set_connection_state(CastConnectionState::NotConnected);
                Ok(None)
            }
            Err(reason) => {
                self.set_connection_state(CastConnectionState::NotConnected);
                Err(reason)
            }
        }
    }
}

/// Remote player reporter driven by test or demo code.
pub struct SimulatedRemotePlayer {
    paused_events: Sender<bool>,
    connected_events: Sender<bool>,
    subscribe_calls: Mutex<usize>,
}

impl SimulatedRemotePlayer {
    pub fn new() -> Arc<Self> {
        let (paused_events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (connected_events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            paused_events,
            connected_events,
            subscribe_calls: Mutex::new(0),
        })
    }

    pub fn report_paused(&self, is_paused: bool) {
        let _ = self.paused_events.send(is_paused);
    }

    pub fn report_connected(&self, is_connected: bool) {
        let _ = self.connected_events.send(is_connected);
    }

    pub fn subscribe_calls(&self) -> usize {
        *lock_or_recover(&self.subscribe_calls)
    }
}

impl RemotePlayerObserver for SimulatedRemotePlayer {
    fn subscribe_paused(&self) -> Receiver<bool> {
        *lock_or_recover(&self.subscribe_calls) += 1;
        self.paused_events.subscribe()
    }

    fn subscribe_connected(&self) -> Receiver<bool> {
        *lock_or_recover(&self.subscribe_calls) += 1;
        self.connected_events.subscribe()
    }
}

/// Bundles simulated SDK components into the capability set the coordinator takes.
pub fn simulated_capabilities(
    provider: &Arc<SimulatedSessionProvider>,
    remote_player: &Arc<SimulatedRemotePlayer>,
) -> CastCapabilities {
    CastCapabilities {
        session_provider: Arc::clone(provider) as Arc<dyn SessionProvider>,
        remote_player: Arc::clone(remote_player) as Arc<dyn RemotePlayerObserver>,
    }
}
