//! Demo driver: runs a scripted cast scenario against the simulated SDK.
//!
//! Usage: `castsync [SOURCE_URL]`. The config file is read from the platform
//! config directory and created with defaults on first run.

use std::sync::Arc;

use castsync::capabilities::MediaElement;
use castsync::config::Config;
use castsync::config_persistence::{default_config_path, load_or_create_config};
use castsync::protocol::CastConnectionState;
use castsync::simulated::{
    simulated_capabilities, RecordingCastButton, SimulatedMediaElement, SimulatedRemotePlayer,
    SimulatedSession, SimulatedSessionProvider,
};
use castsync::CastCoordinator;
use log::{info, warn};

const DEFAULT_DEMO_SOURCE: &str = "https://media.example/sintel/trailer.mp4";

async fn run_scenario(config: Config, source_url: String) {
    let provider = SimulatedSessionProvider::new();
    let remote = SimulatedRemotePlayer::new();
    let media = Arc::new(SimulatedMediaElement::new(&source_url));
    let button = Arc::new(RecordingCastButton::new());
    let coordinator = CastCoordinator::new(
        Some(simulated_capabilities(&provider, &remote)),
        media.clone(),
        button.clone(),
        config.cast.to_options(),
    )
    .with_metadata(config.media.to_metadata());

    if let Err(err) = coordinator.initialize() {
        warn!("Demo: {}", err);
        return;
    }

    info!("Demo: user starts casting {}", source_url);
    let session = SimulatedSession::new("demo-session");
    provider.answer_next_request(Ok(Some(session.clone())));
    if let Err(err) = coordinator.launch().await {
        warn!("Demo: launch failed: {}", err);
    }
    coordinator.process_pending_events();
    if let Some(request) = session.loads().last() {
        info!("Demo: receiver got {}", request.to_cast_payload(1));
    }

    info!("Demo: receiver pauses, then drops off the network");
    remote.report_connected(true);
    remote.report_paused(true);
    remote.report_connected(false);
    coordinator.process_pending_events();
    provider.end_session();
    coordinator.process_pending_events();

    info!("Demo: user retries against a receiver that rejects the media");
    let failing = SimulatedSession::new("demo-session-2");
    failing.fail_loads_with("LOAD_FAILED");
    provider.answer_next_request(Ok(Some(failing)));
    if let Err(err) = coordinator.launch().await {
        warn!("Demo: launch failed: {}", err);
    }

    let state = coordinator.connection_state();
    info!(
        "Demo: finished state={} local_paused={} play_calls={} pause_calls={} button_renders={}",
        state,
        media.is_paused(),
        media.play_calls(),
        media.pause_calls(),
        button.render_count()
    );
    if state != CastConnectionState::Error {
        warn!("Demo: expected the rejected load to leave the button in ERROR");
    }
    coordinator.shutdown();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut clog = colog::default_builder();
    clog.filter(None, log::LevelFilter::Debug);
    clog.init();

    let config = match default_config_path() {
        Some(path) => load_or_create_config(&path),
        None => {
            warn!("No platform config directory. Using default config.");
            Config::default()
        }
    };
    let source_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_DEMO_SOURCE.to_string());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    runtime.block_on(run_scenario(config, source_url));
    Ok(())
}
