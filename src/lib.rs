pub mod api;
pub mod head;
pub mod media;
pub mod poller;
pub mod session;
pub mod settings;
pub mod simulator;
pub mod state;
mod utils;
pub mod voice;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use api::{ControllerApi, HttpController};
use media::player::PlayerSurface;
use media::{MediaController, PopupGeometry};
use session::{AbortOutcome, SessionClient, StartParams};
use settings::{ClientSettings, SettingsStore};
use state::{ClientState, SharedState};
use voice::{CommandSynth, SharedVoice, VoiceChannel};

const ORIENTATION_FEED_BUFFER: usize = 64;

struct Components {
    api: Arc<dyn ControllerApi>,
    state: SharedState,
    media: MediaController,
    voice: SharedVoice,
    client: SessionClient,
}

fn build(settings: &ClientSettings) -> Result<Components> {
    let api: Arc<dyn ControllerApi> = Arc::new(HttpController::new(&settings.controller_url)?);
    let state: SharedState = Arc::new(Mutex::new(ClientState::new()));
    let voice: SharedVoice = Arc::new(Mutex::new(VoiceChannel::new(Box::new(
        CommandSynth::new(settings.speech_command.clone()),
    ))));
    let media = MediaController::new(
        Box::new(PlayerSurface::new(settings)),
        api.clone(),
        state.clone(),
        voice.clone(),
        PopupGeometry::centered(settings.screen_width, settings.screen_height),
    );
    let client = SessionClient::new(api.clone(), state.clone(), voice.clone(), media.clone());

    Ok(Components {
        api,
        state,
        media,
        voice,
        client,
    })
}

fn load_settings(path: PathBuf) -> Result<ClientSettings> {
    Ok(SettingsStore::new(path)?.get())
}

/// The full client: status polling, head tracking fed from stdin, media
/// delivery. Runs until Ctrl-C.
pub async fn run(settings_path: PathBuf) -> Result<()> {
    let settings = load_settings(settings_path)?;
    let c = build(&settings)?;

    info!("nexus-client starting up, controller at {}", settings.controller_url);
    c.client.bootstrap().await;

    let cancel = CancellationToken::new();

    let poll_handle = tokio::spawn(poller::status_loop(
        c.api.clone(),
        c.state.clone(),
        c.media.clone(),
        c.voice.clone(),
        cancel.child_token(),
    ));

    let head_handle = if c.state.lock().await.head_tracking_enabled {
        let (tx, rx) = mpsc::channel(ORIENTATION_FEED_BUFFER);
        tokio::spawn(head::source::stdin_feed(tx));
        Some(tokio::spawn(head::worker::head_loop(
            rx,
            c.api.clone(),
            c.state.clone(),
            c.media.clone(),
            c.voice.clone(),
            cancel.child_token(),
        )))
    } else {
        info!("head tracking disabled by controller config");
        None
    };

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutting down");

    cancel.cancel();
    c.media.close_any().await;

    poll_handle
        .await
        .context("status poll task failed to join")?;
    if let Some(handle) = head_handle {
        handle.await.context("head tracking task failed to join")?;
    }
    Ok(())
}

/// One-shot session start against the controller.
pub async fn run_start(settings_path: PathBuf, params: StartParams) -> Result<()> {
    let settings = load_settings(settings_path)?;
    let c = build(&settings)?;
    c.client.bootstrap().await;
    c.client.start(params).await?;
    info!("session started");
    Ok(())
}

/// One-shot session abort. Policy and confirmation gating happen in the
/// facade; the outcome is returned for the CLI to render.
pub async fn run_abort(settings_path: PathBuf, confirmed: bool) -> Result<AbortOutcome> {
    let settings = load_settings(settings_path)?;
    let c = build(&settings)?;
    c.client.bootstrap().await;
    c.client.abort(confirmed).await
}
