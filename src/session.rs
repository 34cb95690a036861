//! Session control facade: the user-initiated start/abort actions and the
//! startup configuration fetch that wires policy into the rest of the
//! client.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::{info, warn};

use crate::api::{ControllerApi, StartSessionRequest};
use crate::media::MediaController;
use crate::state::SharedState;
use crate::voice::{Persona, SharedVoice};

pub const START_ANNOUNCEMENT: &str =
    "Session has begun. You don't touch the controls anymore.";
pub const ABORT_REFUSAL: &str = "Abort is disabled in strict or hardcore mode.";
pub const ABORT_CONFIRMATION_PROMPT: &str = "Abort session? (For testing only)";
pub const ABORT_ANNOUNCEMENT: &str = "Session aborted.";

/// Session durations as the user enters them, in minutes. The controller
/// speaks seconds.
#[derive(Debug, Clone, Copy)]
pub struct StartParams {
    pub pre_wait_min: u64,
    pub decision_hold_min: u64,
    pub punishment_delay_min: u64,
    pub main_min_minutes: u64,
    pub main_max_minutes: u64,
}

impl Default for StartParams {
    fn default() -> Self {
        Self {
            pre_wait_min: 0,
            decision_hold_min: 0,
            punishment_delay_min: 0,
            main_min_minutes: 30,
            main_max_minutes: 120,
        }
    }
}

impl StartParams {
    fn to_request(self) -> StartSessionRequest {
        StartSessionRequest {
            pre_wait_sec: self.pre_wait_min * 60,
            decision_hold_sec: self.decision_hold_min * 60,
            punishment_delay_sec: self.punishment_delay_min * 60,
            main_min_sec: self.main_min_minutes * 60,
            main_max_sec: self.main_max_minutes * 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortOutcome {
    /// Strict/hardcore policy: refused locally, nothing sent.
    Refused,
    /// Caller must come back with explicit confirmation.
    NeedsConfirmation,
    Aborted,
}

pub struct SessionClient {
    api: Arc<dyn ControllerApi>,
    state: SharedState,
    voice: SharedVoice,
    media: MediaController,
}

impl SessionClient {
    pub fn new(
        api: Arc<dyn ControllerApi>,
        state: SharedState,
        voice: SharedVoice,
        media: MediaController,
    ) -> Self {
        Self {
            api,
            state,
            voice,
            media,
        }
    }

    /// Startup configuration fetch. Each piece degrades independently: a
    /// failed fetch leaves that subsystem on its defaults and the client
    /// keeps going.
    pub async fn bootstrap(&self) {
        match self.api.video_config().await {
            Ok(cfg) => self.state.lock().await.media_enabled = cfg.video_enabled,
            Err(err) => warn!("video config fetch failed: {err:#}"),
        }

        match self.api.head_config().await {
            Ok(cfg) => {
                let mut s = self.state.lock().await;
                s.head_tracking_enabled = cfg.head_tracking_enabled;
                s.autopause_enabled = cfg.video_autopause_enabled;
            }
            Err(err) => warn!("head config fetch failed: {err:#}"),
        }

        match self.api.general_config().await {
            Ok(cfg) => {
                let strict = cfg.strict_mode || cfg.hardcore_mode;
                self.state.lock().await.policy.strict_or_hardcore = strict;
                if strict {
                    info!("abort disabled (strict/hardcore)");
                }

                let persona = Persona::parse(cfg.voice_persona.as_deref().unwrap_or(""));
                self.voice
                    .lock()
                    .await
                    .set_policy(cfg.voice_enabled, persona);
            }
            Err(err) => warn!("general config fetch failed: {err:#}"),
        }
    }

    /// Submits a session start. The start control locks optimistically and
    /// unlocks only if the request fails.
    pub async fn start(&self, params: StartParams) -> Result<()> {
        {
            let mut s = self.state.lock().await;
            if s.start_locked {
                bail!("a start request is already submitted");
            }
            s.start_locked = true;
        }

        let outcome = self
            .api
            .start_session(&params.to_request())
            .await
            .context("failed to start session");

        match outcome {
            Ok(res) if res.error.is_none() => {
                {
                    let mut s = self.state.lock().await;
                    s.view.mistress_message = START_ANNOUNCEMENT.to_string();
                }
                self.voice.lock().await.speak(START_ANNOUNCEMENT);
                Ok(())
            }
            Ok(res) => {
                self.state.lock().await.start_locked = false;
                bail!(
                    "error starting session: {}",
                    res.error.unwrap_or_else(|| "unknown error".to_string())
                );
            }
            Err(err) => {
                self.state.lock().await.start_locked = false;
                Err(err)
            }
        }
    }

    /// Abort is refused outright under strict/hardcore policy — no network
    /// call, no override. Otherwise it goes through only with explicit
    /// confirmation, and tears down any live presentation on success.
    pub async fn abort(&self, confirmed: bool) -> Result<AbortOutcome> {
        if self.state.lock().await.policy.strict_or_hardcore {
            self.voice.lock().await.speak(ABORT_REFUSAL);
            return Ok(AbortOutcome::Refused);
        }

        if !confirmed {
            return Ok(AbortOutcome::NeedsConfirmation);
        }

        let res = self
            .api
            .abort_session()
            .await
            .context("failed to abort session")?;
        if let Some(err) = res.error {
            bail!("abort refused: {err}");
        }

        {
            let mut s = self.state.lock().await;
            s.view.mistress_message = ABORT_ANNOUNCEMENT.to_string();
        }
        self.voice.lock().await.speak(ABORT_ANNOUNCEMENT);
        self.media.close_any().await;

        Ok(AbortOutcome::Aborted)
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::Mutex;

    use crate::api::testing::ScriptedController;
    use crate::api::{AckResponse, GeneralConfig};
    use crate::media::surface::testing::RecordingSurface;
    use crate::media::surface::PopupGeometry;
    use crate::media::Presentation;
    use crate::state::{ClientState, DisplayMode};
    use crate::voice::testing::capturing_voice;

    use super::*;

    struct Fixture {
        api: Arc<ScriptedController>,
        state: SharedState,
        client: SessionClient,
        media: MediaController,
        surface: RecordingSurface,
        spoken: Arc<std::sync::Mutex<Vec<String>>>,
    }

    fn fixture(api: ScriptedController) -> Fixture {
        let api = Arc::new(api);
        let api_trait: Arc<dyn ControllerApi> = api.clone();
        let state: SharedState = Arc::new(Mutex::new(ClientState::new()));
        let (voice, spoken) = capturing_voice();
        let surface = RecordingSurface::default();
        let media = MediaController::new(
            Box::new(surface.clone()),
            api_trait.clone(),
            state.clone(),
            voice.clone(),
            PopupGeometry::centered(1920, 1080),
        );
        let client = SessionClient::new(api_trait, state.clone(), voice, media.clone());
        Fixture {
            api,
            state,
            client,
            media,
            surface,
            spoken,
        }
    }

    #[test]
    fn start_params_convert_minutes_to_seconds() {
        let req = StartParams {
            pre_wait_min: 2,
            decision_hold_min: 1,
            punishment_delay_min: 0,
            main_min_minutes: 30,
            main_max_minutes: 120,
        }
        .to_request();

        assert_eq!(req.pre_wait_sec, 120);
        assert_eq!(req.decision_hold_sec, 60);
        assert_eq!(req.punishment_delay_sec, 0);
        assert_eq!(req.main_min_sec, 1800);
        assert_eq!(req.main_max_sec, 7200);
    }

    #[tokio::test]
    async fn successful_start_announces_and_stays_locked() {
        let f = fixture(ScriptedController::default());

        f.client.start(StartParams::default()).await.unwrap();

        assert!(f.state.lock().await.start_locked);
        assert_eq!(
            f.state.lock().await.view.mistress_message,
            START_ANNOUNCEMENT
        );
        assert_eq!(f.spoken.lock().unwrap().as_slice(), [START_ANNOUNCEMENT]);

        // A second submit is refused locally.
        assert!(f.client.start(StartParams::default()).await.is_err());
        assert_eq!(f.api.call_count("start_session"), 1);
    }

    #[tokio::test]
    async fn rejected_start_unlocks_the_control() {
        let mut api = ScriptedController::default();
        api.start_response = AckResponse {
            ok: false,
            error: Some("Session already active".to_string()),
        };
        let f = fixture(api);

        let err = f.client.start(StartParams::default()).await.unwrap_err();
        assert!(err.to_string().contains("Session already active"));
        assert!(!f.state.lock().await.start_locked);

        // The control is usable again.
        let _ = f.client.start(StartParams::default()).await;
        assert_eq!(f.api.call_count("start_session"), 2);
    }

    #[tokio::test]
    async fn transport_failure_on_start_unlocks_the_control() {
        let mut api = ScriptedController::default();
        api.failing.push("start_session");
        let f = fixture(api);

        assert!(f.client.start(StartParams::default()).await.is_err());
        assert!(!f.state.lock().await.start_locked);
    }

    #[tokio::test]
    async fn strict_abort_refuses_without_any_network_call() {
        let f = fixture(ScriptedController::default());
        f.state.lock().await.policy.strict_or_hardcore = true;

        let outcome = f.client.abort(true).await.unwrap();

        assert_eq!(outcome, AbortOutcome::Refused);
        assert!(f.api.calls().is_empty());
        assert_eq!(f.spoken.lock().unwrap().as_slice(), [ABORT_REFUSAL]);
    }

    #[tokio::test]
    async fn abort_requires_explicit_confirmation() {
        let f = fixture(ScriptedController::default());

        let outcome = f.client.abort(false).await.unwrap();

        assert_eq!(outcome, AbortOutcome::NeedsConfirmation);
        assert!(f.api.calls().is_empty());
    }

    #[tokio::test]
    async fn confirmed_abort_tears_down_the_presentation() {
        let f = fixture(ScriptedController::default());
        f.state.lock().await.display_mode = DisplayMode::Popup;
        f.media.start().await;
        assert_eq!(f.media.presentation().await, Presentation::Popup);

        let outcome = f.client.abort(true).await.unwrap();

        assert_eq!(outcome, AbortOutcome::Aborted);
        assert_eq!(f.api.call_count("abort_session"), 1);
        assert_eq!(f.media.presentation().await, Presentation::Idle);
        assert!(!f.surface.popup_open());
        assert_eq!(
            f.state.lock().await.view.mistress_message,
            ABORT_ANNOUNCEMENT
        );
    }

    #[tokio::test]
    async fn abort_rejection_is_surfaced() {
        let mut api = ScriptedController::default();
        api.abort_response = AckResponse {
            ok: false,
            error: Some("Abort is disabled in strict/hardcore mode.".to_string()),
        };
        let f = fixture(api);

        let err = f.client.abort(true).await.unwrap_err();
        assert!(err.to_string().contains("abort refused"));
    }

    #[tokio::test]
    async fn bootstrap_applies_policy_and_toggles() {
        let mut api = ScriptedController::default();
        api.general = GeneralConfig {
            strict_mode: false,
            hardcore_mode: true,
            voice_enabled: true,
            voice_persona: Some("strict".to_string()),
        };
        api.video.video_enabled = false;
        api.head.head_tracking_enabled = false;
        api.head.video_autopause_enabled = true;
        let f = fixture(api);

        f.client.bootstrap().await;

        let s = f.state.lock().await;
        assert!(s.policy.strict_or_hardcore);
        assert!(!s.media_enabled);
        assert!(!s.head_tracking_enabled);
        assert!(s.autopause_enabled);
    }

    #[tokio::test]
    async fn bootstrap_failures_leave_defaults_in_place() {
        let mut api = ScriptedController::default();
        api.failing = vec!["video_config", "head_config", "config"];
        let f = fixture(api);

        f.client.bootstrap().await;

        let s = f.state.lock().await;
        assert!(s.media_enabled);
        assert!(s.head_tracking_enabled);
        assert!(!s.policy.strict_or_hardcore);
    }
}
