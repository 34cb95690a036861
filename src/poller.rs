//! Remote status poll loop. Deliberately a fetch-then-wait loop rather than a
//! fixed-rate timer: the next poll starts one interval after the previous one
//! finished, so a slow controller naturally throttles the cadence. The loop
//! is the client's liveness backbone and survives any number of failures.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::api::{ControllerApi, SessionStatus};
use crate::media::MediaController;
use crate::state::{fmt_time, DisplayMode, SharedState};
use crate::voice::SharedVoice;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

pub const POLL_INTERVAL: Duration = Duration::from_millis(1000);

pub async fn status_loop(
    api: Arc<dyn ControllerApi>,
    state: SharedState,
    media: MediaController,
    voice: SharedVoice,
    cancel: CancellationToken,
) {
    loop {
        match api.session_status().await {
            Ok(status) => {
                let start_media = apply_status(&status, &state, &voice).await;
                if start_media && !media.is_presenting().await {
                    // Fire-and-forget like the rest of the triggers; the
                    // controller re-checks its own state under lock.
                    let media = media.clone();
                    tokio::spawn(async move { media.start().await });
                }
            }
            Err(err) => {
                let stale_sec = {
                    let s = state.lock().await;
                    s.last_status_at
                        .map(|t| (Utc::now() - t).num_seconds())
                        .unwrap_or(0)
                };
                log_warn!("session status poll failed ({stale_sec}s stale): {err:#}");
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                log_info!("status poll loop shutting down");
                break;
            }
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
        }
    }
}

/// Normalizes one status payload into the shared state and performs the
/// display-side effects. Returns whether the controller asked for a media
/// start this cycle (and the media toggle allows it).
pub(crate) async fn apply_status(
    status: &SessionStatus,
    state: &SharedState,
    voice: &SharedVoice,
) -> bool {
    let (message, start_media) = {
        let mut s = state.lock().await;

        let phase = status
            .phase
            .clone()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| "idle".to_string());
        let remaining_sec = status.remaining_sec.max(0) as u64;
        if phase != s.view.phase {
            log_info!("session phase: {phase} ({} remaining)", fmt_time(remaining_sec));
        }

        s.view.active = status.active;
        s.view.phase = phase;
        s.view.remaining_sec = remaining_sec;
        s.view.head_violation_count = status.head_violation_count;

        let message = status.mistress_message.clone().filter(|m| !m.is_empty());
        if let Some(m) = &message {
            s.view.mistress_message = m.clone();
        }

        if let Some(update) = &status.head_thresholds {
            s.thresholds.apply(update);
        }

        if status.coyote_pulse_pending {
            log_info!("pulse flag set (generic marker)");
        }

        if let Some(mode) = &status.video_display_mode {
            s.display_mode = DisplayMode::parse(mode);
        }

        s.last_status_at = Some(Utc::now());

        (message, status.video_should_start && s.media_enabled)
    };

    if let Some(m) = message {
        voice.lock().await.speak(&m);
    }

    start_media
}

#[cfg(test)]
mod tests {
    use tokio::sync::Mutex;

    use crate::api::testing::ScriptedController;
    use crate::media::surface::testing::RecordingSurface;
    use crate::media::surface::PopupGeometry;
    use crate::media::Presentation;
    use crate::state::ClientState;
    use crate::voice::testing::capturing_voice;

    use super::*;

    fn shared_state() -> SharedState {
        Arc::new(Mutex::new(ClientState::new()))
    }

    fn status(raw: serde_json::Value) -> SessionStatus {
        serde_json::from_value(raw).unwrap()
    }

    #[tokio::test]
    async fn view_fields_are_overwritten_with_fallbacks() {
        let state = shared_state();
        let (voice, _) = capturing_voice();

        apply_status(&status(serde_json::json!({})), &state, &voice).await;

        let s = state.lock().await;
        assert!(!s.view.active);
        assert_eq!(s.view.phase, "idle");
        assert_eq!(s.view.remaining_sec, 0);
        assert_eq!(s.view.head_violation_count, 0);
    }

    #[tokio::test]
    async fn mistress_message_is_kept_and_spoken() {
        let state = shared_state();
        let (voice, spoken) = capturing_voice();

        let payload = status(serde_json::json!({
            "active": true,
            "phase": "main",
            "remaining_sec": 90,
            "mistress_message": "Session started. Your control ends here."
        }));
        apply_status(&payload, &state, &voice).await;

        // A later payload without a message leaves the last one in place.
        apply_status(
            &status(serde_json::json!({"active": true, "phase": "main"})),
            &state,
            &voice,
        )
        .await;

        assert_eq!(
            state.lock().await.view.mistress_message,
            "Session started. Your control ends here."
        );
        assert_eq!(
            spoken.lock().unwrap().as_slice(),
            ["Session started. Your control ends here."]
        );
    }

    #[tokio::test]
    async fn repeated_messages_are_spoken_once() {
        let state = shared_state();
        let (voice, spoken) = capturing_voice();
        let payload = status(serde_json::json!({"mistress_message": "Eyes forward."}));

        apply_status(&payload, &state, &voice).await;
        apply_status(&payload, &state, &voice).await;

        assert_eq!(spoken.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn thresholds_and_display_mode_are_updated_opportunistically() {
        let state = shared_state();
        let (voice, _) = capturing_voice();

        let payload = status(serde_json::json!({
            "head_thresholds": {"down_deg": 25, "debounce_ms": 4000},
            "video_display_mode": "popup"
        }));
        apply_status(&payload, &state, &voice).await;

        let s = state.lock().await;
        assert_eq!(s.thresholds.down_deg, 25.0);
        assert_eq!(s.thresholds.debounce_ms, 4000);
        assert_eq!(s.thresholds.away_deg, 35.0);
        assert_eq!(s.display_mode, DisplayMode::Popup);
    }

    #[tokio::test]
    async fn negative_remaining_time_clamps_to_zero() {
        let state = shared_state();
        let (voice, _) = capturing_voice();

        apply_status(&status(serde_json::json!({"remaining_sec": -5})), &state, &voice).await;

        assert_eq!(state.lock().await.view.remaining_sec, 0);
    }

    #[tokio::test]
    async fn media_start_is_requested_only_when_the_toggle_allows() {
        let state = shared_state();
        let (voice, _) = capturing_voice();
        let payload = status(serde_json::json!({"video_should_start": true}));

        assert!(apply_status(&payload, &state, &voice).await);

        state.lock().await.media_enabled = false;
        assert!(!apply_status(&payload, &state, &voice).await);
    }

    #[tokio::test]
    async fn poll_signal_drives_a_popup_presentation() {
        // video_should_start with popup mode must end with a popup opened on
        // the freshly selected url.
        let api = Arc::new(ScriptedController::default());
        let api_trait: Arc<dyn ControllerApi> = api.clone();
        let state = shared_state();
        let (voice, _) = capturing_voice();
        let surface = RecordingSurface::default();
        let media = MediaController::new(
            Box::new(surface.clone()),
            api_trait,
            state.clone(),
            voice.clone(),
            PopupGeometry::centered(1920, 1080),
        );

        let payload = status(serde_json::json!({
            "video_should_start": true,
            "video_display_mode": "popup"
        }));
        let start = apply_status(&payload, &state, &voice).await;
        assert!(start);
        if start && !media.is_presenting().await {
            media.start().await;
        }

        assert_eq!(media.presentation().await, Presentation::Popup);
        assert_eq!(api.call_count("video_random"), 1);
        assert_eq!(
            surface.popup_url().as_deref(),
            Some("http://controller/media/clip-1")
        );
    }
}
