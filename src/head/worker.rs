//! Violation raising: consumes the orientation feed, debounces candidate
//! violations, and runs the report round-trip against the controller.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::api::ControllerApi;
use crate::media::MediaController;
use crate::state::SharedState;
use crate::voice::SharedVoice;

use super::tracker::{HeadTracker, OrientationSample, ViolationKind};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// At-most-one-concurrent-report gate with a debounce window measured from
/// the acceptance timestamp, not report completion. Acceptance stamps the
/// window and takes the pending slot in one step, before the remote call
/// suspends, so two near-simultaneous samples cannot both pass.
pub struct ReportGate {
    pending: bool,
    last_accepted: Option<Instant>,
}

impl ReportGate {
    pub fn new() -> Self {
        Self {
            pending: false,
            last_accepted: None,
        }
    }

    pub fn try_accept(&mut self, now: Instant, debounce: Duration) -> bool {
        if self.pending {
            return false;
        }
        if let Some(last) = self.last_accepted {
            if now.duration_since(last) < debounce {
                return false;
            }
        }
        self.pending = true;
        self.last_accepted = Some(now);
        true
    }

    pub fn clear_pending(&mut self) {
        self.pending = false;
    }
}

pub async fn head_loop(
    mut samples: mpsc::Receiver<OrientationSample>,
    api: Arc<dyn ControllerApi>,
    state: SharedState,
    media: MediaController,
    voice: SharedVoice,
    cancel: CancellationToken,
) {
    let mut tracker = HeadTracker::new();
    let mut gate = ReportGate::new();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                log_info!("head tracking loop shutting down");
                break;
            }
            maybe = samples.recv() => {
                let Some(sample) = maybe else {
                    log_info!("orientation feed ended; head tracking stops");
                    break;
                };

                let now = Instant::now();
                let (tracking_enabled, thresholds) = {
                    let s = state.lock().await;
                    (s.head_tracking_enabled, s.thresholds.clone())
                };

                let Some(kind) =
                    tracker.observe(sample, now, tracking_enabled, &thresholds) else {
                    continue;
                };

                if !gate.try_accept(now, Duration::from_millis(thresholds.debounce_ms)) {
                    continue;
                }

                report_violation(kind, api.as_ref(), &state, &media, &voice, &mut gate).await;
            }
        }
    }
}

/// Runs one accepted violation's round trip. The pending flag and the dim cue
/// are cleared on every exit path, success or failure.
pub(crate) async fn report_violation(
    kind: ViolationKind,
    api: &dyn ControllerApi,
    state: &SharedState,
    media: &MediaController,
    voice: &SharedVoice,
    gate: &mut ReportGate,
) {
    log_info!("head violation accepted ({kind})");

    let autopause = state.lock().await.autopause_enabled;
    if autopause {
        media.set_dimmed(true).await;
    }

    match api.report_head_violation().await {
        Ok(res) if res.ok => {
            if let Some(actions) = res.actions {
                if let Some(message) = actions.message.filter(|m| !m.is_empty()) {
                    {
                        let mut s = state.lock().await;
                        s.view.mistress_message = message.clone();
                    }
                    voice.lock().await.speak(&message);
                }
                if actions.switch_video {
                    let media_enabled = state.lock().await.media_enabled;
                    if media_enabled {
                        media.close_any().await;
                        media.start().await;
                    }
                }
            }
        }
        Ok(res) => {
            log_warn!(
                "head violation rejected: {}",
                res.error.unwrap_or_else(|| "unknown error".to_string())
            );
        }
        Err(err) => log_warn!("head violation report failed: {err:#}"),
    }

    gate.clear_pending();
    if autopause {
        media.set_dimmed(false).await;
    }
}
