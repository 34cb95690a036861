//! Media delivery state machine: Idle -> Presenting(Overlay | Popup) -> Idle.
//! Starting is poll- or violation-triggered; those paths can race, so every
//! transition re-checks the current presentation under the controller's own
//! lock at the point of action.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::api::ControllerApi;
use crate::state::{DisplayMode, SharedState};
use crate::voice::SharedVoice;

use super::surface::{MediaSurface, PopupGeometry};
use super::watcher::{watch_until_closed, WATCH_INTERVAL};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Presentation {
    #[default]
    Idle,
    Overlay,
    Popup,
}

#[derive(Default)]
struct MediaInner {
    presentation: Presentation,
    watcher_token: Option<CancellationToken>,
}

#[derive(Clone)]
pub struct MediaController {
    inner: Arc<Mutex<MediaInner>>,
    surface: Arc<Mutex<Box<dyn MediaSurface>>>,
    api: Arc<dyn ControllerApi>,
    state: SharedState,
    voice: SharedVoice,
    geometry: PopupGeometry,
}

impl MediaController {
    pub fn new(
        surface: Box<dyn MediaSurface>,
        api: Arc<dyn ControllerApi>,
        state: SharedState,
        voice: SharedVoice,
        geometry: PopupGeometry,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MediaInner::default())),
            surface: Arc::new(Mutex::new(surface)),
            api,
            state,
            voice,
            geometry,
        }
    }

    pub async fn presentation(&self) -> Presentation {
        self.inner.lock().await.presentation
    }

    pub async fn is_presenting(&self) -> bool {
        self.presentation().await != Presentation::Idle
    }

    /// Entry point for both the poll trigger and the violation swap path.
    /// No-op unless media is enabled and nothing is presenting.
    pub async fn start(&self) {
        let (enabled, mode) = {
            let s = self.state.lock().await;
            (s.media_enabled, s.display_mode)
        };
        if !enabled || self.is_presenting().await {
            return;
        }

        let selection = match self.api.select_video().await {
            Ok(selection) => selection,
            Err(err) => {
                log_warn!("media selection failed: {err:#}");
                return;
            }
        };
        if let Some(err) = selection.error {
            log_warn!("no media available: {err}");
            return;
        }
        let Some(url) = selection.url.filter(|u| !u.is_empty()) else {
            log_warn!("media selection returned no url");
            return;
        };

        match mode {
            DisplayMode::Popup => self.open_popup(&url).await,
            DisplayMode::Auto | DisplayMode::Fullscreen => self.open_overlay(&url, mode).await,
        }
    }

    async fn open_overlay(&self, url: &str, mode: DisplayMode) {
        let mut inner = self.inner.lock().await;
        if inner.presentation != Presentation::Idle {
            return;
        }

        let mut surface = self.surface.lock().await;
        if let Err(err) = surface.show_overlay(url) {
            log_warn!("overlay presentation failed: {err:#}");
            return;
        }
        inner.presentation = Presentation::Overlay;

        if let Err(err) = surface.enter_fullscreen() {
            log_warn!("fullscreen failed: {err:#}");
            if mode == DisplayMode::Auto {
                surface.hide_overlay();
                inner.presentation = Presentation::Idle;
                drop(surface);
                self.open_popup_locked(&mut inner, url).await;
            }
            // Explicit fullscreen mode keeps the windowed overlay; there is
            // no further fallback.
        }
    }

    async fn open_popup(&self, url: &str) {
        let mut inner = self.inner.lock().await;
        if inner.presentation != Presentation::Idle {
            return;
        }
        self.open_popup_locked(&mut inner, url).await;
    }

    async fn open_popup_locked(&self, inner: &mut MediaInner, url: &str) {
        {
            let mut surface = self.surface.lock().await;
            if let Err(err) = surface.open_popup(url, self.geometry) {
                log_warn!("popup may have been blocked: {err:#}");
                return;
            }
        }
        inner.presentation = Presentation::Popup;

        let token = CancellationToken::new();
        inner.watcher_token = Some(token.clone());

        let this = self.clone();
        tokio::spawn(async move {
            let surface = this.surface.clone();
            let closed = watch_until_closed(WATCH_INTERVAL, token, move || {
                let surface = surface.clone();
                async move { surface.lock().await.popup_closed() }
            })
            .await;
            if closed {
                this.on_popup_closed().await;
            }
        });
    }

    /// The watcher observed the popup gone without us closing it.
    async fn on_popup_closed(&self) {
        {
            let mut inner = self.inner.lock().await;
            if inner.presentation != Presentation::Popup {
                // A programmatic teardown won the race; nothing escaped.
                return;
            }
            inner.presentation = Presentation::Idle;
            inner.watcher_token = None;
            // Defensive cleanup of any overlay remnants as well.
            self.surface.lock().await.hide_overlay();
        }

        log_info!("popup closed by user; reporting evasion");
        self.report_evasion().await;
    }

    async fn report_evasion(&self) {
        match self.api.report_video_violation().await {
            Ok(res) if res.ok => {
                if let Some(extra) = res.extra_min {
                    let line = format!("You tried to exit. {extra} minutes added.");
                    {
                        let mut s = self.state.lock().await;
                        s.view.mistress_message = line.clone();
                    }
                    self.voice.lock().await.speak(&line);
                }
            }
            Ok(res) => {
                log_warn!(
                    "evasion report rejected: {}",
                    res.error.unwrap_or_else(|| "unknown error".to_string())
                );
            }
            // Not retried; the controller reconciles elapsed time on its own.
            Err(err) => log_warn!("evasion report failed: {err:#}"),
        }
    }

    /// Uniform teardown of whatever is presenting. Idempotent.
    pub async fn close_any(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(token) = inner.watcher_token.take() {
            token.cancel();
        }
        let mut surface = self.surface.lock().await;
        surface.hide_overlay();
        surface.close_popup();
        inner.presentation = Presentation::Idle;
    }

    /// Distracted cue while a violation report is in flight. Dimming only
    /// applies to a live presentation; clearing is always forwarded so a
    /// failed report can never leave the surface stuck dim.
    pub async fn set_dimmed(&self, dimmed: bool) {
        let inner = self.inner.lock().await;
        if dimmed && inner.presentation == Presentation::Idle {
            return;
        }
        self.surface.lock().await.set_dimmed(dimmed);
    }
}
