use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::api::HeadThresholdUpdate;

/// All client-side mutable state, owned by the session facade and shared with
/// the workers. Everything in here is either startup configuration or a
/// normalized copy of the latest poll response; the controller is the
/// authority for all of it.
pub type SharedState = Arc<Mutex<ClientState>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    #[default]
    Auto,
    Fullscreen,
    Popup,
}

impl DisplayMode {
    /// Unknown labels fall back to `Auto`, matching the controller's own
    /// default for the field.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "fullscreen" => DisplayMode::Fullscreen,
            "popup" => DisplayMode::Popup,
            _ => DisplayMode::Auto,
        }
    }
}

/// Head-tracking violation thresholds. The controller re-issues these with
/// every status poll and may tighten them mid-session.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadThresholds {
    pub down_deg: f64,
    pub away_deg: f64,
    pub stillness_ms: u64,
    pub debounce_ms: u64,
}

impl Default for HeadThresholds {
    fn default() -> Self {
        Self {
            down_deg: 30.0,
            away_deg: 35.0,
            stillness_ms: 15_000,
            debounce_ms: 5_000,
        }
    }
}

impl HeadThresholds {
    /// Field-by-field update: a field changes only when the controller sent a
    /// nonzero value for it, so partial payloads never null out the rest.
    /// `still_sec` arrives in seconds and is stored in milliseconds.
    pub fn apply(&mut self, update: &HeadThresholdUpdate) {
        if let Some(v) = update.down_deg {
            if v > 0.0 {
                self.down_deg = v;
            }
        }
        if let Some(v) = update.away_deg {
            if v > 0.0 {
                self.away_deg = v;
            }
        }
        if let Some(v) = update.still_sec {
            if v > 0 {
                self.stillness_ms = v * 1000;
            }
        }
        if let Some(v) = update.debounce_ms {
            if v > 0 {
                self.debounce_ms = v;
            }
        }
    }
}

/// Display-facing session state, derived entirely from the latest poll
/// response. The client has no local authority over session time.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub active: bool,
    pub phase: String,
    pub remaining_sec: u64,
    pub head_violation_count: u32,
    pub mistress_message: String,
}

impl Default for SessionView {
    fn default() -> Self {
        Self {
            active: false,
            phase: "idle".to_string(),
            remaining_sec: 0,
            head_violation_count: 0,
            mistress_message: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ControlPolicy {
    /// Fetched once at startup; the sole authority for disabling abort.
    pub strict_or_hardcore: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ClientState {
    pub view: SessionView,
    pub thresholds: HeadThresholds,
    pub display_mode: DisplayMode,
    pub media_enabled: bool,
    pub head_tracking_enabled: bool,
    pub autopause_enabled: bool,
    /// Set while a start request is in flight or accepted; mirrors the start
    /// control being disabled.
    pub start_locked: bool,
    pub policy: ControlPolicy,
    pub last_status_at: Option<DateTime<Utc>>,
}

impl ClientState {
    pub fn new() -> Self {
        // Until the startup config fetches land, the optional subsystems are
        // assumed on, like the page assumed before its config loads resolved.
        Self {
            media_enabled: true,
            head_tracking_enabled: true,
            autopause_enabled: true,
            ..Self::default()
        }
    }
}

/// Render seconds as m:ss for status lines.
pub fn fmt_time(sec: u64) -> String {
    format!("{}:{:02}", sec / 60, sec % 60)
}
