//! Wire contract with the Nexus session controller.
//!
//! All endpoints speak JSON over HTTP. Application-level rejection is an
//! `error` field in an otherwise well-formed body (the controller pairs it
//! with a non-2xx status, so bodies are parsed regardless of status code).

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct StartSessionRequest {
    pub pre_wait_sec: u64,
    pub decision_hold_sec: u64,
    pub punishment_delay_sec: u64,
    pub main_min_sec: u64,
    pub main_max_sec: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AckResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HeadThresholdUpdate {
    #[serde(default)]
    pub down_deg: Option<f64>,
    #[serde(default)]
    pub away_deg: Option<f64>,
    #[serde(default)]
    pub still_sec: Option<u64>,
    #[serde(default)]
    pub debounce_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionStatus {
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub phase: Option<String>,
    #[serde(default)]
    pub remaining_sec: i64,
    #[serde(default)]
    pub head_violation_count: u32,
    #[serde(default)]
    pub mistress_message: Option<String>,
    #[serde(default)]
    pub head_thresholds: Option<HeadThresholdUpdate>,
    #[serde(default)]
    pub coyote_pulse_pending: bool,
    #[serde(default)]
    pub video_display_mode: Option<String>,
    #[serde(default)]
    pub video_should_start: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoConfig {
    #[serde(default)]
    pub video_enabled: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HeadConfig {
    #[serde(default)]
    pub head_tracking_enabled: bool,
    #[serde(default)]
    pub video_autopause_enabled: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeneralConfig {
    #[serde(default)]
    pub strict_mode: bool,
    #[serde(default)]
    pub hardcore_mode: bool,
    #[serde(default)]
    pub voice_enabled: bool,
    #[serde(default)]
    pub voice_persona: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoSelection {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViolationActions {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub switch_video: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HeadViolationResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub actions: Option<ViolationActions>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EvasionResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub extra_min: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

/// The controller seam. The HTTP implementation below is the production one;
/// tests script this trait directly.
#[async_trait]
pub trait ControllerApi: Send + Sync {
    async fn start_session(&self, req: &StartSessionRequest) -> Result<AckResponse>;
    async fn abort_session(&self) -> Result<AckResponse>;
    async fn session_status(&self) -> Result<SessionStatus>;
    async fn video_config(&self) -> Result<VideoConfig>;
    async fn head_config(&self) -> Result<HeadConfig>;
    async fn general_config(&self) -> Result<GeneralConfig>;
    async fn select_video(&self) -> Result<VideoSelection>;
    async fn report_head_violation(&self) -> Result<HeadViolationResponse>;
    async fn report_video_violation(&self) -> Result<EvasionResponse>;
}

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HttpController {
    base: String,
    http: reqwest::Client,
}

impl HttpController {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            base: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let res = self
            .http
            .get(self.url(path))
            .send()
            .await
            .with_context(|| format!("GET {path} failed"))?;
        res.json::<T>()
            .await
            .with_context(|| format!("GET {path}: malformed response"))
    }

    async fn post_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let res = self
            .http
            .post(self.url(path))
            .send()
            .await
            .with_context(|| format!("POST {path} failed"))?;
        res.json::<T>()
            .await
            .with_context(|| format!("POST {path}: malformed response"))
    }
}

#[async_trait]
impl ControllerApi for HttpController {
    async fn start_session(&self, req: &StartSessionRequest) -> Result<AckResponse> {
        let res = self
            .http
            .post(self.url("/start_session"))
            .json(req)
            .send()
            .await
            .context("POST /start_session failed")?;
        res.json::<AckResponse>()
            .await
            .context("POST /start_session: malformed response")
    }

    async fn abort_session(&self) -> Result<AckResponse> {
        self.post_json("/abort_session").await
    }

    async fn session_status(&self) -> Result<SessionStatus> {
        self.get_json("/session_status").await
    }

    async fn video_config(&self) -> Result<VideoConfig> {
        self.get_json("/video_config").await
    }

    async fn head_config(&self) -> Result<HeadConfig> {
        self.get_json("/head_config").await
    }

    async fn general_config(&self) -> Result<GeneralConfig> {
        self.get_json("/config").await
    }

    async fn select_video(&self) -> Result<VideoSelection> {
        self.get_json("/video_random").await
    }

    async fn report_head_violation(&self) -> Result<HeadViolationResponse> {
        self.post_json("/head_violation").await
    }

    async fn report_video_violation(&self) -> Result<EvasionResponse> {
        self.post_json("/video_violation").await
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_status_tolerates_minimal_payloads() {
        let status: SessionStatus = serde_json::from_str(r#"{"active": false}"#).unwrap();
        assert!(!status.active);
        assert_eq!(status.remaining_sec, 0);
        assert!(status.phase.is_none());
        assert!(status.head_thresholds.is_none());
        assert!(!status.video_should_start);
    }

    #[test]
    fn session_status_parses_full_payload() {
        let raw = r#"{
            "active": true,
            "phase": "main",
            "remaining_sec": 754,
            "head_violation_count": 2,
            "mistress_message": "Eyes forward.",
            "head_thresholds": {"down_deg": 28, "away_deg": 40, "still_sec": 9, "debounce_ms": 4250},
            "coyote_pulse_pending": true,
            "video_display_mode": "popup",
            "video_should_start": true
        }"#;
        let status: SessionStatus = serde_json::from_str(raw).unwrap();

        assert!(status.active);
        assert_eq!(status.phase.as_deref(), Some("main"));
        assert_eq!(status.remaining_sec, 754);
        assert_eq!(status.head_violation_count, 2);
        let thresholds = status.head_thresholds.unwrap();
        assert_eq!(thresholds.down_deg, Some(28.0));
        assert_eq!(thresholds.still_sec, Some(9));
        assert!(status.video_should_start);
    }

    #[test]
    fn head_violation_response_parses_actions() {
        let raw = r#"{"ok": true, "actions": {"message": "Focus.", "switch_video": true, "add_time_min": 10}}"#;
        let res: HeadViolationResponse = serde_json::from_str(raw).unwrap();
        let actions = res.actions.unwrap();
        assert_eq!(actions.message.as_deref(), Some("Focus."));
        assert!(actions.switch_video);
    }

    #[test]
    fn application_error_is_carried_not_fatal() {
        let res: VideoSelection =
            serde_json::from_str(r#"{"error": "No videos configured"}"#).unwrap();
        assert!(res.url.is_none());
        assert_eq!(res.error.as_deref(), Some("No videos configured"));
    }
}
