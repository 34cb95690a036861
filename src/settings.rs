use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

/// Client-local knobs. Everything policy-related lives on the controller;
/// this file only says how to reach it and what this machine can present
/// with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub controller_url: String,
    /// Media player command. Empty disables local media presentation.
    pub player_command: String,
    /// Flag that asks the player for fullscreen presentation. Empty means the
    /// player has no fullscreen support.
    pub player_fullscreen_arg: String,
    /// Text-to-speech command. Empty disables the voice channel regardless of
    /// the controller's voice policy.
    pub speech_command: String,
    pub screen_width: u32,
    pub screen_height: u32,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            controller_url: "http://127.0.0.1:5000".to_string(),
            player_command: "mpv".to_string(),
            player_fullscreen_arg: "--fs".to_string(),
            speech_command: "espeak".to_string(),
            screen_width: 1920,
            screen_height: 1080,
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<ClientSettings>,
}

impl SettingsStore {
    /// Loads settings, writing a default file on first run so the knobs are
    /// discoverable.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            let defaults = ClientSettings::default();
            let serialized = serde_json::to_string_pretty(&defaults)?;
            fs::write(&path, serialized)
                .with_context(|| format!("Failed to write settings to {}", path.display()))?;
            defaults
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn get(&self) -> ClientSettings {
        self.data.read().unwrap().clone()
    }

    #[allow(dead_code)]
    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)?;
        let data: ClientSettings = serde_json::from_str(&contents)?;
        let mut guard = self.data.write().unwrap();
        *guard = data;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_settings_file_fills_in_defaults() {
        let settings: ClientSettings =
            serde_json::from_str(r#"{"controller_url": "http://nexus.local:5000"}"#).unwrap();
        assert_eq!(settings.controller_url, "http://nexus.local:5000");
        assert_eq!(settings.player_command, "mpv");
        assert_eq!(settings.screen_width, 1920);
    }
}
