//! Voice feedback channel: short status lines spoken through an external
//! text-to-speech sink. No queueing; a new line always preempts the one in
//! flight, and identical consecutive lines are spoken once.

use std::process::{Child, Command, Stdio};
use std::sync::Arc;

use log::warn;
use tokio::sync::Mutex;

pub type SharedVoice = Arc<Mutex<VoiceChannel>>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeechParams {
    pub rate: f32,
    pub pitch: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Persona {
    #[default]
    Neutral,
    Firm,
    Playful,
    Strict,
}

impl Persona {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "firm" => Persona::Firm,
            "playful" => Persona::Playful,
            "strict" => Persona::Strict,
            _ => Persona::Neutral,
        }
    }

    /// (rate, pitch) multipliers relative to the synthesizer defaults.
    /// Neutral returns `None` and leaves the synthesizer untouched.
    pub fn speech_params(self) -> Option<SpeechParams> {
        match self {
            Persona::Neutral => None,
            Persona::Firm => Some(SpeechParams {
                rate: 0.95,
                pitch: 0.9,
            }),
            Persona::Playful => Some(SpeechParams {
                rate: 1.05,
                pitch: 1.1,
            }),
            Persona::Strict => Some(SpeechParams {
                rate: 0.9,
                pitch: 0.85,
            }),
        }
    }
}

/// The speech sink seam. Fire-and-forget: callers never learn whether the
/// utterance finished.
pub trait SpeechSynth: Send {
    fn available(&self) -> bool;
    fn cancel(&mut self);
    fn speak(&mut self, text: &str, params: Option<SpeechParams>);
}

// espeak-style defaults: 175 words/minute, pitch midpoint 50 on a 0-99 scale.
const SYNTH_BASE_WPM: f32 = 175.0;
const SYNTH_BASE_PITCH: f32 = 50.0;

/// Shipped sink: spawns a TTS command per utterance and kills the previous
/// child first so only the most recent line is ever audible.
pub struct CommandSynth {
    command: String,
    child: Option<Child>,
}

impl CommandSynth {
    pub fn new(command: String) -> Self {
        Self {
            command,
            child: None,
        }
    }
}

impl SpeechSynth for CommandSynth {
    fn available(&self) -> bool {
        !self.command.is_empty()
    }

    fn cancel(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    fn speak(&mut self, text: &str, params: Option<SpeechParams>) {
        let mut cmd = Command::new(&self.command);
        if let Some(p) = params {
            cmd.arg("-s")
                .arg(((SYNTH_BASE_WPM * p.rate).round() as i64).to_string());
            cmd.arg("-p")
                .arg(((SYNTH_BASE_PITCH * p.pitch).round() as i64).to_string());
        }
        cmd.arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        match cmd.spawn() {
            Ok(child) => self.child = Some(child),
            // Missing TTS binary degrades the voice channel, nothing else.
            Err(err) => warn!("speech command {:?} failed to spawn: {err}", self.command),
        }
    }
}

pub struct VoiceChannel {
    enabled: bool,
    persona: Persona,
    last_spoken: String,
    synth: Box<dyn SpeechSynth>,
}

impl VoiceChannel {
    pub fn new(synth: Box<dyn SpeechSynth>) -> Self {
        Self {
            enabled: false,
            persona: Persona::Neutral,
            last_spoken: String::new(),
            synth,
        }
    }

    /// Applied from the controller's general config at startup.
    pub fn set_policy(&mut self, enabled: bool, persona: Persona) {
        self.enabled = enabled;
        self.persona = persona;
    }

    pub fn speak(&mut self, text: &str) {
        if !self.enabled {
            return;
        }
        if !self.synth.available() {
            return;
        }
        if text.is_empty() {
            return;
        }
        if text == self.last_spoken {
            return;
        }

        self.last_spoken = text.to_string();

        let params = self.persona.speech_params();
        self.synth.cancel();
        self.synth.speak(text, params);
    }
}
