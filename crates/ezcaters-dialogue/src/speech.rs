//! Best-effort text-to-speech for replies.

use ezcaters_core::config::SpeechConfig;
use ezcaters_core::error::Result;

/// Text plus voice parameters handed to a synthesizer.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub rate: f32,
    pub pitch: f32,
}

impl Utterance {
    pub fn new(text: impl Into<String>, config: &SpeechConfig) -> Self {
        Self {
            text: text.into(),
            rate: config.rate,
            pitch: config.pitch,
        }
    }
}

/// Callers ignore errors; a failed utterance never affects the dialogue.
pub trait SpeechSynthesizer: Send {
    fn speak(&mut self, utterance: &Utterance) -> Result<()>;
}
