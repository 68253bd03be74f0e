//! Spoken replies through an external text-to-speech command.

use std::process::{Command, Stdio};

use ezcaters_core::error::{AgentError, Result};
use ezcaters_dialogue::{SpeechSynthesizer, Utterance};

/// espeak's default speaking rate in words per minute.
const BASE_WORDS_PER_MINUTE: f32 = 175.0;
/// espeak's default pitch on its 0-99 scale.
const BASE_PITCH: f32 = 50.0;

/// Runs `espeak` without waiting for it to finish.
#[derive(Debug, Clone)]
pub struct CommandSynthesizer {
    program: String,
}

impl CommandSynthesizer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Command-line arguments for `utterance`.
    pub fn args(utterance: &Utterance) -> Vec<String> {
        let speed = (BASE_WORDS_PER_MINUTE * utterance.rate).round().max(80.0);
        let pitch = (BASE_PITCH * utterance.pitch).round().clamp(0.0, 99.0);
        vec![
            "-s".to_string(),
            format!("{speed}"),
            "-p".to_string(),
            format!("{pitch}"),
            utterance.text.clone(),
        ]
    }
}

impl Default for CommandSynthesizer {
    fn default() -> Self {
        Self::new("espeak")
    }
}

impl SpeechSynthesizer for CommandSynthesizer {
    fn speak(&mut self, utterance: &Utterance) -> Result<()> {
        Command::new(&self.program)
            .args(Self::args(utterance))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(AgentError::Io)?;
        tracing::debug!(program = %self.program, chars = utterance.text.len(), "Speaking reply");
        Ok(())
    }
}
