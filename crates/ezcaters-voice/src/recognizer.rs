//! Speech engine abstraction and the event channel it reports through.
//!
//! A real engine (browser speech API bridge, cloud recogniser, ...) implements
//! [`SpeechRecognizer`] and pushes [`CaptureEvent`]s into the [`EventSink`] it
//! was given. The capture session's deadline timer uses the same sink, so the
//! owner of the [`EventStream`] sees one ordered stream of callbacks.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use ezcaters_core::config::CaptureConfig;
use ezcaters_core::error::AgentError;

/// One recognised segment in a result tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionChunk {
    pub transcript: String,
    pub is_final: bool,
}

impl RecognitionChunk {
    pub fn interim(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: false,
        }
    }

    pub fn final_text(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: true,
        }
    }
}

/// Callbacks delivered to a capture session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// The engine began capturing audio.
    Started,
    /// A result tick. `results` holds every segment recognised so far;
    /// only entries at or after `result_index` changed in this tick.
    Result {
        result_index: usize,
        results: Vec<RecognitionChunk>,
    },
    /// The engine failed with a native error code.
    Error { code: String },
    /// The engine stopped capturing.
    Ended,
    /// The hard deadline of the given attempt expired.
    DeadlineElapsed { attempt: u64 },
}

pub type EventSink = mpsc::UnboundedSender<CaptureEvent>;
pub type EventStream = mpsc::UnboundedReceiver<CaptureEvent>;

pub fn event_channel() -> (EventSink, EventStream) {
    mpsc::unbounded_channel()
}

/// Engine settings derived from the `[capture]` config section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognizerSettings {
    pub language: String,
    pub continuous: bool,
    pub interim_results: bool,
    pub max_alternatives: u32,
}

impl Default for RecognizerSettings {
    fn default() -> Self {
        Self::from(&CaptureConfig::default())
    }
}

impl From<&CaptureConfig> for RecognizerSettings {
    fn from(config: &CaptureConfig) -> Self {
        Self {
            language: config.language.clone(),
            continuous: config.continuous,
            interim_results: config.interim_results,
            max_alternatives: config.max_alternatives,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecognizerError {
    /// The engine cannot be used in this environment at all.
    #[error("speech recognition engine unavailable")]
    Unavailable,
    #[error("speech recognition engine already started")]
    AlreadyStarted,
    #[error("speech recognition engine error: {0}")]
    Engine(String),
}

impl From<RecognizerError> for AgentError {
    fn from(err: RecognizerError) -> Self {
        match err {
            RecognizerError::Unavailable => AgentError::CaptureUnavailable,
            other => AgentError::CaptureStart(other.to_string()),
        }
    }
}

/// Speech-to-text engine driven by a capture session.
///
/// `stop` asks the engine to finish and deliver its pending results followed
/// by `CaptureEvent::Ended`; `abort` discards them. Neither is guaranteed to
/// take effect synchronously.
pub trait SpeechRecognizer: Send {
    fn configure(&mut self, settings: &RecognizerSettings);

    fn start(&mut self) -> Result<(), RecognizerError>;

    fn stop(&mut self);

    fn abort(&mut self);
}

// =============================================================================
// Scripted engine
// =============================================================================

/// Call counters shared between a [`ScriptedRecognizer`] and its observer.
#[derive(Debug, Default)]
pub struct RecognizerStats {
    starts: AtomicUsize,
    stops: AtomicUsize,
    aborts: AtomicUsize,
}

impl RecognizerStats {
    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn aborts(&self) -> usize {
        self.aborts.load(Ordering::SeqCst)
    }
}

/// Engine that replays a fixed script: each `start` emits the next queued
/// batch of events. With an exhausted script the engine stays silent, which
/// is how a hung engine looks to the session.
pub struct ScriptedRecognizer {
    sink: EventSink,
    script: VecDeque<Vec<CaptureEvent>>,
    settings: Option<RecognizerSettings>,
    start_error: Option<RecognizerError>,
    end_on_stop: bool,
    stats: Arc<RecognizerStats>,
}

impl ScriptedRecognizer {
    pub fn new(sink: EventSink) -> Self {
        Self {
            sink,
            script: VecDeque::new(),
            settings: None,
            start_error: None,
            end_on_stop: true,
            stats: Arc::new(RecognizerStats::default()),
        }
    }

    /// Queue the events emitted by the next `start`.
    pub fn push_attempt(mut self, events: Vec<CaptureEvent>) -> Self {
        self.script.push_back(events);
        self
    }

    /// Queue one attempt that recognises `text` and ends gracefully.
    pub fn push_utterance(self, text: &str) -> Self {
        self.push_attempt(Self::utterance(text))
    }

    /// Make every `start` fail with `err`.
    pub fn fail_start(mut self, err: RecognizerError) -> Self {
        self.start_error = Some(err);
        self
    }

    /// Whether `stop`/`abort` emit `Ended` like a browser engine does.
    pub fn end_on_stop(mut self, enabled: bool) -> Self {
        self.end_on_stop = enabled;
        self
    }

    pub fn stats(&self) -> Arc<RecognizerStats> {
        Arc::clone(&self.stats)
    }

    pub fn settings(&self) -> Option<&RecognizerSettings> {
        self.settings.as_ref()
    }

    /// Events for a single recognised utterance.
    pub fn utterance(text: &str) -> Vec<CaptureEvent> {
        vec![
            CaptureEvent::Started,
            CaptureEvent::Result {
                result_index: 0,
                results: vec![RecognitionChunk::final_text(text)],
            },
            CaptureEvent::Ended,
        ]
    }

    fn emit(&self, event: CaptureEvent) {
        if self.sink.send(event).is_err() {
            tracing::debug!("Capture event stream closed; dropping scripted event");
        }
    }
}

impl SpeechRecognizer for ScriptedRecognizer {
    fn configure(&mut self, settings: &RecognizerSettings) {
        self.settings = Some(settings.clone());
    }

    fn start(&mut self) -> Result<(), RecognizerError> {
        self.stats.starts.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.start_error {
            return Err(err.clone());
        }
        if let Some(events) = self.script.pop_front() {
            for event in events {
                self.emit(event);
            }
        }
        Ok(())
    }

    fn stop(&mut self) {
        self.stats.stops.fetch_add(1, Ordering::SeqCst);
        if self.end_on_stop {
            self.emit(CaptureEvent::Ended);
        }
    }

    fn abort(&mut self) {
        self.stats.aborts.fetch_add(1, Ordering::SeqCst);
        if self.end_on_stop {
            self.emit(CaptureEvent::Ended);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
