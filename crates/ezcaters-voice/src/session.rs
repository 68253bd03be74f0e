//! Capture session wrapping the speech engine for one attempt at a time.
//!
//! The session owns the engine, the attempt's transcript buffers and the hard
//! deadline timer. Every handler tolerates being called from an unexpected
//! state (late callbacks, stale timers, double stops) and becomes a no-op.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;

use ezcaters_core::config::CaptureConfig;
use ezcaters_core::error::AgentError;
use ezcaters_core::types::{CaptureErrorKind, CaptureFailure, SessionState, TranscriptEvent};

use crate::recognizer::{
    CaptureEvent, EventSink, RecognitionChunk, RecognizerError, RecognizerSettings,
    SpeechRecognizer,
};
use crate::state::StateMachine;

/// What the owner of a session should surface after a call or callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureUpdate {
    /// Recording started; the deadline is armed.
    Started { attempt: u64 },
    /// The running transcript changed.
    Transcript(TranscriptEvent),
    /// The attempt failed. The session is in `Error` until `reset`.
    Failed(CaptureFailure),
    /// The engine ended gracefully. A transcript leaves the session in
    /// `Processing` until `finish_processing`.
    Ended { transcript: Option<String> },
}

#[derive(Debug)]
struct CaptureAttempt {
    number: u64,
    started_at: DateTime<Utc>,
    /// Final segments keyed by result index.
    finals: BTreeMap<usize, String>,
    interim: String,
}

impl CaptureAttempt {
    fn new(number: u64) -> Self {
        Self {
            number,
            started_at: Utc::now(),
            finals: BTreeMap::new(),
            interim: String::new(),
        }
    }

    fn final_text(&self) -> String {
        self.finals.values().map(String::as_str).collect()
    }

    fn transcript(&self) -> TranscriptEvent {
        TranscriptEvent {
            final_text: self.final_text(),
            interim_text: self.interim.clone(),
        }
    }

    fn elapsed_secs(&self) -> f32 {
        let elapsed = Utc::now() - self.started_at;
        elapsed.num_milliseconds() as f32 / 1000.0
    }
}

struct Deadline {
    attempt: u64,
    handle: JoinHandle<()>,
}

/// A speech capture session over a single engine.
pub struct CaptureSession {
    recognizer: Box<dyn SpeechRecognizer>,
    sink: EventSink,
    deadline: Duration,
    machine: StateMachine,
    attempt: Option<CaptureAttempt>,
    attempts: u64,
    timer: Option<Deadline>,
    /// A stop was requested and the engine's end callback has not arrived yet.
    awaiting_end: bool,
    disabled: bool,
    last_error: Option<CaptureErrorKind>,
}

impl std::fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("state", &self.machine.current())
            .field("attempt", &self.attempt)
            .field("attempts", &self.attempts)
            .field("deadline", &self.deadline)
            .field("awaiting_end", &self.awaiting_end)
            .field("disabled", &self.disabled)
            .field("last_error", &self.last_error)
            .finish()
    }
}

impl CaptureSession {
    /// Create a session over `recognizer`, configuring it from `config`.
    ///
    /// `sink` must feed the same stream the engine reports into; the deadline
    /// timer posts `CaptureEvent::DeadlineElapsed` there.
    pub fn new(
        mut recognizer: Box<dyn SpeechRecognizer>,
        sink: EventSink,
        config: &CaptureConfig,
    ) -> Self {
        recognizer.configure(&RecognizerSettings::from(config));
        Self {
            recognizer,
            sink,
            deadline: config.deadline(),
            machine: StateMachine::new(),
            attempt: None,
            attempts: 0,
            timer: None,
            awaiting_end: false,
            disabled: false,
            last_error: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.machine.current()
    }

    /// Listening or Processing.
    pub fn is_active(&self) -> bool {
        self.machine.is_active()
    }

    /// False once the engine has reported itself unavailable.
    pub fn is_available(&self) -> bool {
        !self.disabled
    }

    pub fn last_error(&self) -> Option<CaptureErrorKind> {
        self.last_error
    }

    /// Number of attempts started so far.
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    pub fn transcript(&self) -> Option<TranscriptEvent> {
        self.attempt.as_ref().map(CaptureAttempt::transcript)
    }

    /// Start a new capture attempt and arm the deadline.
    ///
    /// Must be called from within a tokio runtime. Fails without touching the
    /// engine unless the session is Idle. An engine reporting itself
    /// unavailable disables every later start.
    pub fn start(&mut self) -> Result<CaptureUpdate, AgentError> {
        if self.disabled {
            return Err(AgentError::CaptureUnavailable);
        }
        // The engine has not confirmed the previous stop yet; its end callback
        // still belongs to that attempt.
        if self.awaiting_end {
            tracing::warn!(
                attempt = self.attempts,
                "Start rejected while the previous capture is still stopping"
            );
            return Err(RecognizerError::AlreadyStarted.into());
        }
        let current = self.machine.current();
        if current != SessionState::Idle {
            return Err(AgentError::InvalidTransition {
                from: current,
                to: SessionState::Listening,
            });
        }

        if let Err(e) = self.recognizer.start() {
            if e == RecognizerError::Unavailable {
                tracing::warn!("Speech engine unavailable; disabling voice capture");
                self.disabled = true;
            } else {
                tracing::error!(error = %e, "Error starting speech recognition");
            }
            return Err(e.into());
        }

        self.machine.transition(SessionState::Listening)?;
        self.attempts += 1;
        let attempt = self.attempts;
        self.attempt = Some(CaptureAttempt::new(attempt));
        self.awaiting_end = false;
        self.last_error = None;
        self.arm_deadline(attempt);

        tracing::info!(
            attempt,
            deadline_secs = self.deadline.as_secs(),
            "Speech capture started"
        );
        Ok(CaptureUpdate::Started { attempt })
    }

    /// Ask the engine to stop. Only legal while Listening.
    ///
    /// The session goes Idle immediately; a later end callback still delivers
    /// whatever final text was recognised. New starts are refused until that
    /// callback arrives or the deadline releases the engine. Returns whether a
    /// stop was issued.
    pub fn stop(&mut self) -> bool {
        let current = self.machine.current();
        if current != SessionState::Listening {
            tracing::debug!(state = %current, "Stop ignored outside Listening");
            return false;
        }
        self.arm_deadline(self.attempts);
        self.recognizer.stop();
        self.awaiting_end = true;
        self.machine.advance(SessionState::Idle);
        tracing::info!(attempt = self.attempts, "Speech capture stop requested");
        true
    }

    /// Discard the current attempt without waiting for results.
    pub fn abort(&mut self) {
        if !self.machine.is_active() && !self.awaiting_end {
            return;
        }
        self.clear_deadline();
        if self.machine.current() == SessionState::Listening || self.awaiting_end {
            self.recognizer.abort();
        }
        self.attempt = None;
        self.awaiting_end = false;
        self.machine.reset();
        tracing::info!(attempt = self.attempts, "Speech capture aborted");
    }

    /// Leave `Processing` once the reply for the last transcript is delivered.
    pub fn finish_processing(&mut self) {
        if self.machine.current() == SessionState::Processing {
            self.machine.advance(SessionState::Idle);
        }
    }

    /// Return to Idle from any state, dropping the current attempt.
    pub fn reset(&mut self) {
        self.clear_deadline();
        self.attempt = None;
        self.awaiting_end = false;
        self.machine.reset();
    }

    /// Feed one engine or timer callback through the state machine.
    ///
    /// Returns `None` when the event is stale or out of order.
    pub fn handle(&mut self, event: CaptureEvent) -> Option<CaptureUpdate> {
        match event {
            CaptureEvent::Started => {
                tracing::debug!(attempt = self.attempts, "Speech engine reported start");
                None
            }
            CaptureEvent::Result {
                result_index,
                results,
            } => self.on_result(result_index, &results),
            CaptureEvent::Error { code } => self.on_error(&code),
            CaptureEvent::Ended => self.on_end(),
            CaptureEvent::DeadlineElapsed { attempt } => self.on_deadline(attempt),
        }
    }

    fn accepting_results(&self) -> bool {
        self.machine.current() == SessionState::Listening
            || (self.machine.current() == SessionState::Idle && self.awaiting_end)
    }

    fn on_result(
        &mut self,
        result_index: usize,
        results: &[RecognitionChunk],
    ) -> Option<CaptureUpdate> {
        if !self.accepting_results() {
            tracing::debug!(state = %self.machine.current(), "Ignoring late speech result");
            return None;
        }
        if self.machine.current() == SessionState::Listening {
            self.clear_deadline();
        }

        let attempt = self.attempt.as_mut()?;
        let mut interim = String::new();
        for (index, chunk) in results.iter().enumerate().skip(result_index) {
            if chunk.is_final {
                attempt.finals.insert(index, chunk.transcript.clone());
            } else {
                interim.push_str(&chunk.transcript);
            }
        }
        attempt.interim = interim;

        let transcript = attempt.transcript();
        tracing::debug!(
            attempt = attempt.number,
            final_len = transcript.final_text.len(),
            interim_len = transcript.interim_text.len(),
            "Speech result"
        );
        Some(CaptureUpdate::Transcript(transcript))
    }

    fn on_error(&mut self, code: &str) -> Option<CaptureUpdate> {
        if !self.accepting_results() {
            tracing::debug!(code, state = %self.machine.current(), "Ignoring late speech error");
            return None;
        }
        self.clear_deadline();
        self.attempt = None;
        self.awaiting_end = false;
        self.machine.advance(SessionState::Error);

        let failure = CaptureFailure::from_native(code);
        self.last_error = Some(failure.kind);
        tracing::warn!(code, kind = %failure.kind, "Speech recognition error");
        Some(CaptureUpdate::Failed(failure))
    }

    fn on_end(&mut self) -> Option<CaptureUpdate> {
        match self.machine.current() {
            SessionState::Listening => {}
            SessionState::Idle if self.awaiting_end => {}
            SessionState::Error => {
                tracing::debug!("End after error; resetting capture session");
                self.reset();
                return None;
            }
            state => {
                tracing::debug!(state = %state, "Ignoring late speech end");
                return None;
            }
        }
        self.clear_deadline();
        self.awaiting_end = false;
        self.machine.advance(SessionState::Ended);

        let attempt = self.attempt.take();
        let elapsed = attempt.as_ref().map(CaptureAttempt::elapsed_secs);
        let transcript = attempt
            .map(|a| a.final_text().trim().to_string())
            .filter(|t| !t.is_empty());

        if transcript.is_some() {
            self.machine.advance(SessionState::Processing);
        } else {
            self.machine.advance(SessionState::Idle);
        }
        tracing::info!(
            attempt = self.attempts,
            elapsed_secs = elapsed.unwrap_or_default(),
            has_transcript = transcript.is_some(),
            "Speech capture ended"
        );
        Some(CaptureUpdate::Ended { transcript })
    }

    fn on_deadline(&mut self, attempt: u64) -> Option<CaptureUpdate> {
        let armed = self.timer.as_ref().map(|d| d.attempt);
        if self.awaiting_end && armed == Some(attempt) {
            self.timer = None;
            self.recognizer.abort();
            self.attempt = None;
            self.awaiting_end = false;
            tracing::warn!(attempt, "Speech engine never confirmed stop; aborted");
            return None;
        }
        if self.machine.current() != SessionState::Listening || armed != Some(attempt) {
            tracing::debug!(attempt, "Ignoring stale capture deadline");
            return None;
        }
        self.timer = None;
        self.recognizer.stop();
        self.attempt = None;
        self.awaiting_end = false;
        self.machine.advance(SessionState::Error);
        self.last_error = Some(CaptureErrorKind::Timeout);
        tracing::warn!(
            attempt,
            deadline_secs = self.deadline.as_secs(),
            "Speech recognition timed out"
        );
        Some(CaptureUpdate::Failed(CaptureFailure::timeout()))
    }

    fn arm_deadline(&mut self, attempt: u64) {
        self.clear_deadline();
        let sink = self.sink.clone();
        let deadline = self.deadline;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            let _ = sink.send(CaptureEvent::DeadlineElapsed { attempt });
        });
        self.timer = Some(Deadline { attempt, handle });
    }

    fn clear_deadline(&mut self) {
        if let Some(deadline) = self.timer.take() {
            deadline.handle.abort();
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.clear_deadline();
    }
}

// =============================================================================
// Tests
// =============================================================================
