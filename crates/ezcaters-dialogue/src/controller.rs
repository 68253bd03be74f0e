//! Dialogue controller: the single coordinator between user actions, the
//! capture session, the responder and the presentation gateway.
//!
//! All operations take `&mut self`, so at most one of them runs at a time and
//! at most one capture attempt is active per session.

use std::sync::Arc;

use ezcaters_core::config::SpeechConfig;
use ezcaters_core::error::AgentError;
use ezcaters_core::types::{
    CaptureFailure, Caterer, DialogueReply, SearchType, SessionId, SessionState, TranscriptEvent,
};
use ezcaters_voice::{CaptureEvent, CaptureSession, CaptureUpdate, StateMachine};

use crate::backend::ConversationEventType;
use crate::gateway::PresentationGateway;
use crate::responder::FallbackResponder;
use crate::search::{self, CatererSearch, EMPTY_QUERY_MESSAGE, SEARCH_FAILED_MESSAGE};
use crate::speech::{SpeechSynthesizer, Utterance};

/// One page-load worth of conversation.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    machine: StateMachine,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: SessionId::generate(),
            machine: StateMachine::new(),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.machine.current()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

pub struct DialogueController {
    session: Session,
    /// `None` when the speech capability probe failed.
    capture: Option<CaptureSession>,
    responder: FallbackResponder,
    gateway: Box<dyn PresentationGateway>,
    search: Option<Arc<dyn CatererSearch>>,
    speaker: Option<Box<dyn SpeechSynthesizer>>,
    speech: SpeechConfig,
}

impl DialogueController {
    /// Build a controller for a fresh session.
    ///
    /// Without a capture session voice mode is permanently unavailable and
    /// the gateway is told so immediately.
    pub fn new(
        capture: Option<CaptureSession>,
        responder: FallbackResponder,
        mut gateway: Box<dyn PresentationGateway>,
    ) -> Self {
        let session = Session::new();
        tracing::info!(
            session_id = %session.id(),
            voice = capture.is_some(),
            "Dialogue session created"
        );
        if capture.is_none() {
            gateway.show_unavailable(&CaptureFailure::unavailable());
        }
        Self {
            session,
            capture,
            responder,
            gateway,
            search: None,
            speaker: None,
            speech: SpeechConfig::default(),
        }
    }

    pub fn with_search(mut self, search: Arc<dyn CatererSearch>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn with_speaker(mut self, speaker: Box<dyn SpeechSynthesizer>, config: SpeechConfig) -> Self {
        self.speaker = Some(speaker);
        self.speech = config;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn capture(&self) -> Option<&CaptureSession> {
        self.capture.as_ref()
    }

    pub fn voice_available(&self) -> bool {
        self.capture.as_ref().is_some_and(CaptureSession::is_available)
    }

    /// Whether a capture attempt is Listening or Processing.
    pub fn is_active(&self) -> bool {
        self.capture.as_ref().is_some_and(CaptureSession::is_active)
    }

    /// Stop if a capture is active, otherwise start one.
    pub fn toggle(&mut self) {
        if !self.voice_available() {
            tracing::info!("Voice toggle ignored: speech recognition unavailable");
            self.gateway.show_unavailable(&CaptureFailure::unavailable());
            return;
        }
        if self.is_active() {
            self.stop();
        } else {
            self.start();
        }
    }

    /// Begin a capture attempt. Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        let Some(capture) = self.capture.as_mut() else {
            self.gateway.show_unavailable(&CaptureFailure::unavailable());
            return;
        };
        match capture.start() {
            Ok(CaptureUpdate::Started { attempt }) => {
                tracing::debug!(session_id = %self.session.id, attempt, "Recording started");
                self.session.machine.advance(SessionState::Listening);
                self.gateway.show_listening();
                self.gateway.clear_displays();
            }
            Ok(update) => {
                tracing::debug!(?update, "Unexpected update from capture start");
            }
            Err(AgentError::CaptureUnavailable) => {
                self.gateway.show_unavailable(&CaptureFailure::unavailable());
            }
            Err(e) => {
                tracing::error!(session_id = %self.session.id, error = %e, "Could not start capture");
                self.gateway.show_error(&CaptureFailure::start_failed());
            }
        }
    }

    /// Request the active capture to stop. A no-op unless Listening.
    pub fn stop(&mut self) {
        let stopped = self.capture.as_mut().is_some_and(CaptureSession::stop);
        if stopped {
            self.session.machine.advance(SessionState::Idle);
            self.gateway.show_ready();
        }
    }

    /// Route one engine or timer callback. Returns the reply if the event
    /// completed an utterance.
    pub async fn handle_event(&mut self, event: CaptureEvent) -> Option<DialogueReply> {
        let update = self.capture.as_mut()?.handle(event)?;
        self.apply(update).await
    }

    async fn apply(&mut self, update: CaptureUpdate) -> Option<DialogueReply> {
        match update {
            CaptureUpdate::Started { .. } => {
                self.session.machine.advance(SessionState::Listening);
                self.gateway.show_listening();
                None
            }
            CaptureUpdate::Transcript(transcript) => {
                self.gateway.show_transcript(&transcript);
                None
            }
            CaptureUpdate::Failed(failure) => {
                self.session.machine.advance(SessionState::Error);
                self.gateway.show_error(&failure);
                if let Some(capture) = self.capture.as_mut() {
                    capture.reset();
                }
                self.session.machine.reset();
                self.gateway.show_ready();
                None
            }
            CaptureUpdate::Ended { transcript: None } => {
                self.session.machine.advance(SessionState::Ended);
                self.session.machine.advance(SessionState::Idle);
                self.gateway.show_ready();
                None
            }
            CaptureUpdate::Ended {
                transcript: Some(transcript),
            } => {
                self.session.machine.advance(SessionState::Ended);
                self.session.machine.advance(SessionState::Processing);
                let reply = self.reply_to(&transcript).await;
                if let Some(capture) = self.capture.as_mut() {
                    capture.finish_processing();
                }
                self.session.machine.advance(SessionState::Idle);
                self.gateway.show_ready();
                Some(reply)
            }
        }
    }

    /// Treat typed text as a final transcript. Blank input is ignored.
    pub async fn submit_text(&mut self, text: &str) -> Option<DialogueReply> {
        let transcript = text.trim();
        if transcript.is_empty() {
            tracing::debug!("Ignoring blank text submission");
            return None;
        }

        self.gateway.show_transcript(&TranscriptEvent {
            final_text: transcript.to_string(),
            interim_text: String::new(),
        });
        self.gateway.clear_text_input();

        // Typed text may arrive while a capture is live; only an idle
        // session is moved through Processing.
        let tracked = self.session.machine.advance(SessionState::Processing);
        let reply = self.reply_to(transcript).await;
        if tracked {
            self.session.machine.advance(SessionState::Idle);
            self.gateway.show_ready();
        }
        Some(reply)
    }

    async fn reply_to(&mut self, transcript: &str) -> DialogueReply {
        self.gateway.show_processing();
        let reply = self.responder.respond(&self.session.id, transcript).await;
        tracing::info!(
            session_id = %self.session.id,
            source = %reply.source,
            "Reply produced"
        );
        self.gateway.show_response(&reply);
        self.speak(&reply);
        reply
    }

    fn speak(&mut self, reply: &DialogueReply) {
        if !self.speech.enabled {
            return;
        }
        if let Some(speaker) = self.speaker.as_mut() {
            if let Err(e) = speaker.speak(&Utterance::new(reply.text.as_str(), &self.speech)) {
                tracing::debug!(error = %e, "Speech synthesis failed");
            }
        }
    }

    /// Run a caterer search and render the outcome.
    pub async fn search(&mut self, kind: SearchType, query: &str) -> Option<Vec<Caterer>> {
        let request = match search::build_request(kind, query) {
            Ok(request) => request,
            Err(_) => {
                self.gateway.show_search_error(EMPTY_QUERY_MESSAGE);
                return None;
            }
        };
        let Some(search) = self.search.clone() else {
            tracing::warn!("Caterer search requested but no search backend is configured");
            self.gateway.show_search_error(SEARCH_FAILED_MESSAGE);
            return None;
        };

        self.gateway.show_searching();
        match search.search(&request).await {
            Ok(results) => {
                tracing::info!(kind = %request.kind, count = results.len(), "Caterer search completed");
                self.gateway.show_search_results(&results);
                Some(results)
            }
            Err(e) => {
                tracing::warn!(kind = %request.kind, error = %e, "Caterer search failed");
                self.gateway.show_search_error(SEARCH_FAILED_MESSAGE);
                None
            }
        }
    }

    /// Abort any live capture and tell the backend the call is over.
    pub async fn shutdown(&mut self) {
        if let Some(capture) = self.capture.as_mut() {
            capture.abort();
        }
        self.session.machine.reset();
        if let Err(e) = self
            .responder
            .notify(&self.session.id, ConversationEventType::CallEnded)
            .await
        {
            tracing::debug!(error = %e, "Could not notify backend of call end");
        }
        tracing::info!(session_id = %self.session.id, "Dialogue session closed");
    }
}
