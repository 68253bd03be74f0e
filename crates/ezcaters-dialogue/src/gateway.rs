//! Presentation boundary. The controller reports every state change through
//! declarative calls and never reads anything back.

use std::sync::{Arc, Mutex, MutexGuard};

use ezcaters_core::types::{Caterer, CaptureFailure, DialogueReply, TranscriptEvent};

pub trait PresentationGateway: Send {
    /// Recording started.
    fn show_listening(&mut self);
    /// A reply is being prepared.
    fn show_processing(&mut self);
    /// Back to the ready state.
    fn show_ready(&mut self);
    /// Voice input cannot be used in this environment.
    fn show_unavailable(&mut self, failure: &CaptureFailure);
    fn show_transcript(&mut self, transcript: &TranscriptEvent);
    fn show_error(&mut self, failure: &CaptureFailure);
    fn show_response(&mut self, reply: &DialogueReply);
    /// Reset transcript and response displays before a new attempt.
    fn clear_displays(&mut self);
    fn clear_text_input(&mut self);
    fn show_searching(&mut self);
    /// An empty slice means nothing matched.
    fn show_search_results(&mut self, results: &[Caterer]);
    fn show_search_error(&mut self, message: &str);
}

/// One recorded gateway call.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    Listening,
    Processing,
    Ready,
    Unavailable(CaptureFailure),
    Transcript(TranscriptEvent),
    Error(CaptureFailure),
    Response(DialogueReply),
    ClearDisplays,
    ClearTextInput,
    Searching,
    SearchResults(Vec<Caterer>),
    SearchError(String),
}

/// Gateway that records calls in memory. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingGateway {
    calls: Arc<Mutex<Vec<GatewayCall>>>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.log().clone()
    }

    /// Drain the log, returning what was recorded so far.
    pub fn take(&self) -> Vec<GatewayCall> {
        std::mem::take(&mut *self.log())
    }

    fn log(&self) -> MutexGuard<'_, Vec<GatewayCall>> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: GatewayCall) {
        self.log().push(call);
    }
}

impl PresentationGateway for RecordingGateway {
    fn show_listening(&mut self) {
        self.record(GatewayCall::Listening);
    }

    fn show_processing(&mut self) {
        self.record(GatewayCall::Processing);
    }

    fn show_ready(&mut self) {
        self.record(GatewayCall::Ready);
    }

    fn show_unavailable(&mut self, failure: &CaptureFailure) {
        self.record(GatewayCall::Unavailable(failure.clone()));
    }

    fn show_transcript(&mut self, transcript: &TranscriptEvent) {
        self.record(GatewayCall::Transcript(transcript.clone()));
    }

    fn show_error(&mut self, failure: &CaptureFailure) {
        self.record(GatewayCall::Error(failure.clone()));
    }

    fn show_response(&mut self, reply: &DialogueReply) {
        self.record(GatewayCall::Response(reply.clone()));
    }

    fn clear_displays(&mut self) {
        self.record(GatewayCall::ClearDisplays);
    }

    fn clear_text_input(&mut self) {
        self.record(GatewayCall::ClearTextInput);
    }

    fn show_searching(&mut self) {
        self.record(GatewayCall::Searching);
    }

    fn show_search_results(&mut self, results: &[Caterer]) {
        self.record(GatewayCall::SearchResults(results.to_vec()));
    }

    fn show_search_error(&mut self, message: &str) {
        self.record(GatewayCall::SearchError(message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_gateway_shares_log() {
        let gateway = RecordingGateway::new();
        let mut handle = gateway.clone();
        handle.show_listening();
        handle.show_search_error("nope");

        assert_eq!(
            gateway.calls(),
            vec![
                GatewayCall::Listening,
                GatewayCall::SearchError("nope".to_string())
            ]
        );
        assert_eq!(gateway.take().len(), 2);
        assert!(gateway.calls().is_empty());
    }
}
