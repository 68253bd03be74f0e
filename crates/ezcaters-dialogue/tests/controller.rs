//! Integration tests for the dialogue controller.
//!
//! Each test drives a controller over a scripted speech engine, an in-memory
//! conversation backend and a recording gateway, pumping capture events by
//! hand the way the application's event loop does.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use ezcaters_core::config::{CaptureConfig, SpeechConfig};
use ezcaters_core::error::{AgentError, Result};
use ezcaters_core::types::{
    CaptureErrorKind, CaptureFailure, Caterer, DialogueReply, ReplySource, SearchRequest,
    SearchType, SessionState, TranscriptEvent,
};
use ezcaters_dialogue::search::{EMPTY_QUERY_MESSAGE, SEARCH_FAILED_MESSAGE};
use ezcaters_dialogue::{
    CatererSearch, ConversationBackend, ConversationEventType, ConversationRequest,
    ConversationResponse, DialogueController, FallbackResponder, FallbackRule, GatewayCall,
    RecordingGateway, SpeechSynthesizer, Utterance, DEFAULT_REMOTE_PROMPT,
};
use ezcaters_voice::{
    event_channel, CaptureEvent, CaptureSession, EventStream, RecognitionChunk, RecognizerError,
    RecognizerStats, ScriptedRecognizer,
};

// =============================================================================
// Helpers
// =============================================================================

/// Backend with a fixed outcome that records every request.
struct StubBackend {
    outcome: std::result::Result<Option<String>, String>,
    requests: Mutex<Vec<ConversationRequest>>,
}

impl StubBackend {
    fn replying(text: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            outcome: Ok(text.map(str::to_string)),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn offline() -> Arc<Self> {
        Arc::new(Self {
            outcome: Err("connection refused".to_string()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<ConversationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConversationBackend for StubBackend {
    async fn converse(&self, request: &ConversationRequest) -> Result<ConversationResponse> {
        self.requests.lock().unwrap().push(request.clone());
        match &self.outcome {
            Ok(text) => Ok(ConversationResponse {
                response: text.clone(),
                ..ConversationResponse::default()
            }),
            Err(e) => Err(AgentError::RemoteCall(e.clone())),
        }
    }
}

struct StubSearch {
    outcome: std::result::Result<Vec<Caterer>, String>,
}

#[async_trait]
impl CatererSearch for StubSearch {
    async fn search(&self, _request: &SearchRequest) -> Result<Vec<Caterer>> {
        self.outcome.clone().map_err(AgentError::Search)
    }
}

#[derive(Clone, Default)]
struct RecordingSpeaker {
    spoken: Arc<Mutex<Vec<Utterance>>>,
}

impl SpeechSynthesizer for RecordingSpeaker {
    fn speak(&mut self, utterance: &Utterance) -> Result<()> {
        self.spoken.lock().unwrap().push(utterance.clone());
        Ok(())
    }
}

struct BrokenSpeaker;

impl SpeechSynthesizer for BrokenSpeaker {
    fn speak(&mut self, _utterance: &Utterance) -> Result<()> {
        Err(AgentError::Io(std::io::Error::other("no audio device")))
    }
}

struct Harness {
    controller: DialogueController,
    gateway: RecordingGateway,
    backend: Arc<StubBackend>,
    stats: Arc<RecognizerStats>,
    events: EventStream,
}

impl Harness {
    fn new(
        script: impl FnOnce(ScriptedRecognizer) -> ScriptedRecognizer,
        backend: Arc<StubBackend>,
    ) -> Self {
        let (sink, events) = event_channel();
        let engine = script(ScriptedRecognizer::new(sink.clone()));
        let stats = engine.stats();
        let capture = CaptureSession::new(Box::new(engine), sink, &CaptureConfig::default());
        let gateway = RecordingGateway::new();
        let controller = DialogueController::new(
            Some(capture),
            FallbackResponder::new(backend.clone()),
            Box::new(gateway.clone()),
        );
        Self {
            controller,
            gateway,
            backend,
            stats,
            events,
        }
    }

    /// Feed every queued capture event to the controller.
    async fn pump(&mut self) -> Vec<DialogueReply> {
        let mut replies = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            if let Some(reply) = self.controller.handle_event(event).await {
                replies.push(reply);
            }
        }
        replies
    }
}

fn caterer(name: &str) -> Caterer {
    Caterer {
        name: name.to_string(),
        cuisine: "Italian".to_string(),
        rating: 4.8,
        price_range: "$$".to_string(),
        specialties: vec!["pasta".to_string()],
        location: "Boston, MA".to_string(),
        distance: None,
        min_order: 20,
        phone: "(617) 555-0123".to_string(),
    }
}

fn final_transcript(text: &str) -> GatewayCall {
    GatewayCall::Transcript(TranscriptEvent {
        final_text: text.to_string(),
        interim_text: String::new(),
    })
}

// =============================================================================
// Availability
// =============================================================================

#[tokio::test]
async fn test_missing_capture_shows_unavailable_notice() {
    let gateway = RecordingGateway::new();
    let mut controller = DialogueController::new(
        None,
        FallbackResponder::new(StubBackend::replying(Some("hi"))),
        Box::new(gateway.clone()),
    );
    assert_eq!(
        gateway.take(),
        vec![GatewayCall::Unavailable(CaptureFailure::unavailable())]
    );
    assert!(!controller.voice_available());

    controller.toggle();
    assert_eq!(
        gateway.take(),
        vec![GatewayCall::Unavailable(CaptureFailure::unavailable())]
    );
    assert_eq!(controller.session().state(), SessionState::Idle);
}

#[tokio::test]
async fn test_engine_unavailable_disables_voice() {
    let mut h = Harness::new(
        |engine| engine.fail_start(RecognizerError::Unavailable),
        StubBackend::replying(None),
    );
    h.controller.toggle();
    assert_eq!(
        h.gateway.take(),
        vec![GatewayCall::Unavailable(CaptureFailure::unavailable())]
    );
    assert!(!h.controller.voice_available());

    // Later toggles never reach the engine again.
    h.controller.toggle();
    assert_eq!(h.stats.starts(), 1);
}

#[tokio::test]
async fn test_start_failure_reports_error_and_stays_idle() {
    let mut h = Harness::new(
        |engine| engine.fail_start(RecognizerError::Engine("busy".to_string())),
        StubBackend::replying(None),
    );
    h.controller.toggle();
    assert_eq!(
        h.gateway.take(),
        vec![GatewayCall::Error(CaptureFailure::start_failed())]
    );
    assert_eq!(h.controller.session().state(), SessionState::Idle);
    assert!(h.controller.voice_available());
}

// =============================================================================
// Voice flow
// =============================================================================

#[tokio::test]
async fn test_double_toggle_is_start_then_stop() {
    let mut h = Harness::new(|engine| engine, StubBackend::replying(Some("hi")));

    h.controller.toggle();
    assert!(h.controller.is_active());
    assert_eq!(h.controller.session().state(), SessionState::Listening);
    h.controller.toggle();
    assert!(!h.controller.is_active());

    let replies = h.pump().await;
    assert!(replies.is_empty());
    assert_eq!(h.stats.starts(), 1);
    assert_eq!(h.stats.stops(), 1);
    assert!(h.backend.requests().is_empty());
    assert_eq!(h.controller.session().state(), SessionState::Idle);

    let calls = h.gateway.take();
    assert_eq!(calls[..2], [GatewayCall::Listening, GatewayCall::ClearDisplays]);
    assert_eq!(calls.last(), Some(&GatewayCall::Ready));
}

#[tokio::test]
async fn test_restart_before_engine_ends_keeps_first_transcript() {
    let mut h = Harness::new(
        |engine| {
            engine
                .push_attempt(vec![
                    CaptureEvent::Started,
                    CaptureEvent::Result {
                        result_index: 0,
                        results: vec![RecognitionChunk::final_text("pizza in Boston")],
                    },
                ])
                .push_utterance("tacos")
        },
        StubBackend::offline(),
    );

    h.controller.toggle();
    h.controller.toggle();
    h.controller.toggle();
    assert_eq!(h.stats.starts(), 1);
    assert_eq!(
        h.gateway.take(),
        vec![
            GatewayCall::Listening,
            GatewayCall::ClearDisplays,
            GatewayCall::Ready,
            GatewayCall::Error(CaptureFailure::start_failed()),
        ]
    );

    let replies = h.pump().await;
    assert_eq!(replies, vec![DialogueReply::local(FallbackRule::Italian.reply())]);
    let requests = h.backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].transcript.as_deref(), Some("pizza in Boston"));
    assert_eq!(h.controller.session().state(), SessionState::Idle);

    h.controller.toggle();
    assert_eq!(h.stats.starts(), 2);
    assert_eq!(
        h.pump().await,
        vec![DialogueReply::local(FallbackRule::Mexican.reply())]
    );
}

#[tokio::test]
async fn test_spoken_utterance_falls_back_to_local_rules() {
    let mut h = Harness::new(
        |engine| engine.push_utterance("I want pizza in Boston"),
        StubBackend::offline(),
    );

    h.controller.toggle();
    let replies = h.pump().await;

    assert_eq!(replies, vec![DialogueReply::local(FallbackRule::Italian.reply())]);
    assert_eq!(
        h.gateway.take(),
        vec![
            GatewayCall::Listening,
            GatewayCall::ClearDisplays,
            final_transcript("I want pizza in Boston"),
            GatewayCall::Processing,
            GatewayCall::Response(DialogueReply::local(FallbackRule::Italian.reply())),
            GatewayCall::Ready,
        ]
    );
    assert_eq!(h.controller.session().state(), SessionState::Idle);
    assert_eq!(h.controller.capture().map(CaptureSession::state), Some(SessionState::Idle));

    let requests = h.backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].transcript.as_deref(), Some("I want pizza in Boston"));
}

#[tokio::test]
async fn test_interim_results_are_displayed() {
    let mut h = Harness::new(
        |engine| {
            engine.push_attempt(vec![
                CaptureEvent::Started,
                CaptureEvent::Result {
                    result_index: 0,
                    results: vec![RecognitionChunk::interim("tac")],
                },
                CaptureEvent::Result {
                    result_index: 0,
                    results: vec![RecognitionChunk::final_text("tacos please")],
                },
                CaptureEvent::Ended,
            ])
        },
        StubBackend::replying(Some("Sure")),
    );

    h.controller.toggle();
    let replies = h.pump().await;
    assert_eq!(replies, vec![DialogueReply::remote("Sure")]);

    let calls = h.gateway.take();
    assert_eq!(
        calls[2],
        GatewayCall::Transcript(TranscriptEvent {
            final_text: String::new(),
            interim_text: "tac".to_string(),
        })
    );
    assert_eq!(calls[3], final_transcript("tacos please"));
}

#[tokio::test]
async fn test_blank_final_text_skips_backend() {
    let mut h = Harness::new(
        |engine| {
            engine.push_attempt(vec![
                CaptureEvent::Started,
                CaptureEvent::Result {
                    result_index: 0,
                    results: vec![RecognitionChunk::final_text("   ")],
                },
                CaptureEvent::Ended,
            ])
        },
        StubBackend::replying(Some("unused")),
    );

    h.controller.toggle();
    let replies = h.pump().await;

    assert!(replies.is_empty());
    assert!(h.backend.requests().is_empty());
    assert!(!h.gateway.calls().contains(&GatewayCall::Processing));
    assert_eq!(h.controller.session().state(), SessionState::Idle);
}

#[tokio::test]
async fn test_engine_error_then_restart() {
    let mut h = Harness::new(
        |engine| {
            engine
                .push_attempt(vec![
                    CaptureEvent::Started,
                    CaptureEvent::Error {
                        code: "network".to_string(),
                    },
                    CaptureEvent::Ended,
                ])
                .push_utterance("hello")
        },
        StubBackend::replying(Some("Hi there")),
    );

    h.controller.toggle();
    assert!(h.pump().await.is_empty());
    assert_eq!(
        h.gateway.take(),
        vec![
            GatewayCall::Listening,
            GatewayCall::ClearDisplays,
            GatewayCall::Error(CaptureFailure::from_native("network")),
            GatewayCall::Ready,
        ]
    );
    assert_eq!(
        h.controller.capture().and_then(CaptureSession::last_error),
        Some(CaptureErrorKind::Network)
    );
    assert_eq!(h.controller.session().state(), SessionState::Idle);

    h.controller.toggle();
    let replies = h.pump().await;
    assert_eq!(replies, vec![DialogueReply::remote("Hi there")]);
    assert_eq!(h.stats.starts(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_silent_engine_times_out() {
    let mut h = Harness::new(|engine| engine, StubBackend::replying(Some("unused")));

    h.controller.toggle();
    tokio::time::sleep(Duration::from_secs(11)).await;
    let replies = h.pump().await;

    assert!(replies.is_empty());
    assert_eq!(h.stats.stops(), 1);
    assert_eq!(
        h.gateway.take(),
        vec![
            GatewayCall::Listening,
            GatewayCall::ClearDisplays,
            GatewayCall::Error(CaptureFailure::timeout()),
            GatewayCall::Ready,
        ]
    );
    assert_eq!(h.controller.session().state(), SessionState::Idle);
    assert!(h.backend.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_result_disarms_deadline() {
    let mut h = Harness::new(
        |engine| {
            engine.push_attempt(vec![
                CaptureEvent::Started,
                CaptureEvent::Result {
                    result_index: 0,
                    results: vec![RecognitionChunk::interim("still talking")],
                },
            ])
        },
        StubBackend::replying(Some("unused")),
    );

    h.controller.toggle();
    h.pump().await;
    tokio::time::sleep(Duration::from_secs(30)).await;
    h.pump().await;

    assert_eq!(h.stats.stops(), 0);
    assert!(h.controller.is_active());
    assert!(!h
        .gateway
        .calls()
        .contains(&GatewayCall::Error(CaptureFailure::timeout())));
}

// =============================================================================
// Text flow
// =============================================================================

#[tokio::test]
async fn test_blank_text_is_ignored() {
    let mut h = Harness::new(|engine| engine, StubBackend::replying(Some("unused")));
    assert!(h.controller.submit_text("   ").await.is_none());
    assert!(h.gateway.calls().is_empty());
    assert!(h.backend.requests().is_empty());
}

#[tokio::test]
async fn test_text_remote_reply_is_verbatim() {
    let mut h = Harness::new(|engine| engine, StubBackend::replying(Some("X")));

    let reply = h.controller.submit_text("  tacos for 20  ").await;
    assert_eq!(reply, Some(DialogueReply::remote("X")));
    assert_eq!(
        h.gateway.take(),
        vec![
            final_transcript("tacos for 20"),
            GatewayCall::ClearTextInput,
            GatewayCall::Processing,
            GatewayCall::Response(DialogueReply::remote("X")),
            GatewayCall::Ready,
        ]
    );

    let requests = h.backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].call_id, h.controller.session().id().as_str());
    assert_eq!(requests[0].event_type, ConversationEventType::SpeechRecognition);
    assert_eq!(requests[0].transcript.as_deref(), Some("tacos for 20"));
}

#[tokio::test]
async fn test_empty_remote_response_uses_default_prompt() {
    let mut h = Harness::new(|engine| engine, StubBackend::replying(Some("")));
    let reply = h.controller.submit_text("hello").await;
    assert_eq!(reply, Some(DialogueReply::remote(DEFAULT_REMOTE_PROMPT)));
}

#[tokio::test]
async fn test_text_while_listening_keeps_capture_running() {
    let mut h = Harness::new(|engine| engine, StubBackend::offline());

    h.controller.toggle();
    let reply = h.controller.submit_text("help").await;

    assert_eq!(reply.map(|r| r.source), Some(ReplySource::LocalFallback));
    assert_eq!(h.controller.session().state(), SessionState::Listening);
    assert!(h.controller.is_active());
}

#[tokio::test]
async fn test_session_id_is_stable_across_calls() {
    let mut h = Harness::new(|engine| engine, StubBackend::replying(Some("ok")));
    h.controller.submit_text("one").await;
    h.controller.submit_text("two").await;

    let requests = h.backend.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].call_id, requests[1].call_id);
    assert!(requests[0].call_id.starts_with("call_"));
}

// =============================================================================
// Search
// =============================================================================

#[tokio::test]
async fn test_search_blank_query() {
    let h = Harness::new(|engine| engine, StubBackend::replying(None));
    let gateway = h.gateway.clone();
    let mut controller = h.controller.with_search(Arc::new(StubSearch {
        outcome: Ok(vec![caterer("unused")]),
    }));
    assert!(controller.search(SearchType::Cuisine, "  ").await.is_none());
    assert_eq!(
        gateway.take(),
        vec![GatewayCall::SearchError(EMPTY_QUERY_MESSAGE.to_string())]
    );
}

#[tokio::test]
async fn test_search_success_and_empty() {
    let h = Harness::new(|engine| engine, StubBackend::replying(None));
    let gateway = h.gateway.clone();
    let mut controller = h.controller.with_search(Arc::new(StubSearch {
        outcome: Ok(vec![caterer("Bella's Italian Catering")]),
    }));

    let results = controller.search(SearchType::Cuisine, "italian").await;
    assert_eq!(results, Some(vec![caterer("Bella's Italian Catering")]));
    assert_eq!(
        gateway.take(),
        vec![
            GatewayCall::Searching,
            GatewayCall::SearchResults(vec![caterer("Bella's Italian Catering")]),
        ]
    );

    let mut controller = controller.with_search(Arc::new(StubSearch { outcome: Ok(vec![]) }));
    let results = controller.search(SearchType::Location, "Nowhere").await;
    assert_eq!(results, Some(vec![]));
    assert_eq!(
        gateway.take(),
        vec![GatewayCall::Searching, GatewayCall::SearchResults(vec![])]
    );
}

#[tokio::test]
async fn test_search_failure_shows_generic_message() {
    let h = Harness::new(|engine| engine, StubBackend::replying(None));
    let gateway = h.gateway.clone();
    let mut controller = h.controller.with_search(Arc::new(StubSearch {
        outcome: Err("upstream down".to_string()),
    }));

    assert!(controller.search(SearchType::Menu, "sushi").await.is_none());
    assert_eq!(
        gateway.take(),
        vec![
            GatewayCall::Searching,
            GatewayCall::SearchError(SEARCH_FAILED_MESSAGE.to_string()),
        ]
    );
}

#[tokio::test]
async fn test_search_without_client() {
    let mut h = Harness::new(|engine| engine, StubBackend::replying(None));
    assert!(h.controller.search(SearchType::Menu, "sushi").await.is_none());
    assert_eq!(
        h.gateway.take(),
        vec![GatewayCall::SearchError(SEARCH_FAILED_MESSAGE.to_string())]
    );
}

// =============================================================================
// Speech output and shutdown
// =============================================================================

#[tokio::test]
async fn test_reply_is_spoken_with_configured_voice() {
    let h = Harness::new(|engine| engine, StubBackend::replying(Some("Hello!")));
    let speaker = RecordingSpeaker::default();
    let mut controller = h
        .controller
        .with_speaker(Box::new(speaker.clone()), SpeechConfig::default());

    controller.submit_text("hi").await;

    let spoken = speaker.spoken.lock().unwrap().clone();
    assert_eq!(spoken.len(), 1);
    assert_eq!(spoken[0].text, "Hello!");
    assert!((spoken[0].rate - 0.8).abs() < f32::EPSILON);
    assert!((spoken[0].pitch - 1.0).abs() < f32::EPSILON);
}

#[tokio::test]
async fn test_disabled_speech_is_silent() {
    let h = Harness::new(|engine| engine, StubBackend::replying(Some("Hello!")));
    let speaker = RecordingSpeaker::default();
    let config = SpeechConfig {
        enabled: false,
        ..SpeechConfig::default()
    };
    let mut controller = h.controller.with_speaker(Box::new(speaker.clone()), config);

    controller.submit_text("hi").await;
    assert!(speaker.spoken.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_speech_failure_does_not_affect_reply() {
    let h = Harness::new(|engine| engine, StubBackend::replying(Some("Hello!")));
    let gateway = h.gateway.clone();
    let mut controller = h
        .controller
        .with_speaker(Box::new(BrokenSpeaker), SpeechConfig::default());

    let reply = controller.submit_text("hi").await;
    assert_eq!(reply, Some(DialogueReply::remote("Hello!")));
    assert_eq!(gateway.calls().last(), Some(&GatewayCall::Ready));
}

#[tokio::test]
async fn test_shutdown_aborts_capture_and_ends_call() {
    let mut h = Harness::new(|engine| engine, StubBackend::replying(None));

    h.controller.toggle();
    h.controller.shutdown().await;

    assert_eq!(h.stats.aborts(), 1);
    assert!(!h.controller.is_active());
    let requests = h.backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].event_type, ConversationEventType::CallEnded);
    assert_eq!(requests[0].transcript, None);

    // The abort's end callback is ignored.
    assert!(h.pump().await.is_empty());
}
