//! EZCaters Dialogue crate - conversation flow for the catering voice agent.
//!
//! Wires speech capture to the conversation backend, degrades to local keyword
//! replies when the backend is unreachable, and reports every state change to
//! a presentation gateway.

pub mod backend;
pub mod controller;
pub mod fallback;
pub mod gateway;
pub mod responder;
pub mod search;
pub mod speech;

pub use backend::{
    ConversationBackend, ConversationEventType, ConversationRequest, ConversationResponse,
    HttpBackend,
};
pub use controller::{DialogueController, Session};
pub use fallback::FallbackRule;
pub use gateway::{GatewayCall, PresentationGateway, RecordingGateway};
pub use responder::{FallbackResponder, DEFAULT_REMOTE_PROMPT};
pub use search::CatererSearch;
pub use speech::{SpeechSynthesizer, Utterance};
