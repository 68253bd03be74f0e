//! EZCaters Voice crate - speech capture state machine and engine abstraction.
//!
//! A capture attempt moves Idle -> Listening -> {Ended -> Processing | Error} -> Idle.
//! Engine callbacks and the hard deadline arrive as `CaptureEvent`s on one
//! channel and are fed through `CaptureSession::handle`.

pub mod recognizer;
pub mod session;
pub mod state;

pub use recognizer::{
    event_channel, CaptureEvent, EventSink, EventStream, RecognitionChunk, RecognizerError,
    RecognizerSettings, RecognizerStats, ScriptedRecognizer, SpeechRecognizer,
};
pub use session::{CaptureSession, CaptureUpdate};
pub use state::StateMachine;
