use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Session
// =============================================================================

/// Opaque conversation identifier, unique per controller construction.
///
/// Sent to the conversation backend as `call_id` so it can keep per-call
/// context. Format: `call_<9 chars>_<unix millis>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        let random = Uuid::new_v4().simple().to_string();
        Self(format!(
            "call_{}_{}",
            &random[..9],
            Utc::now().timestamp_millis()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state shared by the capture state machine and the dialogue session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// Nothing in flight. Ready to listen or accept text.
    Idle,
    /// The speech engine is capturing audio.
    Listening,
    /// A final transcript is being turned into a reply.
    Processing,
    /// The last capture attempt failed; waiting to be reset.
    Error,
    /// The engine reported a graceful end of capture.
    Ended,
}

impl SessionState {
    /// Listening and Processing both hold the single active capture slot.
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Listening | SessionState::Processing)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "Idle"),
            SessionState::Listening => write!(f, "Listening"),
            SessionState::Processing => write!(f, "Processing"),
            SessionState::Error => write!(f, "Error"),
            SessionState::Ended => write!(f, "Ended"),
        }
    }
}

// =============================================================================
// Capture errors
// =============================================================================

/// Classified reason a capture attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaptureErrorKind {
    Network,
    NotAllowed,
    NoSpeech,
    AudioCapture,
    ServiceBlocked,
    BadGrammar,
    LanguageUnsupported,
    Unknown,
    Timeout,
}

impl CaptureErrorKind {
    /// Map a native engine error code to its kind. Unrecognised codes are `Unknown`.
    pub fn from_code(code: &str) -> Self {
        match code {
            "network" => CaptureErrorKind::Network,
            "not-allowed" => CaptureErrorKind::NotAllowed,
            "no-speech" => CaptureErrorKind::NoSpeech,
            "audio-capture" => CaptureErrorKind::AudioCapture,
            "service-not-allowed" => CaptureErrorKind::ServiceBlocked,
            "bad-grammar" => CaptureErrorKind::BadGrammar,
            "language-not-supported" => CaptureErrorKind::LanguageUnsupported,
            _ => CaptureErrorKind::Unknown,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            CaptureErrorKind::Network => "network",
            CaptureErrorKind::NotAllowed => "not-allowed",
            CaptureErrorKind::NoSpeech => "no-speech",
            CaptureErrorKind::AudioCapture => "audio-capture",
            CaptureErrorKind::ServiceBlocked => "service-not-allowed",
            CaptureErrorKind::BadGrammar => "bad-grammar",
            CaptureErrorKind::LanguageUnsupported => "language-not-supported",
            CaptureErrorKind::Unknown => "unknown",
            CaptureErrorKind::Timeout => "timeout",
        }
    }
}

impl fmt::Display for CaptureErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

const NETWORK_SUGGESTION: &str = "The browser's speech recognition service requires internet access to Google's servers.\n\
Solutions:\n\
• Check your internet connection\n\
• Try refreshing the page\n\
• Use the text demo below (recommended)\n\
• Some networks/firewalls block speech services";

const RETRY_SUGGESTION: &str = "Please try again or use the text demo below.";

/// A user-facing description of a failed capture attempt.
///
/// Every failure carries a human message and a remediation suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureFailure {
    pub kind: CaptureErrorKind,
    pub message: String,
    pub suggestion: String,
}

impl CaptureFailure {
    /// Describe a native engine error code.
    pub fn from_native(code: &str) -> Self {
        let kind = CaptureErrorKind::from_code(code);
        let (detail, suggestion) = match kind {
            CaptureErrorKind::Network => ("connectivity problem", NETWORK_SUGGESTION),
            CaptureErrorKind::NotAllowed => (
                "microphone access denied",
                "Please allow microphone access in your browser settings and try again.",
            ),
            CaptureErrorKind::NoSpeech => (
                "no speech detected",
                "Please speak clearly and try again, or use the text demo below.",
            ),
            CaptureErrorKind::AudioCapture => (
                "microphone unavailable",
                "Please check your microphone connection or use the text demo below.",
            ),
            CaptureErrorKind::ServiceBlocked => (
                "speech service blocked",
                "Speech recognition may be blocked by your network/firewall. Use the text demo below.",
            ),
            CaptureErrorKind::BadGrammar => {
                ("recognition configuration error", RETRY_SUGGESTION)
            }
            CaptureErrorKind::LanguageUnsupported => ("language not supported", RETRY_SUGGESTION),
            CaptureErrorKind::Unknown | CaptureErrorKind::Timeout => {
                let detail = if code.is_empty() { "unknown error" } else { code };
                return Self {
                    kind: CaptureErrorKind::Unknown,
                    message: format!("Speech recognition issue: {detail}"),
                    suggestion: "Please try again or use the reliable text demo below.".to_string(),
                };
            }
        };

        Self {
            kind,
            message: format!("Speech recognition issue: {detail}"),
            suggestion: suggestion.to_string(),
        }
    }

    /// The hard capture deadline expired with no result.
    pub fn timeout() -> Self {
        Self {
            kind: CaptureErrorKind::Timeout,
            message: "Speech recognition timed out".to_string(),
            suggestion: RETRY_SUGGESTION.to_string(),
        }
    }

    /// The engine refused to start a capture attempt.
    pub fn start_failed() -> Self {
        Self {
            kind: CaptureErrorKind::Unknown,
            message: "Failed to start voice recognition".to_string(),
            suggestion: "Please try again or use the reliable text demo below.".to_string(),
        }
    }

    /// No speech engine exists in this environment.
    pub fn unavailable() -> Self {
        Self {
            kind: CaptureErrorKind::Unknown,
            message: "Speech recognition is not available".to_string(),
            suggestion: "Voice input is not supported here. Use the text demo below.".to_string(),
        }
    }
}

// =============================================================================
// Transcripts and replies
// =============================================================================

/// Running transcript after a recognition tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEvent {
    pub final_text: String,
    pub interim_text: String,
}

impl TranscriptEvent {
    /// Text to display: committed text followed by the provisional tail.
    pub fn display_text(&self) -> String {
        format!("{}{}", self.final_text, self.interim_text)
    }
}

/// Where a dialogue reply came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReplySource {
    Remote,
    LocalFallback,
}

impl fmt::Display for ReplySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplySource::Remote => write!(f, "remote"),
            ReplySource::LocalFallback => write!(f, "local-fallback"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueReply {
    pub text: String,
    pub source: ReplySource,
}

impl DialogueReply {
    pub fn remote(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: ReplySource::Remote,
        }
    }

    pub fn local(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: ReplySource::LocalFallback,
        }
    }
}

// =============================================================================
// Caterer search
// =============================================================================

/// Which field a caterer search matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    Cuisine,
    Location,
    Menu,
}

impl std::str::FromStr for SearchType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cuisine" => Ok(SearchType::Cuisine),
            "location" => Ok(SearchType::Location),
            "menu" => Ok(SearchType::Menu),
            other => Err(format!("unknown search type: {other}")),
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchType::Cuisine => write!(f, "cuisine"),
            SearchType::Location => write!(f, "location"),
            SearchType::Menu => write!(f, "menu"),
        }
    }
}

/// Body of `POST /search`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(rename = "type")]
    pub kind: SearchType,
    pub query: String,
}

/// One caterer returned by the search endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Caterer {
    pub name: String,
    pub cuisine: String,
    pub rating: f64,
    pub price_range: String,
    #[serde(default)]
    pub specialties: Vec<String>,
    pub location: String,
    /// Miles from the searched location; only present for location searches.
    #[serde(default)]
    pub distance: Option<f64>,
    pub min_order: u32,
    pub phone: String,
}
