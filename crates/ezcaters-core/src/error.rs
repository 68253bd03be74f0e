use thiserror::Error;

use crate::types::SessionState;

/// Top-level error type for the EZCaters voice agent.
///
/// Timeouts and native engine errors are not errors here: they end an attempt
/// and reach the user as a `CaptureFailure`. Remote failures are recovered
/// locally by the dialogue layer and only surface here so they can be logged.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AgentError {
    #[error("Speech recognition is not available")]
    CaptureUnavailable,

    #[error("Failed to start voice recognition: {0}")]
    CaptureStart(String),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition {
        from: SessionState,
        to: SessionState,
    },

    #[error("Remote call failed: {0}")]
    RemoteCall(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Input is empty")]
    EmptyInput,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for AgentError {
    fn from(err: toml::de::Error) -> Self {
        AgentError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for AgentError {
    fn from(err: toml::ser::Error) -> Self {
        AgentError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(err: serde_json::Error) -> Self {
        AgentError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for voice agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;
