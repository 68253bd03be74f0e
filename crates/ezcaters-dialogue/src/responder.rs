//! Turns a final transcript into a reply: backend first, local rules on failure.
//!
//! Each call is independent. No conversation memory is kept here; the backend
//! tracks context per `call_id` if it wants to.

use std::sync::Arc;
use std::time::Duration;

use ezcaters_core::error::Result;
use ezcaters_core::types::{DialogueReply, SessionId};

use crate::backend::{ConversationBackend, ConversationEventType, ConversationRequest};
use crate::fallback;

/// Used when the backend answers without a `response`.
pub const DEFAULT_REMOTE_PROMPT: &str = "I understand you're looking for catering services. Could you tell me what type of cuisine you're interested in or your location?";

pub struct FallbackResponder {
    backend: Arc<dyn ConversationBackend>,
    latency: Duration,
}

impl FallbackResponder {
    pub fn new(backend: Arc<dyn ConversationBackend>) -> Self {
        Self {
            backend,
            latency: Duration::ZERO,
        }
    }

    /// Wait `latency` before every conversation call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Produce a reply for `transcript`. Never fails: backend errors degrade
    /// to the local keyword rules.
    pub async fn respond(&self, session_id: &SessionId, transcript: &str) -> DialogueReply {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let request = ConversationRequest::speech(session_id, transcript);
        match self.backend.converse(&request).await {
            Ok(response) => {
                if response.end_call {
                    tracing::info!(session_id = %session_id, "Backend requested end of call");
                }
                match response.response.filter(|text| !text.is_empty()) {
                    Some(text) => DialogueReply::remote(text),
                    None => {
                        tracing::warn!(
                            session_id = %session_id,
                            "Backend reply had no response text; using default prompt"
                        );
                        DialogueReply::remote(DEFAULT_REMOTE_PROMPT)
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    session_id = %session_id,
                    error = %e,
                    "Conversation backend failed; using local fallback"
                );
                fallback::local_reply(transcript)
            }
        }
    }

    /// Tell the backend about a call lifecycle change.
    pub async fn notify(&self, session_id: &SessionId, event_type: ConversationEventType) -> Result<()> {
        let request = ConversationRequest::lifecycle(session_id, event_type);
        let response = self.backend.converse(&request).await?;
        tracing::debug!(
            session_id = %session_id,
            message = response.message.as_deref().unwrap_or_default(),
            "Call lifecycle event acknowledged"
        );
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
