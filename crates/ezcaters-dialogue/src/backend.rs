//! HTTP client for the conversation (`POST /webhook`) and caterer search
//! (`POST /search`) endpoints.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use ezcaters_core::config::BackendConfig;
use ezcaters_core::error::{AgentError, Result};
use ezcaters_core::types::{Caterer, SearchRequest, SessionId};

use crate::search::CatererSearch;

/// Event kinds accepted by the conversation endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationEventType {
    CallStarted,
    CallEnded,
    SpeechRecognition,
}

/// Body of `POST /webhook`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRequest {
    pub call_id: String,
    pub event_type: ConversationEventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
}

impl ConversationRequest {
    pub fn speech(session_id: &SessionId, transcript: &str) -> Self {
        Self {
            call_id: session_id.to_string(),
            event_type: ConversationEventType::SpeechRecognition,
            transcript: Some(transcript.to_string()),
        }
    }

    pub fn lifecycle(session_id: &SessionId, event_type: ConversationEventType) -> Self {
        Self {
            call_id: session_id.to_string(),
            event_type,
            transcript: None,
        }
    }
}

/// Reply from `POST /webhook`. Lifecycle events answer with `message` only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConversationResponse {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub end_call: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Remote conversation service.
#[async_trait]
pub trait ConversationBackend: Send + Sync {
    async fn converse(&self, request: &ConversationRequest) -> Result<ConversationResponse>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Option<Vec<Caterer>>,
    #[serde(default)]
    error: Option<String>,
}

/// reqwest-backed client for both backend endpoints.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| AgentError::Config(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST `body` as JSON and return the status and raw response text.
    async fn post<T: Serialize + Sync>(
        &self,
        path: &str,
        body: &T,
    ) -> std::result::Result<(reqwest::StatusCode, String), reqwest::Error> {
        let resp = self.client.post(self.url(path)).json(body).send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        Ok((status, text))
    }
}

#[async_trait]
impl ConversationBackend for HttpBackend {
    async fn converse(&self, request: &ConversationRequest) -> Result<ConversationResponse> {
        let (status, body) = self
            .post("/webhook", request)
            .await
            .map_err(|e| AgentError::RemoteCall(e.to_string()))?;

        tracing::debug!(%status, call_id = %request.call_id, "Conversation backend replied");
        if !status.is_success() {
            return Err(AgentError::RemoteCall(format!("HTTP {status}: {body}")));
        }

        serde_json::from_str(&body)
            .map_err(|e| AgentError::RemoteCall(format!("malformed response: {e}")))
    }
}

#[async_trait]
impl CatererSearch for HttpBackend {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<Caterer>> {
        let (status, body) = self
            .post("/search", request)
            .await
            .map_err(|e| AgentError::Search(e.to_string()))?;

        let parsed: SearchResponse = serde_json::from_str(&body)
            .map_err(|e| AgentError::Search(format!("HTTP {status}: malformed response: {e}")))?;

        if status.is_success() {
            Ok(parsed.results.unwrap_or_default())
        } else {
            Err(AgentError::Search(
                parsed.error.unwrap_or_else(|| format!("HTTP {status}")),
            ))
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
