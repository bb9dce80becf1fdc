use std::{
    collections::VecDeque,
    sync::{Mutex, MutexGuard},
    time::Duration,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::agent::{agent_model::ConversationTurn, error::AgentError};

/// Body POSTed to the chat endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub history: Vec<ConversationTurn>,
}

/// Body returned by the chat endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ChatReply {
    /// The directive text, or an error when the service flagged the call as
    /// failed (`success: false`, or an `error` with no message).
    pub fn into_message(self) -> Result<String, AgentError> {
        let message = self.message.filter(|m| !m.is_empty());
        if self.success == Some(false) || (self.error.is_some() && message.is_none()) {
            return Err(AgentError::Service(
                self.error
                    .or(message)
                    .unwrap_or_else(|| "Chat request failed".into()),
            ));
        }
        Ok(message.unwrap_or_default())
    }
}

/// The remote service that decides the next action.
#[async_trait]
pub trait ReasoningService: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<String, AgentError>;
}

// ============================================================================
// HTTP chat endpoint
// ============================================================================

pub const DEFAULT_ENDPOINT: &str = "http://localhost:3000/api/chat";

pub struct ChatEndpoint {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    timeout: Option<Duration>,
}

impl Default for ChatEndpoint {
    fn default() -> Self {
        ChatEndpoint::new(DEFAULT_ENDPOINT)
    }
}

impl ChatEndpoint {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.to_string(),
            api_key: None,
            timeout: None,
        }
    }

    /// Send `Authorization: Bearer <key>` with every request.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Per-request timeout. Without one a hung request hangs the run.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ReasoningService for ChatEndpoint {
    async fn complete(&self, request: ChatRequest) -> Result<String, AgentError> {
        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        debug!(
            endpoint = %self.endpoint,
            history = request.history.len(),
            "Sending chat request"
        );
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ChatReply>(&body)
                .ok()
                .and_then(|r| r.error.or(r.message))
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| {
                    let trimmed = body.trim();
                    if trimmed.is_empty() {
                        status.canonical_reason().unwrap_or("request failed").to_string()
                    } else {
                        trimmed.to_string()
                    }
                });
            warn!(status = status.as_u16(), %message, "Chat request rejected");
            return Err(AgentError::ServiceStatus {
                status: status.as_u16(),
                message,
            });
        }

        let reply: ChatReply = serde_json::from_str(&body).map_err(|e| AgentError::JsonParse {
            context: "chat reply".into(),
            source: e,
        })?;
        reply.into_message()
    }
}

// ============================================================================
// Scripted service (fixed replies, for tests and dry runs)
// ============================================================================

#[derive(Debug, Default)]
struct Script {
    replies: VecDeque<Result<String, String>>,
    served: usize,
    requests: Vec<ChatRequest>,
}

/// Answers from a fixed queue of replies and records every request.
#[derive(Debug, Default)]
pub struct ScriptedReasoner {
    script: Mutex<Script>,
    repeat_last: bool,
}

impl ScriptedReasoner {
    pub fn new<S: Into<String>>(replies: impl IntoIterator<Item = S>) -> Self {
        ScriptedReasoner {
            script: Mutex::new(Script {
                replies: replies.into_iter().map(|r| Ok(r.into())).collect(),
                ..Default::default()
            }),
            repeat_last: false,
        }
    }

    /// Give the same reply forever.
    pub fn repeating(reply: impl Into<String>) -> Self {
        ScriptedReasoner {
            repeat_last: true,
            ..ScriptedReasoner::new([reply.into()])
        }
    }

    /// Queue a call that fails with a service error.
    pub fn then_fail(self, message: impl Into<String>) -> Self {
        self.script().replies.push_back(Err(message.into()));
        self
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.script().requests.clone()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ReasoningService for ScriptedReasoner {
    async fn complete(&self, request: ChatRequest) -> Result<String, AgentError> {
        let mut script = self.script();
        script.requests.push(request);

        let next = if self.repeat_last && script.replies.len() == 1 {
            script.replies.front().cloned()
        } else {
            script.replies.pop_front()
        };

        match next {
            Some(reply) => {
                script.served += 1;
                reply.map_err(AgentError::Service)
            }
            None => Err(AgentError::ScriptExhausted(script.served)),
        }
    }
}
