//! Mistral agent completion client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::GenerationError;

/// Agent completions endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.mistral.ai/v1/agents/completions";

/// Agent configured to write git commit messages.
pub const DEFAULT_AGENT_ID: &str = "ag:952a4ff1:20250309:git-commit:d9a7e0dc";

/// Trait for sending a prompt to a completion service.
///
/// This abstraction allows mocking the remote endpoint in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send `prompt` as the only user message and return the first choice's raw content.
    async fn complete(&self, api_key: &str, prompt: &str) -> Result<String, GenerationError>;
}

#[derive(Debug, Serialize)]
struct AgentRequest<'a> {
    agent_id: &'a str,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AgentResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// HTTP client for the Mistral agents API.
#[derive(Debug, Clone)]
pub struct AgentClient {
    http: Client,
    endpoint: String,
    agent_id: String,
    timeout: Duration,
}

impl AgentClient {
    /// Build a client with a request timeout applied to every call.
    pub fn new(
        endpoint: impl Into<String>,
        agent_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(GenerationError::ClientBuild)?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
            agent_id: agent_id.into(),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CompletionClient for AgentClient {
    #[instrument(skip_all, fields(endpoint = %self.endpoint, agent_id = %self.agent_id))]
    async fn complete(&self, api_key: &str, prompt: &str) -> Result<String, GenerationError> {
        let body = AgentRequest {
            agent_id: &self.agent_id,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        debug!("Sending {} char prompt", prompt.len());

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        debug!("Completion endpoint answered HTTP {}", status.as_u16());

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;

        parse_agent_response(&text)
    }
}

impl AgentClient {
    fn transport_error(&self, error: reqwest::Error) -> GenerationError {
        if error.is_timeout() {
            GenerationError::Timeout(self.timeout.as_secs())
        } else {
            GenerationError::Transport(error)
        }
    }
}

/// Extract the first choice's content from an agent response body.
fn parse_agent_response(body: &str) -> Result<String, GenerationError> {
    let parsed: AgentResponse = serde_json::from_str(body).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        GenerationError::InvalidResponse(format!("{e}. Response: {preview}"))
    })?;

    parsed
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or(GenerationError::NoChoices)
}
