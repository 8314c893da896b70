pub mod backend;
pub mod ollama;
pub mod openai;

use async_trait::async_trait;
use serde::{ Deserialize, Serialize };
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use super::{ LlmConfig, LlmType };
use self::backend::BackendChatClient;
use self::ollama::OllamaClient;
use self::openai::OpenAIChatClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmMessage {
    pub role: LlmRole,
    pub content: String,
}

impl LlmMessage {
    pub fn new(role: LlmRole, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }
}

/// Ways a chat completion can fail. Callers on the interview path treat every
/// kind the same; the kind only matters for logging.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM request timed out after {0:?}")]
    Timeout(Duration),
    #[error("LLM transport error: {0}")]
    Transport(String),
    #[error("LLM returned status {status}: {body}")]
    Status {
        status: u16,
        body: String,
    },
    #[error("malformed LLM response: {0}")]
    MalformedResponse(String),
    #[error("invalid LLM configuration: {0}")]
    Config(String),
}

impl LlmError {
    pub fn kind(&self) -> &'static str {
        match self {
            LlmError::Timeout(_) => "timeout",
            LlmError::Transport(_) => "transport",
            LlmError::Status { .. } => "status",
            LlmError::MalformedResponse(_) => "malformed_response",
            LlmError::Config(_) => "config",
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Transport(err.to_string())
    }
}

/// Single request/response chat completion.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Returns the next assistant message for `messages`.
    async fn chat(&self, messages: &[LlmMessage]) -> Result<String, LlmError>;

    fn get_model(&self) -> String;
    fn get_base_url(&self) -> Option<String>;
}

/// Reads a completed HTTP response, turning non-2xx statuses into
/// [`LlmError::Status`] and body decoding failures into
/// [`LlmError::MalformedResponse`].
pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response
) -> Result<T, LlmError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(LlmError::Status { status: status.as_u16(), body });
    }
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| LlmError::MalformedResponse(e.to_string()))
}

pub fn new_client(config: &LlmConfig) -> Result<Arc<dyn ChatClient>, LlmError> {
    let client: Arc<dyn ChatClient> = match config.llm_type {
        LlmType::Ollama => Arc::new(OllamaClient::from_config(config)?),
        LlmType::OpenAI | LlmType::Llama | LlmType::Groq | LlmType::XAI => {
            Arc::new(OpenAIChatClient::from_config(config)?)
        }
        LlmType::Anthropic | LlmType::Gemini | LlmType::DeepSeek => {
            Arc::new(BackendChatClient::from_config(config)?)
        }
    };
    Ok(client)
}
