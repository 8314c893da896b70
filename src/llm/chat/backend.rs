use async_trait::async_trait;
use log::debug;
use rllm::builder::{ LLMBackend, LLMBuilder };
use rllm::chat::{ ChatMessage, ChatRole, MessageType };
use rllm::LLMProvider;

use super::{ ChatClient, LlmError, LlmMessage, LlmRole };
use crate::llm::{ LlmConfig, LlmType };

/// Providers without a hand-written HTTP client, reached through rllm.
pub struct BackendChatClient {
    llm: Box<dyn LLMProvider + Send + Sync>,
    model: String,
    base_url: Option<String>,
}

fn backend_for(llm_type: LlmType) -> Result<(LLMBackend, &'static str), LlmError> {
    match llm_type {
        LlmType::Anthropic => Ok((LLMBackend::Anthropic, "claude-3-5-haiku-latest")),
        LlmType::Gemini => Ok((LLMBackend::Google, "gemini-1.5-flash-latest")),
        LlmType::DeepSeek => Ok((LLMBackend::DeepSeek, "deepseek-chat")),
        other => Err(LlmError::Config(format!("{:?} is not served by the rllm backend", other))),
    }
}

/// rllm has no system role, so system instructions lead the conversation as a
/// user turn.
fn to_backend_messages(messages: &[LlmMessage]) -> Vec<ChatMessage> {
    let system = messages
        .iter()
        .filter(|m| m.role == LlmRole::System)
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    let mut converted = Vec::with_capacity(messages.len());
    if !system.is_empty() {
        converted.push(ChatMessage {
            role: ChatRole::User,
            content: system,
            message_type: MessageType::Text,
        });
    }
    for message in messages {
        let role = match message.role {
            LlmRole::System => {
                continue;
            }
            LlmRole::User => ChatRole::User,
            LlmRole::Assistant => ChatRole::Assistant,
        };
        converted.push(ChatMessage {
            role,
            content: message.content.clone(),
            message_type: MessageType::Text,
        });
    }
    converted
}

impl BackendChatClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let (backend, default_model) = backend_for(config.llm_type)?;
        let api_key = config.api_key
            .clone()
            .ok_or_else(|| LlmError::Config(format!("{:?} API key is required", config.llm_type)))?;
        let model = config.model.clone().unwrap_or_else(|| default_model.to_string());

        let mut builder = LLMBuilder::new()
            .backend(backend)
            .api_key(api_key)
            .model(&model)
            .max_tokens(config.max_tokens)
            .temperature(config.temperature)
            .stream(false);

        if let Some(url) = &config.base_url {
            builder = builder.base_url(url);
        }

        let llm = builder.build().map_err(|e| LlmError::Config(e.to_string()))?;

        Ok(Self {
            llm,
            model,
            base_url: config.base_url.clone(),
        })
    }
}

#[async_trait]
impl ChatClient for BackendChatClient {
    async fn chat(&self, messages: &[LlmMessage]) -> Result<String, LlmError> {
        let backend_messages = to_backend_messages(messages);
        debug!("BackendChatClient::chat() → model={} base_url={:?}", self.model, self.base_url);

        let resp = self.llm
            .chat(&backend_messages).await
            .map_err(|e| LlmError::Transport(e.to_string()))?;
        resp.text()
            .map(|s| s.to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| LlmError::MalformedResponse("empty completion".to_string()))
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        self.base_url.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_leads_as_user_turn() {
        let messages = vec![
            LlmMessage::new(LlmRole::System, "Be an interviewer"),
            LlmMessage::new(LlmRole::Assistant, "Welcome"),
            LlmMessage::new(LlmRole::User, "Hello")
        ];

        let converted = to_backend_messages(&messages);

        assert_eq!(converted.len(), 3);
        assert!(matches!(converted[0].role, ChatRole::User));
        assert_eq!(converted[0].content, "Be an interviewer");
        assert!(matches!(converted[1].role, ChatRole::Assistant));
        assert_eq!(converted[2].content, "Hello");
    }

    #[test]
    fn ollama_is_not_an_rllm_backend() {
        assert!(backend_for(LlmType::Ollama).is_err());
    }
}
