use async_trait::async_trait;
use log::debug;
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION } };
use serde::{ Deserialize, Serialize };

use super::{ read_json, ChatClient, LlmError, LlmMessage };
use crate::llm::{ LlmConfig, LlmType };

/// Client for any `/chat/completions` endpoint speaking the OpenAI wire format
/// (OpenAI, the Llama API, Groq, xAI).
pub struct OpenAIChatClient {
    http: HttpClient,
    model: Option<String>,
    base_url: String,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: &'a [LlmMessage],
    stream: bool,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Deserialize)]
struct ChatCompletionMessage {
    content: Option<String>,
}

fn default_endpoint(llm_type: LlmType) -> (&'static str, Option<&'static str>) {
    match llm_type {
        LlmType::Llama => ("https://api.llama.ai/chat/completions", None),
        LlmType::Groq => ("https://api.groq.com/openai/v1/chat/completions", Some("llama-3.1-8b-instant")),
        LlmType::XAI => ("https://api.x.ai/v1/chat/completions", Some("grok-2-latest")),
        _ => ("https://api.openai.com/v1/chat/completions", Some("gpt-4o")),
    }
}

impl OpenAIChatClient {
    pub fn new(
        api_key: &str,
        model: Option<String>,
        base_url: String,
        max_tokens: u32,
        temperature: f32,
        top_p: f32
    ) -> Result<Self, LlmError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(|e|
                LlmError::Config(format!("Invalid API key format: {}", e))
            )?
        );

        let http = HttpClient::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| LlmError::Config(e.to_string()))?;

        Ok(Self {
            http,
            model,
            base_url,
            max_tokens,
            temperature,
            top_p,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config.api_key
            .clone()
            .ok_or_else(|| LlmError::Config(format!("{:?} API key is required", config.llm_type)))?;
        let (default_url, default_model) = default_endpoint(config.llm_type);

        Self::new(
            &api_key,
            config.model.clone().or_else(|| default_model.map(str::to_string)),
            config.base_url.clone().unwrap_or_else(|| default_url.to_string()),
            config.max_tokens,
            config.temperature,
            config.top_p
        )
    }
}

#[async_trait]
impl ChatClient for OpenAIChatClient {
    async fn chat(&self, messages: &[LlmMessage]) -> Result<String, LlmError> {
        let req = ChatCompletionRequest {
            model: self.model.as_deref(),
            messages,
            stream: false,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            top_p: self.top_p,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        };
        debug!("POST {} ({} messages)", self.base_url, messages.len());

        let response = self.http.post(&self.base_url).json(&req).send().await?;
        let completion: ChatCompletionResponse = read_json(response).await?;

        completion.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::MalformedResponse("no choices in completion".to_string()))
    }

    fn get_model(&self) -> String {
        self.model.clone().unwrap_or_default()
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.base_url.clone())
    }
}
