use super::{ChatMessage, LLM, LLMConfig, LLMProvider, LLMResponse};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const LMSTUDIO_CHAT_URL: &str = "http://localhost:1234/v1/chat/completions";

/// Wire format shared by every OpenAI-compatible chat endpoint
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
    usage: Option<ChatCompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionUsage {
    total_tokens: u32,
}

async fn send_chat(
    client: &reqwest::Client,
    endpoint: &str,
    api_key: Option<&str>,
    request: &ChatCompletionRequest,
) -> Result<LLMResponse> {
    let mut builder = client.post(endpoint).json(request);
    if let Some(key) = api_key {
        builder = builder.header("Authorization", format!("Bearer {}", key));
    }

    let response = builder.send().await?;

    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        return Err(anyhow!("Chat API error {}: {}", status, text));
    }

    let completion: ChatCompletionResponse = response.json().await?;

    let content = completion
        .choices
        .first()
        .ok_or_else(|| anyhow!("Chat response contained no choices"))?
        .message
        .content
        .clone();

    let tokens_used = completion.usage.map(|u| u.total_tokens);

    Ok(LLMResponse {
        content,
        tokens_used,
    })
}

/// Hosted OpenAI provider
pub struct OpenAIProvider {
    config: LLMConfig,
    client: reqwest::Client,
}

impl OpenAIProvider {
    pub fn new(config: LLMConfig) -> Result<Self> {
        if config.api_key.is_none() {
            return Err(anyhow!("OpenAI API key required"));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { config, client })
    }

    fn endpoint(&self) -> &str {
        self.config.endpoint.as_deref().unwrap_or(OPENAI_CHAT_URL)
    }
}

#[async_trait]
impl LLM for OpenAIProvider {
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<LLMResponse> {
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        debug!("Sending chat request to OpenAI ({})", self.config.model);
        send_chat(
            &self.client,
            self.endpoint(),
            self.config.api_key.as_deref(),
            &request,
        )
        .await
    }

    async fn is_available(&self) -> bool {
        let Some(api_key) = &self.config.api_key else {
            return false;
        };

        match self
            .client
            .get("https://api.openai.com/v1/models")
            .header("Authorization", format!("Bearer {}", api_key))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    fn provider_type(&self) -> LLMProvider {
        LLMProvider::OpenAI
    }
}

/// OpenAI-compatible local server provider (LM Studio shape)
pub struct LMStudioProvider {
    config: LLMConfig,
    client: reqwest::Client,
}

impl LMStudioProvider {
    pub fn new(config: LLMConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { config, client })
    }

    fn endpoint(&self) -> &str {
        self.config.endpoint.as_deref().unwrap_or(LMSTUDIO_CHAT_URL)
    }
}

#[async_trait]
impl LLM for LMStudioProvider {
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<LLMResponse> {
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        debug!("Sending chat request to local server at {}", self.endpoint());
        send_chat(
            &self.client,
            self.endpoint(),
            self.config.api_key.as_deref(),
            &request,
        )
        .await
    }

    async fn is_available(&self) -> bool {
        // LM Studio exposes a models listing next to chat completions
        let models_endpoint = self.endpoint().replace("/chat/completions", "/models");

        match self.client.get(&models_endpoint).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    fn provider_type(&self) -> LLMProvider {
        LLMProvider::LMStudio
    }
}
