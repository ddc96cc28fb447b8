//! Groq API Client
//!
//! OpenAI-compatible chat completions client used for both the text model
//! and the vision model. The [`LanguageModel`] trait is the seam the
//! response generator depends on, so tests can substitute a fake.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::session::MemoryEntry;

pub const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_TEXT_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_VISION_MODEL: &str = "meta-llama/llama-4-scout-17b-16e-instruct";

/// Language model call failures. All of them are recoverable.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API key not configured")]
    NotConfigured,

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// Part of a multimodal message
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

/// Message body: plain text or text + image parts
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// Message in the request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn system(text: &str) -> Self {
        Self {
            role: "system".to_string(),
            content: MessageContent::Text(text.to_string()),
        }
    }

    pub fn user_with_image(text: &str, image_data_url: String) -> Self {
        Self {
            role: "user".to_string(),
            content: MessageContent::Parts(vec![
                ContentPart::Text { text: text.to_string() },
                ContentPart::ImageUrl { image_url: ImageUrl { url: image_data_url } },
            ]),
        }
    }

    /// Text content, if this is a plain-text message
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            MessageContent::Text(t) => Some(t),
            MessageContent::Parts(_) => None,
        }
    }
}

impl From<&MemoryEntry> for ChatMessage {
    fn from(entry: &MemoryEntry) -> Self {
        Self {
            role: entry.role.as_str().to_string(),
            content: MessageContent::Text(entry.content.clone()),
        }
    }
}

/// API request
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

/// API response
#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// External text-completion collaborator
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Whether credentials are configured at all
    fn is_available(&self) -> bool;

    /// Send one completion request and return the trimmed reply text
    async fn complete(&self, request: &CompletionRequest, timeout: Duration) -> Result<String, LlmError>;
}

/// Groq API client
#[derive(Clone)]
pub struct GroqClient {
    client: Client,
    api_key: Option<String>,
    api_url: String,
}

impl GroqClient {
    pub fn new(api_key: Option<&str>) -> Self {
        Self::with_url(api_key, GROQ_API_URL)
    }

    pub fn with_url(api_key: Option<&str>, api_url: &str) -> Self {
        // Treat the .env.example placeholder as missing
        let api_key = api_key
            .filter(|k| !k.trim().is_empty() && *k != "your_groq_api_key_here")
            .map(|k| k.to_string());

        Self {
            client: Client::new(),
            api_key,
            api_url: api_url.to_string(),
        }
    }

    /// Create from config
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self::with_url(config.groq_api_key.as_deref(), &config.groq_api_url)
    }
}

#[async_trait]
impl LanguageModel for GroqClient {
    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn complete(&self, request: &CompletionRequest, timeout: Duration) -> Result<String, LlmError> {
        let api_key = self.api_key.as_ref().ok_or(LlmError::NotConfigured)?;

        debug!(
            "Calling Groq API: model={}, messages={}",
            request.model,
            request.messages.len()
        );

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .timeout(timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| if e.is_timeout() { LlmError::Timeout(timeout) } else { LlmError::Transport(e) })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status { status, body });
        }

        let body: CompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Malformed(e.to_string()))?;

        let content = extract_content(body)?;
        info!("Groq response: model={}, chars={}", request.model, content.len());
        Ok(content)
    }
}

fn extract_content(body: CompletionResponse) -> Result<String, LlmError> {
    let content = body
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| LlmError::Malformed("no choices in response".to_string()))?;

    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(LlmError::Malformed("empty completion".to_string()));
    }
    Ok(trimmed.to_string())
}
