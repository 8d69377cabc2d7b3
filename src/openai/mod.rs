//! OpenAI-compatible chat and embeddings client
//!
//! Shared by the embedding provider, the model-backed query parser and the
//! response composer.

use crate::config::OpenAiSettings;
use crate::network::{HttpClient, HttpRequest};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// One chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Options for one chat completion
#[derive(Debug, Clone)]
pub struct ChatOptions {
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the model for a JSON object
    pub json: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Thin client over `/chat/completions` and `/embeddings`
#[derive(Clone)]
pub struct OpenAiClient {
    client: HttpClient,
    settings: OpenAiSettings,
}

impl OpenAiClient {
    pub fn new(client: HttpClient, settings: OpenAiSettings) -> Self {
        Self { client, settings }
    }

    pub fn settings(&self) -> &OpenAiSettings {
        &self.settings
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.settings.base_url.trim_end_matches('/'), path)
    }

    /// Embed `text` with the configured embedding model
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = HttpRequest::post(self.endpoint("embeddings"))
            .bearer(&self.settings.api_key)
            .json(json!({
                "model": self.settings.embedding_model,
                "input": text,
            }));

        let response: EmbeddingResponse = self.client.execute(request).await?.error_for_status()?.json()?;
        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| anyhow!("embedding response carried no vector"))
    }

    /// Run a chat completion and return the first choice's content
    pub async fn chat(&self, messages: Vec<ChatMessage>, options: &ChatOptions) -> Result<String> {
        let mut body = json!({
            "model": self.settings.chat_model,
            "temperature": options.temperature,
            "max_tokens": options.max_tokens,
            "messages": messages,
        });
        if options.json {
            body["response_format"] = json!({ "type": "json_object" });
        }

        let request = HttpRequest::post(self.endpoint("chat/completions"))
            .bearer(&self.settings.api_key)
            .json(body);

        let response: ChatResponse = self.client.execute(request).await?.error_for_status()?.json()?;
        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow!("chat response carried no choices"))
    }
}
