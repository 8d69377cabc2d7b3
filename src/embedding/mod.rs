//! Text embedding providers

use crate::openai::OpenAiClient;
use anyhow::{bail, Result};
use async_trait::async_trait;

/// Turns text into a fixed-dimension vector. Failures are expected and
/// callers degrade around them.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Embeddings from an OpenAI-compatible endpoint
pub struct OpenAiEmbedder {
    client: OpenAiClient,
}

impl OpenAiEmbedder {
    pub fn new(client: OpenAiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.client.embed(text.trim()).await
    }
}

/// Stand-in used when no embedding backend is configured. Every call fails,
/// so the semantic tier is always skipped.
pub struct DisabledEmbedder;

#[async_trait]
impl EmbeddingProvider for DisabledEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        bail!("no embedding provider configured")
    }
}
