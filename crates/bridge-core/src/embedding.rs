//! Embedding endpoint client
//!
//! Converts a text string into a fixed-dimension vector via the Google
//! `embedContent` API. Treated as an unreliable collaborator: any transport
//! error, non-success status, or malformed body becomes [`EmbeddingError`],
//! which the retriever recovers from by degrading to an empty context.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::EmbeddingError;

/// Unified embedding endpoint interface.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text into a fixed-length vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// The model identifier (e.g. `"text-embedding-004"`).
    fn model_id(&self) -> &str;
}

/// Embedding provider backed by the Google generative language API.
pub struct GeminiEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiEmbedder {
    /// Build an embedder from configuration. Returns `None` when the
    /// embedding credential is absent; retrieval is then disabled rather
    /// than failing per call.
    pub fn from_config(config: &Config) -> Option<Self> {
        let api_key = config.google_api_key.clone()?;
        Some(Self {
            client: reqwest::Client::new(),
            api_key,
            model: config.embedding_model.clone(),
            base_url: config.api_base_url.clone(),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let url = format!(
            "{}/v1beta/models/{}:embedContent",
            self.base_url, self.model
        );
        let request = EmbedRequest {
            model: format!("models/{}", self.model),
            content: ContentParts {
                parts: vec![Part { text }],
            },
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| EmbeddingError(format!("transport: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError(format!("HTTP {status}: {body}")));
        }

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError(format!("malformed response: {e}")))?;

        if body.embedding.values.is_empty() {
            return Err(EmbeddingError("empty embedding in response".to_string()));
        }

        Ok(body.embedding.values)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: String,
    content: ContentParts<'a>,
}

#[derive(Debug, Serialize)]
struct ContentParts<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    #[serde(default)]
    values: Vec<f32>,
}
