use async_trait::async_trait;
use qarag_core::config::EmbeddingConfig;
use qarag_core::error::{QaragError, Result};
use serde::{Deserialize, Serialize};

use crate::ports::EmbeddingProvider;

const PROVIDER: &str = "ollama";

/// Ollama embedding provider
pub struct OllamaEmbedder {
    /// Base URL for Ollama API (e.g., "http://localhost:11434")
    base_url: String,

    /// Model name to use for embeddings
    model: String,

    /// Embedding dimensions (model-specific)
    dimensions: usize,

    /// HTTP client
    client: reqwest::Client,
}

impl OllamaEmbedder {
    /// Create a new Ollama embedder
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            dimensions,
            client: reqwest::Client::new(),
        }
    }

    /// Create with default localhost URL
    pub fn localhost(model: impl Into<String>, dimensions: usize) -> Self {
        Self::new("http://localhost:11434", model, dimensions)
    }

    pub fn from_config(config: &EmbeddingConfig) -> Self {
        Self::new(&config.base_url, &config.model, config.dimensions)
    }

    fn unavailable(&self, reason: String) -> QaragError {
        QaragError::ProviderUnavailable {
            provider: PROVIDER.to_string(),
            reason: format!(
                "{}. Ensure Ollama is running at {} and run 'ollama pull {}'",
                reason, self.base_url, self.model
            ),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = OllamaEmbedRequest { model: &self.model, input: texts };

        let response = self
            .client
            .post(format!("{}/api/embed", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| self.unavailable(format!("Failed to connect to Ollama: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(self.unavailable(format!("Ollama API error ({}): {}", status, error_text)));
        }

        let body: OllamaEmbedResponse = response
            .json()
            .await
            .map_err(|e| self.unavailable(format!("Failed to parse Ollama response: {}", e)))?;

        if body.embeddings.len() != texts.len() {
            return Err(self.unavailable(format!(
                "Ollama returned {} embeddings for {} inputs",
                body.embeddings.len(),
                texts.len()
            )));
        }

        Ok(body.embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Request body for the Ollama batch embed API
#[derive(Debug, Serialize)]
struct OllamaEmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

/// Response from the Ollama batch embed API
#[derive(Debug, Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}
