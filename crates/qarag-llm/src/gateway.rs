//! Batching and text preparation in front of an embedding provider

use std::sync::{Arc, OnceLock};

use qarag_core::config::EmbeddingConfig;
use qarag_core::error::{QaragError, Result};
use qarag_core::RetryPolicy;
use regex::Regex;

use crate::ports::EmbeddingProvider;

/// Collapse whitespace runs and cut to `max_chars` characters
pub fn clean_text(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }
    tracing::warn!(max_chars, "Text truncated before embedding");
    collapsed.chars().take(max_chars).collect()
}

fn elision_pattern() -> &'static Option<Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)\b(qu|[dlnscjmt])['’]\s*").ok())
}

/// Prepare a query for embedding.
///
/// Collapses whitespace and, when `expand_contractions` is set, expands
/// word-initial French elisions (`qu'` to `que `, `l'` to `le `, ...).
pub fn normalize_query(query: &str, expand_contractions: bool) -> String {
    let collapsed = query.split_whitespace().collect::<Vec<_>>().join(" ");
    if !expand_contractions {
        return collapsed;
    }
    match elision_pattern() {
        Some(re) => re.replace_all(&collapsed, "${1}e ").trim().to_string(),
        None => collapsed,
    }
}

/// Embeds texts through a provider with fixed-size batches, per-text
/// truncation and retry.
///
/// Batching is scoped to one call; concurrent callers never share a batch.
#[derive(Clone)]
pub struct EmbeddingGateway {
    provider: Arc<dyn EmbeddingProvider>,
    config: EmbeddingConfig,
    retry: RetryPolicy,
}

impl EmbeddingGateway {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, config: EmbeddingConfig) -> Self {
        let retry = RetryPolicy::from(&config.retry);
        Self { provider, config, retry }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    pub fn dimensions(&self) -> usize {
        self.provider.dimensions()
    }

    /// Embed document texts, preserving input order
    pub async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let max_chars = self.config.max_chars();
        let batch_size = self.config.batch_size.max(1);
        let batch_count = texts.len().div_ceil(batch_size);
        let mut embeddings = Vec::with_capacity(texts.len());

        tracing::debug!(
            texts = texts.len(),
            batches = batch_count,
            model = self.provider.model_name(),
            "Embedding texts"
        );

        for (i, batch) in texts.chunks(batch_size).enumerate() {
            let cleaned: Vec<String> = batch.iter().map(|t| clean_text(t, max_chars)).collect();
            let vectors = self.embed_batch(&cleaned).await?;
            embeddings.extend(vectors);

            if i + 1 < batch_count && !self.config.batch_delay().is_zero() {
                tokio::time::sleep(self.config.batch_delay()).await;
            }
        }

        Ok(embeddings)
    }

    /// Embed a single query after normalisation
    pub async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let normalized = normalize_query(query, self.config.expand_contractions);
        let cleaned = clean_text(&normalized, self.config.max_chars());
        let mut vectors = self.embed_batch(&[cleaned]).await?;
        vectors.pop().ok_or_else(|| {
            QaragError::provider(self.provider.model_name(), "provider returned no embedding")
        })
    }

    async fn embed_batch(&self, batch: &[String]) -> Result<Vec<Vec<f32>>> {
        let provider = &self.provider;
        let vectors = self.retry.run("embed", move || provider.embed(batch)).await?;

        if vectors.len() != batch.len() {
            return Err(QaragError::provider(
                provider.model_name(),
                format!("expected {} embeddings, got {}", batch.len(), vectors.len()),
            ));
        }
        Ok(vectors)
    }
}
