//! Provider port definitions

use async_trait::async_trait;
use qarag_core::error::Result;

/// Port for embedding text into vector representations
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embeddings for a batch of texts
    ///
    /// # Arguments
    /// * `texts` - Texts to embed, already cleaned and truncated
    ///
    /// # Returns
    /// One embedding vector per input text, in input order
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the dimensionality of embeddings produced by this provider
    fn dimensions(&self) -> usize;

    /// Get the name/identifier of the embedding model
    fn model_name(&self) -> &str;
}

/// Port for query-aware relevance scoring of (query, content) pairs
#[async_trait]
pub trait CrossEncoderScorer: Send + Sync {
    /// Score a batch of pairs
    ///
    /// # Arguments
    /// * `pairs` - (query, content) pairs
    ///
    /// # Returns
    /// One raw, unbounded relevance logit per pair, in input order
    async fn score(&self, pairs: &[(String, String)]) -> Result<Vec<f32>>;

    /// Get the name/identifier of the scoring model
    fn model_name(&self) -> &str;
}
