//! Cross-encoder scoring on tokio's blocking pool.
//!
//! Compute-bound scorers must not run on the async workers that serve
//! concurrent retrievals, so each batch is handed to `spawn_blocking`.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use qarag_core::error::{QaragError, Result};

use crate::ports::CrossEncoderScorer;

type ScoreFn = dyn Fn(&str, &str) -> f32 + Send + Sync;

/// Adapts a synchronous `(query, content) -> logit` function to the
/// `CrossEncoderScorer` port
#[derive(Clone)]
pub struct BlockingScorer {
    name: String,
    score_fn: Arc<ScoreFn>,
}

impl BlockingScorer {
    pub fn new<F>(name: impl Into<String>, score_fn: F) -> Self
    where
        F: Fn(&str, &str) -> f32 + Send + Sync + 'static,
    {
        Self { name: name.into(), score_fn: Arc::new(score_fn) }
    }

    /// Scorer backed by [`term_overlap_scorer`]
    pub fn term_overlap() -> Self {
        Self::new("term-overlap", term_overlap_scorer)
    }
}

#[async_trait]
impl CrossEncoderScorer for BlockingScorer {
    async fn score(&self, pairs: &[(String, String)]) -> Result<Vec<f32>> {
        let pairs = pairs.to_vec();
        let score_fn = Arc::clone(&self.score_fn);

        tokio::task::spawn_blocking(move || {
            pairs
                .iter()
                .map(|(query, content)| score_fn(query.as_str(), content.as_str()))
                .collect::<Vec<f32>>()
        })
        .await
        .map_err(|e| QaragError::provider(self.name.clone(), format!("scoring task failed: {}", e)))
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}

fn terms(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 1)
        .map(str::to_string)
        .collect()
}

/// Lexical relevance logit in [-5, 5]: the share of distinct query terms
/// found in the content, rescaled so a logistic transform spreads it over
/// (0, 1)
pub fn term_overlap_scorer(query: &str, content: &str) -> f32 {
    let query_terms = terms(query);
    if query_terms.is_empty() {
        return -5.0;
    }
    let content_terms = terms(content);
    let found = query_terms.intersection(&content_terms).count();
    let coverage = found as f32 / query_terms.len() as f32;
    coverage * 10.0 - 5.0
}
