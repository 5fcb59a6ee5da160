use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{QaragError, Result};
use crate::models::SearchMode;

fn invalid(key: &str, reason: impl Into<String>) -> QaragError {
    QaragError::ConfigInvalid { key: key.to_string(), reason: reason.into() }
}

fn check_unit(key: &str, value: f32) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(key, format!("{} is outside [0, 1]", value)))
    }
}

/// Retry settings for calls to external providers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: 3, initial_backoff_ms: 4000, max_backoff_ms: 10_000, multiplier: 2.0 }
    }
}

/// Embedding provider and gateway settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
    pub base_url: String,
    pub dimensions: usize,
    /// Texts sent per provider call
    pub batch_size: usize,
    /// Per-text token budget
    pub max_tokens: usize,
    /// Characters assumed per token when truncating
    pub chars_per_token: usize,
    /// Pause between consecutive batches of one call
    pub batch_delay_ms: u64,
    /// Expand French elisions (qu', l', ...) in queries before embedding
    pub expand_contractions: bool,
    pub retry: RetryConfig,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "nomic-embed-text".to_string(),
            base_url: "http://localhost:11434".to_string(),
            dimensions: 768,
            batch_size: 100,
            max_tokens: 8000,
            chars_per_token: 4,
            batch_delay_ms: 100,
            expand_contractions: true,
            retry: RetryConfig::default(),
        }
    }
}

impl EmbeddingConfig {
    /// Maximum characters kept per text
    pub fn max_chars(&self) -> usize {
        self.max_tokens.saturating_mul(self.chars_per_token)
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }
}

/// Structural ranking signals applied on top of vector similarity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    pub enable_qa_boost: bool,
    pub qa_boost: f32,
    pub complete_qa_bonus: f32,
    pub partial_qa_bonus: f32,
    pub optimal_length_min: usize,
    pub optimal_length_max: usize,
    pub optimal_length_bonus: f32,
    pub short_length_threshold: usize,
    pub short_length_penalty: f32,
    pub confidence_weight: f32,
    /// Raw neighbours fetched per requested result
    pub overfetch_factor: usize,
    /// Upper bound on raw neighbours per query
    pub max_fetch: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            enable_qa_boost: true,
            qa_boost: 0.15,
            complete_qa_bonus: 0.10,
            partial_qa_bonus: 0.05,
            optimal_length_min: 500,
            optimal_length_max: 2000,
            optimal_length_bonus: 0.05,
            short_length_threshold: 100,
            short_length_penalty: 0.10,
            confidence_weight: 0.10,
            overfetch_factor: 3,
            max_fetch: 50,
        }
    }
}

impl RankingConfig {
    /// Raw neighbours to request for `k` results, never fewer than `k`
    pub fn fetch_size(&self, k: usize) -> usize {
        k.saturating_mul(self.overfetch_factor).min(self.max_fetch).max(k)
    }
}

/// Cross-encoder re-ranking settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankConfig {
    pub similarity_weight: f32,
    pub rerank_weight: f32,
    /// Characters of chunk content sent to the scorer
    pub max_content_chars: usize,
    pub batch_size: usize,
    /// Results below this combined score are dropped
    pub min_score: f32,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            similarity_weight: 0.3,
            rerank_weight: 0.7,
            max_content_chars: 1000,
            batch_size: 32,
            min_score: 0.0,
        }
    }
}

/// Score cutoffs for adaptive strategy selection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveThresholds {
    pub high: f32,
    pub fallback: f32,
}

impl Default for AdaptiveThresholds {
    fn default() -> Self {
        Self { high: 0.8, fallback: 0.3 }
    }
}

impl AdaptiveThresholds {
    pub fn validate(&self) -> Result<()> {
        check_unit("thresholds.high", self.high)?;
        check_unit("thresholds.fallback", self.fallback)?;
        if self.fallback > self.high {
            return Err(invalid(
                "thresholds.fallback",
                format!("fallback ({}) cannot exceed high ({})", self.fallback, self.high),
            ));
        }
        Ok(())
    }
}

/// Relative weights of the semantic and keyword axes in hybrid search
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridWeights {
    pub semantic: f32,
    pub keyword: f32,
}

impl Default for HybridWeights {
    fn default() -> Self {
        Self { semantic: 0.7, keyword: 0.3 }
    }
}

impl HybridWeights {
    pub fn validate(&self) -> Result<()> {
        if self.semantic < 0.0 || self.keyword < 0.0 {
            return Err(invalid("hybrid", "weights must not be negative"));
        }
        if self.semantic + self.keyword <= 0.0 {
            return Err(invalid("hybrid", "weights must not sum to 0"));
        }
        Ok(())
    }

    /// Weights rescaled to sum to 1
    pub fn normalized(&self) -> Result<(f32, f32)> {
        self.validate()?;
        let total = self.semantic + self.keyword;
        Ok((self.semantic / total, self.keyword / total))
    }
}

/// Post-selection noise filter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityFilter {
    pub min_chars: usize,
    /// Minimum share of alphabetic and whitespace characters
    pub min_alpha_ratio: f32,
}

impl Default for QualityFilter {
    fn default() -> Self {
        Self { min_chars: 50, min_alpha_ratio: 0.5 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub default_k: usize,
    pub max_k: usize,
    pub enable_reranking: bool,
    /// Candidate multiplier used by adaptive retrieval
    pub candidate_factor: usize,
    /// Candidate gathering mode for adaptive retrieval
    pub adaptive_mode: SearchMode,
    pub thresholds: AdaptiveThresholds,
    /// Chunks returned under the fallback strategy
    pub fallback_max_chunks: usize,
    pub hybrid: HybridWeights,
    pub quality: QualityFilter,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_k: 5,
            max_k: 10,
            enable_reranking: true,
            candidate_factor: 2,
            adaptive_mode: SearchMode::Semantic,
            thresholds: AdaptiveThresholds::default(),
            fallback_max_chunks: 2,
            hybrid: HybridWeights::default(),
            quality: QualityFilter::default(),
        }
    }
}

/// Confidence bands used by quality metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceBands {
    pub high: f32,
    pub medium: f32,
    pub low: f32,
}

impl Default for ConfidenceBands {
    fn default() -> Self {
        Self { high: 0.8, medium: 0.5, low: 0.3 }
    }
}

/// Aggregate bounds past which recommendations are emitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationThresholds {
    pub max_avg_latency_ms: f64,
    pub min_success_rate: f64,
    pub max_no_answer_rate: f64,
    pub min_avg_sources: f64,
    pub min_high_confidence_rate: f64,
}

impl Default for RecommendationThresholds {
    fn default() -> Self {
        Self {
            max_avg_latency_ms: 1000.0,
            min_success_rate: 0.8,
            max_no_answer_rate: 0.3,
            min_avg_sources: 2.0,
            min_high_confidence_rate: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Ring buffer capacity
    pub capacity: usize,
    /// Characters of the query kept per record
    pub query_max_chars: usize,
    pub default_window_hours: i64,
    /// Records included in an export
    pub export_records: usize,
    pub bands: ConfidenceBands,
    pub recommendations: RecommendationThresholds,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            query_max_chars: 100,
            default_window_hours: 24,
            export_records: 100,
            bands: ConfidenceBands::default(),
            recommendations: RecommendationThresholds::default(),
        }
    }
}
