use std::sync::Arc;
use std::time::Instant;

use qarag_core::config::{AdaptiveThresholds, HybridWeights, QualityFilter, RetrievalConfig};
use qarag_core::error::{QaragError, Result};
use qarag_core::models::{
    MetadataFilter, RetrievalQuery, RetrievalStrategy, ScoredChunk, SearchMode,
};
use qarag_llm::EmbeddingGateway;

use crate::metrics::MetricsRecorder;
use crate::rerank::Reranker;
use crate::search::VectorSearch;

/// Outcome of an adaptive retrieval
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptiveRetrieval {
    pub chunks: Vec<ScoredChunk>,
    pub strategy: RetrievalStrategy,
    /// Combined score of the best candidate, before selection and filtering
    pub top_score: Option<f32>,
    pub reranked: bool,
}

impl AdaptiveRetrieval {
    pub fn no_answer() -> Self {
        Self { chunks: Vec::new(), strategy: RetrievalStrategy::NoAnswer, top_score: None, reranked: false }
    }
}

/// Map the top candidate score to a strategy
pub fn select_strategy(top_score: f32, thresholds: &AdaptiveThresholds) -> RetrievalStrategy {
    if top_score >= thresholds.high {
        RetrievalStrategy::Direct
    } else if top_score >= thresholds.fallback {
        RetrievalStrategy::Rag
    } else {
        RetrievalStrategy::Fallback
    }
}

/// Drop chunks that are too short or mostly non-alphabetic
pub fn apply_quality_filters(chunks: Vec<ScoredChunk>, quality: &QualityFilter) -> Vec<ScoredChunk> {
    chunks
        .into_iter()
        .filter(|chunk| {
            let content = chunk.content();
            if content.trim().chars().count() < quality.min_chars {
                return false;
            }
            let total = content.chars().count();
            if total == 0 {
                return false;
            }
            let textual = content.chars().filter(|c| c.is_alphabetic() || c.is_whitespace()).count();
            textual as f32 / total as f32 >= quality.min_alpha_ratio
        })
        .collect()
}

/// Split keyword criteria out of a filter, for the keyword axis of hybrid search
fn split_keywords(filter: &MetadataFilter) -> (MetadataFilter, Vec<String>) {
    let mut pre_filter = filter.clone();
    let keywords = std::mem::take(&mut pre_filter.keywords);
    (pre_filter, keywords)
}

fn as_option(filter: &MetadataFilter) -> Option<&MetadataFilter> {
    if filter.is_empty() {
        None
    } else {
        Some(filter)
    }
}

/// Retrieval orchestrator: filters, hybrid merge, re-ranking and adaptive
/// strategy selection.
///
/// Holds no per-call mutable state; concurrent calls are independent.
#[derive(Clone)]
pub struct Retriever {
    gateway: EmbeddingGateway,
    search: VectorSearch,
    reranker: Option<Reranker>,
    config: RetrievalConfig,
    metrics: Option<Arc<MetricsRecorder>>,
}

impl Retriever {
    pub fn new(gateway: EmbeddingGateway, search: VectorSearch, config: RetrievalConfig) -> Self {
        Self { gateway, search, reranker: None, config, metrics: None }
    }

    pub fn with_reranker(mut self, reranker: Reranker) -> Self {
        self.reranker = Some(reranker);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRecorder>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn metrics(&self) -> Option<&Arc<MetricsRecorder>> {
        self.metrics.as_ref()
    }

    /// A query carrying the configured defaults
    pub fn query(&self, text: impl Into<String>) -> RetrievalQuery {
        RetrievalQuery::new(text, self.config.default_k)
            .with_reranking(self.config.enable_reranking)
            .with_mode(self.config.adaptive_mode)
    }

    fn reranks(&self, query: &RetrievalQuery) -> bool {
        query.use_reranking && self.reranker.is_some()
    }

    /// Ranked chunks for a query, optionally re-ranked
    pub async fn retrieve(&self, query: &RetrievalQuery) -> Result<Vec<ScoredChunk>> {
        query.validate(self.config.max_k)?;

        let fetch = if self.reranks(query) {
            query.k.saturating_mul(self.config.candidate_factor.max(1))
        } else {
            query.k
        };

        let candidates = self.gather(query, fetch).await?;
        Ok(self.maybe_rerank(query, candidates, query.k).await)
    }

    /// Metadata-only lookup; every chunk scores 1.0
    pub async fn retrieve_by_keywords(&self, filter: &MetadataFilter, k: usize) -> Result<Vec<ScoredChunk>> {
        if k == 0 || k > self.config.max_k {
            return Err(QaragError::validation("k", format!("k must be within 1..={}", self.config.max_k)));
        }
        self.search.keyword_search(filter, k).await
    }

    /// Semantic and keyword results merged with the given weights.
    ///
    /// The query filter's keywords drive the keyword axis; the remaining
    /// criteria pre-filter both axes.
    pub async fn retrieve_hybrid(
        &self,
        query: &RetrievalQuery,
        weights: &HybridWeights,
    ) -> Result<Vec<ScoredChunk>> {
        query.validate(self.config.max_k)?;
        weights.validate()?;

        let vector = self.gateway.embed_query(&query.text).await?;
        let (pre_filter, keywords) = split_keywords(&query.filter);
        self.search
            .hybrid_search(&vector, &keywords, query.k, as_option(&pre_filter), weights)
            .await
    }

    /// Adaptive retrieval with the configured thresholds
    pub async fn retrieve_adaptive(&self, query: &RetrievalQuery) -> Result<AdaptiveRetrieval> {
        let thresholds = self.config.thresholds;
        self.retrieve_adaptive_with(query, &thresholds).await
    }

    /// Retrieve candidates and decide how assertively to answer.
    ///
    /// Invalid requests are rejected before any I/O. A failed attempt is
    /// retried once without re-ranking and with half the `k`; if that also
    /// fails the result is an empty `no_answer`, except for index failures
    /// which are returned as errors.
    pub async fn retrieve_adaptive_with(
        &self,
        query: &RetrievalQuery,
        thresholds: &AdaptiveThresholds,
    ) -> Result<AdaptiveRetrieval> {
        query.validate(self.config.max_k)?;
        thresholds.validate()?;

        let started = Instant::now();
        let outcome = match self.adaptive_attempt(query, thresholds).await {
            Ok(outcome) => outcome,
            Err(first) => {
                let reduced = RetrievalQuery { k: (query.k / 2).max(1), ..query.clone() }
                    .with_reranking(false);
                tracing::warn!(
                    error = %first,
                    k = reduced.k,
                    "Adaptive retrieval failed, retrying without re-ranking"
                );

                match self.adaptive_attempt(&reduced, thresholds).await {
                    Ok(outcome) => outcome,
                    Err(e @ QaragError::IndexUnavailable { .. }) => return Err(e),
                    Err(e) => {
                        tracing::warn!(error = %e, "Adaptive retry failed, no answer");
                        AdaptiveRetrieval::no_answer()
                    }
                }
            }
        };

        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        tracing::info!(
            strategy = %outcome.strategy,
            chunk_count = outcome.chunks.len(),
            top_score = outcome.top_score.unwrap_or(0.0),
            latency_ms,
            "Adaptive retrieval"
        );

        if let Some(metrics) = &self.metrics {
            metrics.record_retrieval(
                &query.text,
                outcome.strategy,
                &outcome.chunks,
                latency_ms,
                outcome.reranked,
            );
        }

        Ok(outcome)
    }

    async fn adaptive_attempt(
        &self,
        query: &RetrievalQuery,
        thresholds: &AdaptiveThresholds,
    ) -> Result<AdaptiveRetrieval> {
        let fetch = query.k.saturating_mul(self.config.candidate_factor.max(1));
        let candidates = self.gather(query, fetch).await?;
        if candidates.is_empty() {
            return Ok(AdaptiveRetrieval::no_answer());
        }

        let reranked = self.reranks(query);
        let candidates = self.maybe_rerank(query, candidates, fetch).await;

        let Some(top_score) = candidates.first().map(|c| c.combined_score) else {
            return Ok(AdaptiveRetrieval { reranked, ..AdaptiveRetrieval::no_answer() });
        };

        let strategy = select_strategy(top_score, thresholds);
        let keep = match strategy {
            RetrievalStrategy::Direct => 1,
            RetrievalStrategy::Rag => query.k,
            RetrievalStrategy::Fallback => self.config.fallback_max_chunks.min(query.k),
            RetrievalStrategy::NoAnswer => 0,
        };

        let mut selected = candidates;
        selected.truncate(keep);
        let chunks = apply_quality_filters(selected, &self.config.quality);

        tracing::debug!(strategy = %strategy, top_score, kept = chunks.len(), "Strategy selected");

        Ok(AdaptiveRetrieval { chunks, strategy, top_score: Some(top_score), reranked })
    }

    /// Embed the query and collect up to `fetch` ranked candidates
    async fn gather(&self, query: &RetrievalQuery, fetch: usize) -> Result<Vec<ScoredChunk>> {
        let vector = self.gateway.embed_query(&query.text).await?;

        match query.mode {
            SearchMode::Semantic => self.search.search(&vector, fetch, as_option(&query.filter)).await,
            SearchMode::Hybrid => {
                let (pre_filter, keywords) = split_keywords(&query.filter);
                self.search
                    .hybrid_search(&vector, &keywords, fetch, as_option(&pre_filter), &self.config.hybrid)
                    .await
            }
        }
    }

    async fn maybe_rerank(
        &self,
        query: &RetrievalQuery,
        mut candidates: Vec<ScoredChunk>,
        k: usize,
    ) -> Vec<ScoredChunk> {
        match (&self.reranker, query.use_reranking) {
            (Some(reranker), true) => reranker.rerank_chunks(&query.text, candidates, Some(k)).await,
            _ => {
                candidates.truncate(k);
                candidates
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qarag_core::models::{Chunk, ChunkId, ChunkMetadata, ChunkType, Language};

    fn scored(content: &str, score: f32) -> ScoredChunk {
        ScoredChunk::new(
            Chunk {
                id: ChunkId("c".to_string()),
                content: content.to_string(),
                metadata: ChunkMetadata {
                    chunk_type: ChunkType::Regular,
                    length: content.chars().count(),
                    word_count: 1,
                    has_questions: false,
                    has_answers: false,
                    confidence_score: 1.0,
                    language: Language::Unknown,
                    document_id: "doc".to_string(),
                    chunk_index: 0,
                    source_name: None,
                    keywords: vec![],
                },
            },
            score,
        )
    }

    #[test]
    fn test_select_strategy_boundaries() {
        let thresholds = AdaptiveThresholds::default();
        assert_eq!(select_strategy(0.8, &thresholds), RetrievalStrategy::Direct);
        assert_eq!(select_strategy(0.79, &thresholds), RetrievalStrategy::Rag);
        assert_eq!(select_strategy(0.3, &thresholds), RetrievalStrategy::Rag);
        assert_eq!(select_strategy(0.29, &thresholds), RetrievalStrategy::Fallback);
        assert_eq!(select_strategy(0.0, &thresholds), RetrievalStrategy::Fallback);
    }

    #[test]
    fn test_select_strategy_custom_thresholds() {
        let thresholds = AdaptiveThresholds { high: 0.6, fallback: 0.5 };
        assert_eq!(select_strategy(0.65, &thresholds), RetrievalStrategy::Direct);
        assert_eq!(select_strategy(0.55, &thresholds), RetrievalStrategy::Rag);
        assert_eq!(select_strategy(0.45, &thresholds), RetrievalStrategy::Fallback);
    }

    #[test]
    fn test_quality_filters() {
        let good = "Le calcul de l'indice se fait en divisant le poids par la taille.";
        let noisy = "12.5 | 13.7 | 14.2 | 15.9 | 16.1 | 17.4 | 18.8 | 19.0";
        let short = "Trop court.";

        let kept = apply_quality_filters(
            vec![scored(good, 0.9), scored(noisy, 0.8), scored(short, 0.7)],
            &QualityFilter::default(),
        );
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].content(), good);
    }

    #[test]
    fn test_quality_filter_is_configurable() {
        let relaxed = QualityFilter { min_chars: 5, min_alpha_ratio: 0.0 };
        let kept = apply_quality_filters(vec![scored("12345 678", 0.5)], &relaxed);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_split_keywords() {
        let filter = MetadataFilter::new().with_keywords(["imc"]).with_document_ids(["d1"]);
        let (pre, keywords) = split_keywords(&filter);
        assert_eq!(keywords, vec!["imc".to_string()]);
        assert!(pre.keywords.is_empty());
        assert_eq!(pre.document_ids, vec!["d1".to_string()]);
    }
}
