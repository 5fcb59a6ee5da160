//! Second-pass, query-aware re-ranking through a cross-encoder scorer.
//!
//! Re-ranking only refines an existing ordering: any scorer failure is
//! logged and the input order is returned.

use std::sync::Arc;

use qarag_core::config::RerankConfig;
use qarag_core::error::{QaragError, Result};
use qarag_core::models::{clamp_unit, sort_by_combined_desc, ScoredChunk};
use qarag_core::processing::text;
use qarag_llm::ports::CrossEncoderScorer;

/// Logistic transform of a raw scorer logit into (0, 1)
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Re-ranks candidates with a cross-encoder
#[derive(Clone)]
pub struct Reranker {
    scorer: Arc<dyn CrossEncoderScorer>,
    config: RerankConfig,
}

impl Reranker {
    pub fn new(scorer: Arc<dyn CrossEncoderScorer>, config: RerankConfig) -> Self {
        Self { scorer, config }
    }

    pub fn config(&self) -> &RerankConfig {
        &self.config
    }

    pub fn model_name(&self) -> &str {
        self.scorer.model_name()
    }

    /// Re-score `chunks` against `query` and re-sort.
    ///
    /// Never fails: on scorer error the input is returned in its original
    /// order, cut to `top_k` when given.
    pub async fn rerank_chunks(
        &self,
        query: &str,
        chunks: Vec<ScoredChunk>,
        top_k: Option<usize>,
    ) -> Vec<ScoredChunk> {
        if chunks.is_empty() {
            return chunks;
        }

        let contents: Vec<&str> = chunks.iter().map(ScoredChunk::content).collect();
        match self.score_contents(query, &contents).await {
            Ok(scores) => {
                let reranked = self.combine(chunks, scores, top_k);
                tracing::debug!(
                    results = reranked.len(),
                    model = self.scorer.model_name(),
                    "Re-ranked candidates"
                );
                reranked
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    candidates = chunks.len(),
                    "Re-ranking failed, keeping similarity order"
                );
                truncate(chunks, top_k)
            }
        }
    }

    /// Score a single piece of content; `(false, 0.0)` when the scorer fails
    pub async fn evaluate_relevance(&self, query: &str, content: &str, threshold: f32) -> (bool, f32) {
        match self.score_contents(query, &[content]).await {
            Ok(scores) => match scores.first() {
                Some(&score) => (score >= threshold, score),
                None => (false, 0.0),
            },
            Err(e) => {
                tracing::warn!(error = %e, "Relevance evaluation failed");
                (false, 0.0)
            }
        }
    }

    /// Raw scorer logits, one per content, in input order
    async fn score_contents(&self, query: &str, contents: &[&str]) -> Result<Vec<f32>> {
        let pairs: Vec<(String, String)> = contents
            .iter()
            .map(|content| (query.to_string(), self.prepare_content(content)))
            .collect();

        let mut scores = Vec::with_capacity(pairs.len());
        for batch in pairs.chunks(self.config.batch_size.max(1)) {
            let batch_scores = self.scorer.score(batch).await?;
            if batch_scores.len() != batch.len() {
                return Err(QaragError::provider(
                    self.scorer.model_name(),
                    format!("expected {} scores, got {}", batch.len(), batch_scores.len()),
                ));
            }
            scores.extend(batch_scores);
        }
        Ok(scores)
    }

    fn prepare_content(&self, content: &str) -> String {
        let max = self.config.max_content_chars;
        if text::char_len(content) > max {
            format!("{}...", text::head(content, max))
        } else {
            content.to_string()
        }
    }

    fn combine(&self, chunks: Vec<ScoredChunk>, scores: Vec<f32>, top_k: Option<usize>) -> Vec<ScoredChunk> {
        let mut reranked: Vec<ScoredChunk> = chunks
            .into_iter()
            .zip(scores)
            .map(|(mut chunk, raw)| {
                chunk.combined_score = clamp_unit(
                    self.config.similarity_weight * chunk.combined_score
                        + self.config.rerank_weight * sigmoid(raw),
                );
                chunk.rerank_score = Some(raw);
                chunk
            })
            .filter(|chunk| chunk.combined_score >= self.config.min_score)
            .collect();

        sort_by_combined_desc(&mut reranked);
        truncate(reranked, top_k)
    }
}

fn truncate(mut chunks: Vec<ScoredChunk>, top_k: Option<usize>) -> Vec<ScoredChunk> {
    if let Some(k) = top_k {
        chunks.truncate(k);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use qarag_core::models::{Chunk, ChunkId, ChunkMetadata, ChunkType, Language};
    use std::sync::Mutex;

    struct FixedScorer {
        scores: Vec<f32>,
        seen: Mutex<Vec<usize>>,
        contents: Mutex<Vec<String>>,
    }

    impl FixedScorer {
        fn new(scores: Vec<f32>) -> Self {
            Self { scores, seen: Mutex::new(Vec::new()), contents: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl CrossEncoderScorer for FixedScorer {
        async fn score(&self, pairs: &[(String, String)]) -> Result<Vec<f32>> {
            let mut seen = self.seen.lock().unwrap();
            let offset: usize = seen.iter().sum();
            seen.push(pairs.len());
            self.contents.lock().unwrap().extend(pairs.iter().map(|(_, c)| c.clone()));
            Ok(self.scores[offset..offset + pairs.len()].to_vec())
        }

        fn model_name(&self) -> &str {
            "fixed"
        }
    }

    struct FailingScorer;

    #[async_trait]
    impl CrossEncoderScorer for FailingScorer {
        async fn score(&self, _pairs: &[(String, String)]) -> Result<Vec<f32>> {
            Err(QaragError::provider("failing", "model not loaded"))
        }

        fn model_name(&self) -> &str {
            "failing"
        }
    }

    fn scored(id: &str, content: &str, score: f32) -> ScoredChunk {
        let chunk = Chunk {
            id: ChunkId(id.to_string()),
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
        };
        ScoredChunk::new(chunk, score)
    }

    fn ids(results: &[ScoredChunk]) -> Vec<&str> {
        results.iter().map(|r| r.chunk.id.as_str()).collect()
    }

    #[test]
    fn test_sigmoid() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(10.0) > 0.99);
        assert!(sigmoid(-10.0) < 0.01);
    }

    #[tokio::test]
    async fn test_rerank_reorders_by_combined_score() {
        let reranker = Reranker::new(Arc::new(FixedScorer::new(vec![-4.0, 4.0])), RerankConfig::default());
        let input = vec![scored("a", "first", 0.9), scored("b", "second", 0.5)];

        let results = reranker.rerank_chunks("q", input, None).await;

        assert_eq!(ids(&results), vec!["b", "a"]);
        let expected = 0.3 * 0.5 + 0.7 * sigmoid(4.0);
        assert!((results[0].combined_score - expected).abs() < 1e-6);
        assert_eq!(results[0].rerank_score, Some(4.0));
    }

    #[tokio::test]
    async fn test_rerank_batches_and_truncates_content() {
        let scorer = Arc::new(FixedScorer::new(vec![0.0; 5]));
        let config = RerankConfig { batch_size: 2, max_content_chars: 4, ..Default::default() };
        let reranker = Reranker::new(scorer.clone(), config);
        let input = (0..5).map(|i| scored(&i.to_string(), "abcdefgh", 0.5)).collect();

        let results = reranker.rerank_chunks("q", input, Some(3)).await;

        assert_eq!(results.len(), 3);
        assert_eq!(*scorer.seen.lock().unwrap(), vec![2, 2, 1]);
        assert_eq!(scorer.contents.lock().unwrap()[0], "abcd...");
        // Equal scores keep their input order
        assert_eq!(ids(&results), vec!["0", "1", "2"]);
    }

    #[tokio::test]
    async fn test_min_score_drops_results() {
        let config = RerankConfig { min_score: 0.5, ..Default::default() };
        let reranker = Reranker::new(Arc::new(FixedScorer::new(vec![5.0, -5.0])), config);
        let input = vec![scored("keep", "x", 0.5), scored("drop", "y", 0.5)];

        let results = reranker.rerank_chunks("q", input, None).await;
        assert_eq!(ids(&results), vec!["keep"]);
    }

    #[tokio::test]
    async fn test_weights_decide_between_similarity_and_rerank_order() {
        let input = || vec![scored("similar", "x", 0.9), scored("relevant", "y", 0.5)];
        let scores = vec![-4.0, 4.0];

        let similarity_only = RerankConfig { similarity_weight: 1.0, rerank_weight: 0.0, ..Default::default() };
        let reranker = Reranker::new(Arc::new(FixedScorer::new(scores.clone())), similarity_only);
        let results = reranker.rerank_chunks("q", input(), None).await;
        assert_eq!(ids(&results), vec!["similar", "relevant"]);
        assert!((results[0].combined_score - 0.9).abs() < 1e-6);

        let rerank_only = RerankConfig { similarity_weight: 0.0, rerank_weight: 1.0, ..Default::default() };
        let reranker = Reranker::new(Arc::new(FixedScorer::new(scores)), rerank_only);
        let results = reranker.rerank_chunks("q", input(), None).await;
        assert_eq!(ids(&results), vec!["relevant", "similar"]);
        assert!((results[0].combined_score - sigmoid(4.0)).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_min_score_applies_to_weighted_score() {
        let config = RerankConfig {
            similarity_weight: 1.0,
            rerank_weight: 0.0,
            min_score: 0.6,
            ..Default::default()
        };
        let reranker = Reranker::new(Arc::new(FixedScorer::new(vec![-4.0, 4.0])), config);
        let input = vec![scored("similar", "x", 0.9), scored("relevant", "y", 0.5)];

        let results = reranker.rerank_chunks("q", input, None).await;
        assert_eq!(ids(&results), vec!["similar"]);
    }

    #[tokio::test]
    async fn test_scorer_failure_returns_input_order() {
        let reranker = Reranker::new(Arc::new(FailingScorer), RerankConfig::default());
        let input = vec![scored("a", "x", 0.2), scored("b", "y", 0.9), scored("c", "z", 0.5)];

        let results = reranker.rerank_chunks("q", input.clone(), Some(2)).await;

        assert_eq!(results, input[..2].to_vec());
    }

    #[tokio::test]
    async fn test_evaluate_relevance() {
        let reranker = Reranker::new(Arc::new(FixedScorer::new(vec![1.5])), RerankConfig::default());
        assert_eq!(reranker.evaluate_relevance("q", "content", 1.0).await, (true, 1.5));

        let failing = Reranker::new(Arc::new(FailingScorer), RerankConfig::default());
        assert_eq!(failing.evaluate_relevance("q", "content", 0.0).await, (false, 0.0));
    }
}
