use std::collections::HashMap;
use std::sync::Arc;

use qarag_core::config::{HybridWeights, RankingConfig};
use qarag_core::error::{QaragError, Result};
use qarag_core::models::{
    clamp_unit, sort_by_combined_desc, ChunkId, HybridScores, MetadataFilter, ScoredChunk,
    MISSING_AXIS_SCORE,
};
use qarag_store::ports::VectorIndex;

use crate::ranking;

/// Semantic, keyword and hybrid search over a vector index
#[derive(Clone)]
pub struct VectorSearch {
    index: Arc<dyn VectorIndex>,
    ranking: RankingConfig,
}

impl VectorSearch {
    pub fn new(index: Arc<dyn VectorIndex>, ranking: RankingConfig) -> Self {
        Self { index, ranking }
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    pub fn ranking(&self) -> &RankingConfig {
        &self.ranking
    }

    /// Nearest-neighbour search with multi-factor re-scoring.
    ///
    /// Over-fetches from the index, converts distances to similarities,
    /// applies ranking factors, then stable-sorts and truncates to `k`.
    pub async fn search(
        &self,
        query_vector: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredChunk>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let fetch = self.ranking.fetch_size(k);
        let hits = self.index.query(query_vector, fetch, filter).await?;

        tracing::debug!(requested = k, fetched = hits.len(), "Vector search");

        let results = hits
            .into_iter()
            .map(|hit| ScoredChunk::new(hit.chunk, 1.0 - hit.distance))
            .collect();

        Ok(ranking::rank(results, k, &self.ranking))
    }

    /// Metadata-only lookup, every hit scored 1.0
    pub async fn keyword_search(&self, filter: &MetadataFilter, k: usize) -> Result<Vec<ScoredChunk>> {
        if filter.is_empty() {
            return Err(QaragError::validation("filter", "keyword search needs at least one criterion"));
        }
        filter.validate()?;

        let chunks = self.index.get(filter, k).await?;
        tracing::debug!(found = chunks.len(), "Keyword search");

        Ok(chunks.into_iter().map(|chunk| ScoredChunk::new(chunk, 1.0)).collect())
    }

    /// Weighted merge of semantic and keyword results.
    ///
    /// Both paths fetch `2k` results. A chunk absent from one path scores
    /// [`MISSING_AXIS_SCORE`] on that axis. Without keywords only the
    /// semantic path runs.
    pub async fn hybrid_search(
        &self,
        query_vector: &[f32],
        keywords: &[String],
        k: usize,
        filter: Option<&MetadataFilter>,
        weights: &HybridWeights,
    ) -> Result<Vec<ScoredChunk>> {
        let (semantic_weight, keyword_weight) = weights.normalized()?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let fetch = k.saturating_mul(2);
        let keyword_filter = filter.cloned().unwrap_or_default().with_keywords(keywords.iter().cloned());

        let semantic = self.search(query_vector, fetch, filter);
        let keyword = async {
            if keywords.is_empty() {
                Ok(Vec::new())
            } else {
                self.keyword_search(&keyword_filter, fetch).await
            }
        };
        let (semantic, keyword) = tokio::try_join!(semantic, keyword)?;

        tracing::debug!(
            semantic = semantic.len(),
            keyword = keyword.len(),
            semantic_weight,
            keyword_weight,
            "Hybrid search"
        );

        let mut merged = merge_hybrid(semantic, keyword, semantic_weight, keyword_weight);
        merged.truncate(k);
        Ok(merged)
    }
}

/// Union both result lists by chunk id and score each with the weighted sum
pub fn merge_hybrid(
    semantic: Vec<ScoredChunk>,
    keyword: Vec<ScoredChunk>,
    semantic_weight: f32,
    keyword_weight: f32,
) -> Vec<ScoredChunk> {
    let mut positions: HashMap<ChunkId, usize> = HashMap::new();
    let mut merged: Vec<ScoredChunk> = Vec::with_capacity(semantic.len() + keyword.len());

    for mut result in semantic {
        if positions.contains_key(&result.chunk.id) {
            continue;
        }
        result.hybrid =
            Some(HybridScores { semantic: result.combined_score, keyword: MISSING_AXIS_SCORE });
        positions.insert(result.chunk.id.clone(), merged.len());
        merged.push(result);
    }

    for result in keyword {
        match positions.get(&result.chunk.id) {
            Some(&i) => {
                if let Some(scores) = merged[i].hybrid.as_mut() {
                    scores.keyword = result.combined_score;
                }
            }
            None => {
                let mut result = ScoredChunk::new(result.chunk, MISSING_AXIS_SCORE);
                result.hybrid =
                    Some(HybridScores { semantic: MISSING_AXIS_SCORE, keyword: 1.0 });
                positions.insert(result.chunk.id.clone(), merged.len());
                merged.push(result);
            }
        }
    }

    for result in &mut merged {
        if let Some(scores) = result.hybrid {
            result.combined_score =
                clamp_unit(semantic_weight * scores.semantic + keyword_weight * scores.keyword);
        }
    }

    sort_by_combined_desc(&mut merged);
    merged
}
