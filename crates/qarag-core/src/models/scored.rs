use serde::{Deserialize, Serialize};

use super::Chunk;

/// Score used for a retrieval axis that produced no evidence for a chunk.
///
/// Shared by hybrid merging (a chunk missing from one path) and by any
/// ranking signal that cannot be computed.
pub const MISSING_AXIS_SCORE: f32 = 0.0;

/// Clamp a score into [0, 1], mapping NaN to 0
pub fn clamp_unit(score: f32) -> f32 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

/// Structural adjustments added on top of vector similarity
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RankingFactors {
    pub qa_boost: f32,
    pub qa_completeness: f32,
    pub length_factor: f32,
    pub confidence_factor: f32,
    /// Reserved, always 0
    pub recency_factor: f32,
}

impl RankingFactors {
    pub fn total(&self) -> f32 {
        self.qa_boost
            + self.qa_completeness
            + self.length_factor
            + self.confidence_factor
            + self.recency_factor
    }

    /// Named view of the factors, in a fixed order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f32)> {
        [
            ("qa_boost", self.qa_boost),
            ("qa_completeness", self.qa_completeness),
            ("length_factor", self.length_factor),
            ("confidence_factor", self.confidence_factor),
            ("recency_factor", self.recency_factor),
        ]
        .into_iter()
    }
}

/// Per-axis scores kept for chunks produced by hybrid search
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HybridScores {
    pub semantic: f32,
    pub keyword: f32,
}

/// A chunk with its retrieval scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,

    /// 1 - vector distance, as returned by the index
    pub similarity_score: f32,

    /// Raw cross-encoder output, set once re-ranked
    pub rerank_score: Option<f32>,

    /// Final ordering key, always within [0, 1]
    pub combined_score: f32,

    pub ranking_factors: RankingFactors,

    pub hybrid: Option<HybridScores>,
}

impl ScoredChunk {
    /// Wrap a chunk whose combined score equals its similarity
    pub fn new(chunk: Chunk, similarity_score: f32) -> Self {
        Self {
            chunk,
            similarity_score,
            rerank_score: None,
            combined_score: clamp_unit(similarity_score),
            ranking_factors: RankingFactors::default(),
            hybrid: None,
        }
    }

    pub fn content(&self) -> &str {
        &self.chunk.content
    }
}

/// Stable descending sort on `combined_score`; ties keep their input order
pub fn sort_by_combined_desc(results: &mut [ScoredChunk]) {
    results.sort_by(|a, b| b.combined_score.total_cmp(&a.combined_score));
}
