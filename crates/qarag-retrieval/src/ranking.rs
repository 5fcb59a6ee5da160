//! Multi-factor re-scoring of raw similarity results

use qarag_core::config::RankingConfig;
use qarag_core::models::{
    clamp_unit, sort_by_combined_desc, ChunkMetadata, ChunkType, RankingFactors, ScoredChunk,
};

/// Compute the structural adjustments for one chunk
pub fn compute_factors(metadata: &ChunkMetadata, config: &RankingConfig) -> RankingFactors {
    let qa_boost = if config.enable_qa_boost && metadata.chunk_type == ChunkType::QaPair {
        config.qa_boost
    } else {
        0.0
    };

    let qa_completeness = match (metadata.has_questions, metadata.has_answers) {
        (true, true) => config.complete_qa_bonus,
        (true, false) | (false, true) => config.partial_qa_bonus,
        (false, false) => 0.0,
    };

    let length_factor = if metadata.length < config.short_length_threshold {
        -config.short_length_penalty
    } else if (config.optimal_length_min..=config.optimal_length_max).contains(&metadata.length) {
        config.optimal_length_bonus
    } else {
        0.0
    };

    let confidence_factor = (metadata.confidence_score - 1.0) * config.confidence_weight;

    RankingFactors {
        qa_boost,
        qa_completeness,
        length_factor,
        confidence_factor,
        recency_factor: 0.0,
    }
}

/// Apply ranking factors to a single result
pub fn apply_factors(result: &mut ScoredChunk, config: &RankingConfig) {
    let factors = compute_factors(&result.chunk.metadata, config);
    result.combined_score = clamp_unit(result.similarity_score + factors.total());
    result.ranking_factors = factors;
}

/// Re-score, stable-sort descending and truncate to `k`
pub fn rank(mut results: Vec<ScoredChunk>, k: usize, config: &RankingConfig) -> Vec<ScoredChunk> {
    for result in &mut results {
        apply_factors(result, config);
    }
    sort_by_combined_desc(&mut results);
    results.truncate(k);
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use qarag_core::models::{Chunk, ChunkId, Language};

    fn metadata(chunk_type: ChunkType, length: usize, q: bool, a: bool, confidence: f32) -> ChunkMetadata {
        ChunkMetadata {
            chunk_type,
            length,
            word_count: length / 5,
            has_questions: q,
            has_answers: a,
            confidence_score: confidence,
            language: Language::Unknown,
            document_id: "doc".to_string(),
            chunk_index: 0,
            source_name: None,
            keywords: vec![],
        }
    }

    fn scored(id: &str, similarity: f32, metadata: ChunkMetadata) -> ScoredChunk {
        ScoredChunk::new(
            Chunk { id: ChunkId(id.to_string()), content: "x".repeat(metadata.length), metadata },
            similarity,
        )
    }

    #[test]
    fn test_complete_qa_pair_factors() {
        let config = RankingConfig::default();
        let factors = compute_factors(&metadata(ChunkType::QaPair, 800, true, true, 1.0), &config);

        assert_eq!(factors.qa_boost, 0.15);
        assert_eq!(factors.qa_completeness, 0.10);
        assert_eq!(factors.length_factor, 0.05);
        assert_eq!(factors.confidence_factor, 0.0);
        assert_eq!(factors.recency_factor, 0.0);
    }

    #[test]
    fn test_penalties() {
        let config = RankingConfig::default();
        let factors = compute_factors(&metadata(ChunkType::Regular, 60, false, true, 0.5), &config);

        assert_eq!(factors.qa_boost, 0.0);
        assert_eq!(factors.qa_completeness, 0.05);
        assert_eq!(factors.length_factor, -0.10);
        assert!((factors.confidence_factor + 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_boost_can_be_disabled() {
        let config = RankingConfig { enable_qa_boost: false, ..Default::default() };
        let factors = compute_factors(&metadata(ChunkType::QaPair, 300, false, false, 1.0), &config);
        assert_eq!(factors.qa_boost, 0.0);
        assert_eq!(factors.length_factor, 0.0);
    }

    #[test]
    fn test_rank_clamps_sorts_and_truncates() {
        let config = RankingConfig::default();
        let results = vec![
            scored("plain", 0.7, metadata(ChunkType::Regular, 300, false, false, 1.0)),
            scored("qa", 0.95, metadata(ChunkType::QaPair, 800, true, true, 1.0)),
            scored("short", 0.05, metadata(ChunkType::Regular, 20, false, false, 0.0)),
        ];

        let ranked = rank(results, 2, &config);

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].chunk.id.as_str(), "qa");
        assert_eq!(ranked[0].combined_score, 1.0);
        assert_eq!(ranked[1].chunk.id.as_str(), "plain");
        assert!((ranked[1].combined_score - 0.7).abs() < 1e-6);
    }

    fn ids(results: &[ScoredChunk]) -> Vec<&str> {
        results.iter().map(|r| r.chunk.id.as_str()).collect()
    }

    #[test]
    fn test_qa_boost_magnitude_decides_order() {
        let results = || {
            vec![
                scored("plain", 0.6, metadata(ChunkType::Regular, 300, false, false, 1.0)),
                scored("qa", 0.5, metadata(ChunkType::QaPair, 300, false, false, 1.0)),
            ]
        };

        let boosted = rank(results(), 2, &RankingConfig::default());
        assert_eq!(ids(&boosted), vec!["qa", "plain"]);
        assert!((boosted[0].combined_score - 0.65).abs() < 1e-6);

        let weak = RankingConfig { qa_boost: 0.05, ..Default::default() };
        let ranked = rank(results(), 2, &weak);
        assert_eq!(ids(&ranked), vec!["plain", "qa"]);
        assert!((ranked[1].combined_score - 0.55).abs() < 1e-6);
    }

    #[test]
    fn test_completeness_bonus_magnitude_decides_order() {
        let results = || {
            vec![
                scored("plain", 0.6, metadata(ChunkType::Regular, 300, false, false, 1.0)),
                scored("complete", 0.5, metadata(ChunkType::Regular, 300, true, true, 1.0)),
            ]
        };

        let strong = RankingConfig { complete_qa_bonus: 0.2, ..Default::default() };
        assert_eq!(ids(&rank(results(), 2, &strong)), vec!["complete", "plain"]);

        let none = RankingConfig { complete_qa_bonus: 0.0, ..Default::default() };
        assert_eq!(ids(&rank(results(), 2, &none)), vec!["plain", "complete"]);
    }

    #[test]
    fn test_length_band_is_configurable() {
        let config = RankingConfig {
            optimal_length_min: 200,
            optimal_length_max: 400,
            optimal_length_bonus: 0.2,
            short_length_threshold: 150,
            short_length_penalty: 0.3,
            ..Default::default()
        };

        let in_band = compute_factors(&metadata(ChunkType::Regular, 300, false, false, 1.0), &config);
        assert_eq!(in_band.length_factor, 0.2);

        let short = compute_factors(&metadata(ChunkType::Regular, 120, false, false, 1.0), &config);
        assert_eq!(short.length_factor, -0.3);

        let results = vec![
            scored("long", 0.6, metadata(ChunkType::Regular, 800, false, false, 1.0)),
            scored("banded", 0.5, metadata(ChunkType::Regular, 300, false, false, 1.0)),
        ];
        assert_eq!(ids(&rank(results, 2, &config)), vec!["banded", "long"]);
    }

    #[test]
    fn test_rank_never_goes_negative() {
        let config = RankingConfig::default();
        let results =
            vec![scored("short", 0.05, metadata(ChunkType::Regular, 20, false, false, 0.0))];
        let ranked = rank(results, 5, &config);
        assert_eq!(ranked[0].combined_score, 0.0);
    }
}
