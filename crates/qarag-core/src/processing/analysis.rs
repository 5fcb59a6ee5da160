use std::collections::HashSet;

use super::text::char_len;
use super::{ChunkerConfig, ConfidenceWeights};
use crate::models::{clamp_unit, Language};

/// Guess the language from function-word hits in the lowercased text
pub fn detect_language(text: &str, config: &ChunkerConfig) -> Language {
    let lowered = text.to_lowercase();
    let hits = config
        .language_indicators
        .iter()
        .filter(|indicator| lowered.contains(indicator.as_str()))
        .count();

    if hits >= config.min_language_hits {
        Language::French
    } else {
        Language::Unknown
    }
}

/// Estimate content quality in [0, 1]
pub fn content_confidence(
    text: &str,
    has_questions: bool,
    has_answers: bool,
    min_chunk_size: usize,
    weights: &ConfidenceWeights,
) -> f32 {
    let mut score = weights.base;

    let length = char_len(text);
    if length > min_chunk_size * 2 {
        score += weights.long_content_bonus;
    } else if length < min_chunk_size {
        score -= weights.short_content_penalty;
    }

    if has_questions && has_answers {
        score += weights.complete_qa_bonus;
    } else if has_questions || has_answers {
        score += weights.partial_qa_bonus;
    }

    if text.contains(". ") {
        score += weights.sentence_bonus;
    }
    if text.matches('\n').count() > 1 {
        score += weights.structure_bonus;
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    let unique: HashSet<&str> = words.iter().copied().collect();
    if (unique.len() as f32) < words.len() as f32 * weights.repetition_ratio {
        score -= weights.repetition_penalty;
    }

    clamp_unit(score)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_french() {
        let config = ChunkerConfig::default();
        let text = "Le calcul de la masse et du poids que les patients connaissent";
        assert_eq!(detect_language(text, &config), Language::French);
        assert_eq!(detect_language("plain english words only", &config), Language::Unknown);
    }

    #[test]
    fn test_language_threshold_is_configurable() {
        let config = ChunkerConfig { min_language_hits: 1, ..Default::default() };
        assert_eq!(detect_language("le chat", &config), Language::French);
    }

    #[test]
    fn test_confidence_short_repetitive_text() {
        let weights = ConfidenceWeights::default();
        // 0.5 - 0.3 (short) - 0.2 (repetition)
        let score = content_confidence("spam spam spam spam", false, false, 100, &weights);
        assert!((score - 0.0).abs() < 1e-6);
    }

    #[test]
    fn test_confidence_rich_qa_text_is_clamped() {
        let weights = ConfidenceWeights::default();
        let text = format!(
            "Question about things?\nAnswer: {}. More text follows.\nTrailing line",
            (0..60).map(|i| format!("word{}", i)).collect::<Vec<_>>().join(" ")
        );
        // 0.5 + 0.2 + 0.3 + 0.1 + 0.1 = 1.2 -> 1.0
        assert_eq!(content_confidence(&text, true, true, 100, &weights), 1.0);
    }

    #[test]
    fn test_confidence_partial_qa() {
        let weights = ConfidenceWeights::default();
        let text = "one two three four five six seven eight nine ten eleven twelve";
        // length 62, between min and 2*min with min 50: base 0.5 + partial 0.1
        let score = content_confidence(text, true, false, 50, &weights);
        assert!((score - 0.6).abs() < 1e-6);
    }
}
