pub mod analysis;
pub mod overlap;
pub mod patterns;
pub mod splitter;
pub mod text;

use crate::error::{QaragError, Result};
use crate::models::{Chunk, ChunkId, ChunkMetadata, ChunkType, DocumentMetadata};
use serde::{Deserialize, Serialize};

pub use patterns::{QaPatterns, DEFAULT_ANSWER_PATTERNS, DEFAULT_QUESTION_PATTERNS};
pub use splitter::{RecursiveSplitter, DEFAULT_SEPARATORS};

use text::char_len;

/// Weights of the content-confidence heuristic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceWeights {
    pub base: f32,
    /// Added when longer than twice the minimum chunk size
    pub long_content_bonus: f32,
    /// Subtracted when shorter than the minimum chunk size
    pub short_content_penalty: f32,
    pub complete_qa_bonus: f32,
    pub partial_qa_bonus: f32,
    pub sentence_bonus: f32,
    pub structure_bonus: f32,
    pub repetition_penalty: f32,
    /// Unique-word ratio below which the repetition penalty applies
    pub repetition_ratio: f32,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            base: 0.5,
            long_content_bonus: 0.2,
            short_content_penalty: 0.3,
            complete_qa_bonus: 0.3,
            partial_qa_bonus: 0.1,
            sentence_bonus: 0.1,
            structure_bonus: 0.1,
            repetition_penalty: 0.2,
            repetition_ratio: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Target chunk size in characters for the recursive splitter
    pub chunk_size: usize,

    /// Splitter overlap in characters
    pub chunk_overlap: usize,

    /// Non-Q&A chunks shorter than this are discarded
    pub min_chunk_size: usize,

    /// Hard cap applied after semantic overlap
    pub max_chunk_size: usize,

    /// Fraction of each neighbour borrowed by the overlap pass
    pub semantic_overlap_ratio: f32,

    /// Chunks beyond this count are dropped with a warning
    pub max_chunks_per_document: usize,

    /// Unpaired lines inside Q&A sections must be longer than this
    pub standalone_min_chars: usize,

    /// Explicit Q&A section delimiter
    pub qa_delimiter: String,

    /// Question lines needed to treat undelimited text as Q&A
    pub min_question_lines: usize,

    /// Answer lines needed to treat undelimited text as Q&A
    pub min_answer_lines: usize,

    pub question_patterns: Vec<String>,
    pub answer_patterns: Vec<String>,

    /// Splitter separators, coarsest first
    pub separators: Vec<String>,

    /// Function words counted by the language heuristic
    pub language_indicators: Vec<String>,
    pub min_language_hits: usize,

    pub confidence: ConfidenceWeights,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 4000,
            chunk_overlap: 800,
            min_chunk_size: 100,
            max_chunk_size: 6000,
            semantic_overlap_ratio: 0.15,
            max_chunks_per_document: 100,
            standalone_min_chars: 50,
            qa_delimiter: "---QA---".to_string(),
            min_question_lines: 2,
            min_answer_lines: 2,
            question_patterns: DEFAULT_QUESTION_PATTERNS.iter().map(|s| s.to_string()).collect(),
            answer_patterns: DEFAULT_ANSWER_PATTERNS.iter().map(|s| s.to_string()).collect(),
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
            language_indicators: ["le ", "la ", "les ", "de ", "du ", "des ", "et ", "ou ", "que ", "qui "]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            min_language_hits: 3,
            confidence: ConfidenceWeights::default(),
        }
    }
}

impl ChunkerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(invalid("chunk_size", "chunk_size must be greater than 0".to_string()));
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err(invalid(
                "chunk_overlap",
                format!(
                    "chunk_overlap ({}) must be less than chunk_size ({})",
                    self.chunk_overlap, self.chunk_size
                ),
            ));
        }

        if self.min_chunk_size > self.max_chunk_size {
            return Err(invalid(
                "min_chunk_size",
                format!(
                    "min_chunk_size ({}) cannot be greater than max_chunk_size ({})",
                    self.min_chunk_size, self.max_chunk_size
                ),
            ));
        }

        if !(0.0..1.0).contains(&self.semantic_overlap_ratio) {
            return Err(invalid(
                "semantic_overlap_ratio",
                format!("{} is outside [0, 1)", self.semantic_overlap_ratio),
            ));
        }

        if self.max_chunks_per_document == 0 {
            return Err(invalid(
                "max_chunks_per_document",
                "max_chunks_per_document must be greater than 0".to_string(),
            ));
        }

        if self.qa_delimiter.trim().is_empty() {
            return Err(invalid("qa_delimiter", "qa_delimiter must not be blank".to_string()));
        }

        Ok(())
    }
}

fn invalid(key: &str, reason: String) -> QaragError {
    QaragError::ConfigInvalid { key: key.to_string(), reason }
}

/// A chunk body and type before metadata is computed
#[derive(Debug)]
struct Draft {
    text: String,
    chunk_type: ChunkType,
}

impl Draft {
    fn new(text: impl Into<String>, chunk_type: ChunkType) -> Self {
        Self { text: text.into(), chunk_type }
    }
}

/// Splits documents into retrievable chunks, keeping question/answer pairs
/// together when the text is Q&A-structured
#[derive(Debug, Clone)]
pub struct QaChunker {
    config: ChunkerConfig,
    patterns: QaPatterns,
    splitter: RecursiveSplitter,
}

impl QaChunker {
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        config.validate()?;
        let patterns = QaPatterns::new(&config.question_patterns, &config.answer_patterns)?;
        let splitter =
            RecursiveSplitter::new(config.separators.clone(), config.chunk_size, config.chunk_overlap);
        Ok(Self { config, patterns, splitter })
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Whether the text carries the Q&A delimiter or enough question and
    /// answer lines
    pub fn is_qa_format(&self, text: &str) -> bool {
        if text.contains(self.config.qa_delimiter.as_str()) {
            return true;
        }
        let (questions, answers) = self.patterns.count_lines(text);
        questions >= self.config.min_question_lines && answers >= self.config.min_answer_lines
    }

    /// Chunk a document.
    ///
    /// # Errors
    ///
    /// Returns `DocumentProcessing` when the text is empty or blank.
    pub fn chunk_document(&self, text: &str, document: &DocumentMetadata) -> Result<Vec<Chunk>> {
        if text.trim().is_empty() {
            return Err(QaragError::DocumentProcessing {
                document_id: document.document_id.clone(),
                reason: "Document contains no text content".to_string(),
            });
        }

        let qa_format = self.is_qa_format(text);
        let drafts = if qa_format {
            self.chunk_qa_content(text)
        } else {
            self.chunk_regular_content(text)
        };

        let produced = drafts.len();
        let mut drafts: Vec<Draft> = drafts
            .into_iter()
            .filter(|d| {
                d.chunk_type == ChunkType::QaPair
                    || char_len(d.text.trim()) >= self.config.min_chunk_size
            })
            .collect();

        if drafts.len() > self.config.max_chunks_per_document {
            tracing::warn!(
                document_id = %document.document_id,
                chunk_count = drafts.len(),
                max_chunks = self.config.max_chunks_per_document,
                "Document produced too many chunks, truncating"
            );
            drafts.truncate(self.config.max_chunks_per_document);
        }

        let chunks: Vec<Chunk> = drafts
            .into_iter()
            .enumerate()
            .map(|(index, draft)| self.build_chunk(draft, index, document))
            .collect();

        tracing::debug!(
            document_id = %document.document_id,
            qa_format,
            produced,
            chunk_count = chunks.len(),
            "Chunked document"
        );

        Ok(chunks)
    }

    fn chunk_qa_content(&self, text: &str) -> Vec<Draft> {
        let delimiter = self.config.qa_delimiter.as_str();
        if !text.contains(delimiter) {
            return self.extract_qa_pairs(text);
        }

        let mut drafts = Vec::new();
        for (i, section) in text.split(delimiter).enumerate() {
            let section = section.trim();
            if section.is_empty() {
                continue;
            }

            if i == 0 {
                if char_len(section) <= self.config.chunk_size {
                    drafts.push(Draft::new(section, ChunkType::Header));
                } else {
                    drafts.extend(
                        self.splitter
                            .split(section)
                            .into_iter()
                            .map(|t| Draft::new(t, ChunkType::Regular)),
                    );
                }
            } else {
                drafts.extend(self.extract_qa_pairs(section));
            }
        }
        drafts
    }

    /// Line scan that pairs each question with the lines answering it
    fn extract_qa_pairs(&self, text: &str) -> Vec<Draft> {
        let mut drafts = Vec::new();
        let mut question: Option<&str> = None;
        let mut answer: Vec<&str> = Vec::new();

        for line in patterns::trimmed_lines(text) {
            if self.patterns.is_question_line(line) {
                if let Some(q) = question.take() {
                    push_pair(&mut drafts, q, &answer);
                }
                question = Some(line);
                answer.clear();
            } else if question.is_some() || self.patterns.is_answer_line(line) {
                // An answer with no open question is held and discarded by the next question
                answer.push(line);
            } else if char_len(line) > self.config.standalone_min_chars {
                let chunk_type = if self.patterns.is_list_item(line) {
                    ChunkType::ListItem
                } else {
                    ChunkType::Regular
                };
                drafts.push(Draft::new(line, chunk_type));
            }
        }

        if let Some(q) = question {
            push_pair(&mut drafts, q, &answer);
        }

        drafts
    }

    fn chunk_regular_content(&self, text: &str) -> Vec<Draft> {
        let pieces = self.splitter.split(text);
        overlap::apply_semantic_overlap(
            &pieces,
            self.config.semantic_overlap_ratio,
            self.config.max_chunk_size,
        )
        .into_iter()
        .map(|t| Draft::new(t, ChunkType::Regular))
        .collect()
    }

    fn build_chunk(&self, draft: Draft, index: usize, document: &DocumentMetadata) -> Chunk {
        let content = draft.text.trim().to_string();
        let has_questions = self.patterns.has_questions(&content);
        let has_answers = self.patterns.has_answers(&content);
        let confidence_score = analysis::content_confidence(
            &content,
            has_questions,
            has_answers,
            self.config.min_chunk_size,
            &self.config.confidence,
        );

        let metadata = ChunkMetadata {
            chunk_type: draft.chunk_type,
            length: char_len(&content),
            word_count: content.split_whitespace().count(),
            has_questions,
            has_answers,
            confidence_score,
            language: analysis::detect_language(&content, &self.config),
            document_id: document.document_id.clone(),
            chunk_index: index,
            source_name: document.source_name.clone(),
            keywords: document.keywords.clone(),
        };

        Chunk { id: ChunkId::for_document(&document.document_id, index), content, metadata }
    }
}

/// Emit a pair only when the question received an answer
fn push_pair(drafts: &mut Vec<Draft>, question: &str, answer: &[&str]) {
    if answer.is_empty() {
        return;
    }
    drafts.push(Draft::new(format!("{}\n{}", question, answer.join(" ")), ChunkType::QaPair));
}

/// Aggregate statistics over a chunked document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkSummary {
    pub total_chunks: usize,
    pub qa_pairs: usize,
    pub regular_chunks: usize,
    pub header_chunks: usize,
    pub list_items: usize,
    pub total_length: usize,
    pub average_length: f64,
    pub chunks_with_questions: usize,
    pub chunks_with_answers: usize,
    /// Percentage of chunks that are Q&A pairs
    pub qa_coverage: f64,
}

pub fn summarize_chunks(chunks: &[Chunk]) -> ChunkSummary {
    if chunks.is_empty() {
        return ChunkSummary::default();
    }

    let count = |t: ChunkType| chunks.iter().filter(|c| c.metadata.chunk_type == t).count();
    let total_chunks = chunks.len();
    let qa_pairs = count(ChunkType::QaPair);
    let total_length: usize = chunks.iter().map(|c| c.metadata.length).sum();

    ChunkSummary {
        total_chunks,
        qa_pairs,
        regular_chunks: count(ChunkType::Regular),
        header_chunks: count(ChunkType::Header),
        list_items: count(ChunkType::ListItem),
        total_length,
        average_length: round2(total_length as f64 / total_chunks as f64),
        chunks_with_questions: chunks.iter().filter(|c| c.metadata.has_questions).count(),
        chunks_with_answers: chunks.iter().filter(|c| c.metadata.has_answers).count(),
        qa_coverage: round2(qa_pairs as f64 / total_chunks as f64 * 100.0),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker() -> QaChunker {
        QaChunker::new(ChunkerConfig::default()).unwrap()
    }

    fn doc() -> DocumentMetadata {
        DocumentMetadata::new("doc-1").with_source_name("faq.txt").with_keywords(["imc"])
    }

    #[test]
    fn test_delimited_single_pair() {
        let chunks = chunker().chunk_document("---QA---\nQ: What is X?\nR: X is Y.", &doc()).unwrap();

        assert_eq!(chunks.len(), 1);
        let chunk = &chunks[0];
        assert_eq!(chunk.metadata.chunk_type, ChunkType::QaPair);
        assert_eq!(chunk.content, "Q: What is X?\nR: X is Y.");
        assert!(chunk.metadata.has_questions);
        assert!(chunk.metadata.has_answers);
        assert_eq!(chunk.id.as_str(), "doc-1_chunk_0");
        assert_eq!(chunk.metadata.keywords, vec!["imc".to_string()]);
        assert_eq!(chunk.metadata.source_name.as_deref(), Some("faq.txt"));
    }

    #[test]
    fn test_orphan_answer_line_is_not_a_standalone_chunk() {
        let config = ChunkerConfig { min_chunk_size: 1, ..Default::default() };
        let text = "---QA---\nR: this answer line has no question before it and runs well past fifty characters\nQ: What is X?\nR: X is Y.";
        let chunks = QaChunker::new(config).unwrap().chunk_document(text, &doc()).unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].metadata.chunk_type, ChunkType::QaPair);
        assert_eq!(chunks[0].content, "Q: What is X?\nR: X is Y.");
    }

    #[test]
    fn test_empty_text_is_rejected() {
        let err = chunker().chunk_document("  \n\t ", &doc()).unwrap_err();
        match err {
            QaragError::DocumentProcessing { document_id, reason } => {
                assert_eq!(document_id, "doc-1");
                assert_eq!(reason, "Document contains no text content");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_undelimited_qa_detection() {
        let text = "Q: First question?\nR: First answer.\nQ: Second question?\nR: Second answer.";
        let c = chunker();
        assert!(c.is_qa_format(text));

        let chunks = c.chunk_document(text, &doc()).unwrap();
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.metadata.chunk_type == ChunkType::QaPair));
        assert_eq!(chunks[1].content, "Q: Second question?\nR: Second answer.");
        assert_eq!(chunks[1].metadata.chunk_index, 1);
    }

    #[test]
    fn test_detection_thresholds_are_configurable() {
        let text = "Q: Only question?\nR: Only answer.";
        assert!(!chunker().is_qa_format(text));

        let relaxed = QaChunker::new(ChunkerConfig {
            min_question_lines: 1,
            min_answer_lines: 1,
            ..Default::default()
        })
        .unwrap();
        assert!(relaxed.is_qa_format(text));
    }

    #[test]
    fn test_answer_continuation_lines_join() {
        let text = "---QA---\nQ: How is BMI computed?\nR: Divide the weight\nby the squared height.";
        let chunks = chunker().chunk_document(text, &doc()).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(
            chunks[0].content,
            "Q: How is BMI computed?\nR: Divide the weight by the squared height."
        );
    }

    #[test]
    fn test_header_section_kept_when_long_enough() {
        let intro = "This guide collects the questions patients ask most often about body mass index and weight.";
        let intro = format!("{} {}", intro, intro);
        let text = format!("{}\n---QA---\nQ: What?\nR: That.", intro);

        let chunks = chunker().chunk_document(&text, &doc()).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].metadata.chunk_type, ChunkType::Header);
        assert_eq!(chunks[1].metadata.chunk_type, ChunkType::QaPair);
    }

    #[test]
    fn test_short_non_qa_chunks_are_discarded() {
        let text = "Tiny intro\n---QA---\nQ: What?\nR: That.";
        let chunks = chunker().chunk_document(text, &doc()).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].metadata.chunk_type, ChunkType::QaPair);
    }

    #[test]
    fn test_question_without_answer_is_dropped() {
        let text = "---QA---\nQ: Lonely question?\nQ: Answered one?\nR: Yes.";
        let chunks = chunker().chunk_document(text, &doc()).unwrap();
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].content.starts_with("Q: Answered one?"));
    }

    #[test]
    fn test_standalone_list_item() {
        let item = "- Always measure your weight in the morning before breakfast, on the same scale.";
        let config = ChunkerConfig { min_chunk_size: 10, ..Default::default() };
        let text = format!("---QA---\n{}\nQ: Why?\nR: Consistency.", item);

        let chunks = QaChunker::new(config).unwrap().chunk_document(&text, &doc()).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].metadata.chunk_type, ChunkType::ListItem);
        assert_eq!(chunks[0].content, item);
    }

    #[test]
    fn test_regular_text_with_overlap() {
        let sentence = "Body mass index is a simple measure computed from weight and height. ";
        let text = sentence.repeat(20);
        let config = ChunkerConfig {
            chunk_size: 300,
            chunk_overlap: 50,
            max_chunk_size: 450,
            ..Default::default()
        };

        let chunks = QaChunker::new(config).unwrap().chunk_document(&text, &doc()).unwrap();
        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.metadata.chunk_type, ChunkType::Regular);
            assert_eq!(chunk.metadata.chunk_index, i);
            assert!(chunk.metadata.length <= 450);
            assert!(chunk.metadata.length >= 100);
            assert!((0.0..=1.0).contains(&chunk.metadata.confidence_score));
        }
    }

    #[test]
    fn test_max_chunks_truncation() {
        let config = ChunkerConfig { max_chunks_per_document: 2, ..Default::default() };
        let text = (1..=5)
            .map(|i| format!("Q: Question number {}?\nR: Answer number {}.", i, i))
            .collect::<Vec<_>>()
            .join("\n");

        let chunks = QaChunker::new(config).unwrap().chunk_document(&text, &doc()).unwrap();
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ChunkerConfig { chunk_overlap: 4000, ..Default::default() };
        assert!(matches!(QaChunker::new(config), Err(QaragError::ConfigInvalid { .. })));

        let config = ChunkerConfig { min_chunk_size: 7000, ..Default::default() };
        assert!(QaChunker::new(config).is_err());
    }

    #[test]
    fn test_summary() {
        let text = "---QA---\nQ: One?\nR: Yes.\nQ: Two?\nR: No.";
        let chunks = chunker().chunk_document(text, &doc()).unwrap();
        let summary = summarize_chunks(&chunks);

        assert_eq!(summary.total_chunks, 2);
        assert_eq!(summary.qa_pairs, 2);
        assert_eq!(summary.qa_coverage, 100.0);
        assert_eq!(summary.chunks_with_answers, 2);
        assert_eq!(summarize_chunks(&[]), ChunkSummary::default());
    }
}
