use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a chunk, derived from its document and position
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkId(pub String);

impl ChunkId {
    /// Build the identifier of the `index`-th chunk of a document
    pub fn for_document(document_id: &str, index: usize) -> Self {
        Self(format!("{}_chunk_{}", document_id, index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Structural kind of a chunk, fixed when the chunk is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
    /// One question together with its answer
    QaPair,
    /// Free text produced by the recursive splitter
    Regular,
    /// Introductory section preceding the first Q&A delimiter
    Header,
    /// Bullet or numbered line found between Q&A pairs
    ListItem,
}

impl ChunkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkType::QaPair => "qa_pair",
            ChunkType::Regular => "regular",
            ChunkType::Header => "header",
            ChunkType::ListItem => "list_item",
        }
    }
}

impl fmt::Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse language guess from function-word frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "fr")]
    French,
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

/// Typed metadata attached to every chunk.
///
/// Built once by the chunker and passed by reference through indexing,
/// filtering and ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Structural kind
    pub chunk_type: ChunkType,

    /// Length in characters
    pub length: usize,

    /// Whitespace-separated word count
    pub word_count: usize,

    /// Contains a question mark or a question-pattern line
    pub has_questions: bool,

    /// Contains an answer-pattern line
    pub has_answers: bool,

    /// Content quality estimate in [0, 1]
    pub confidence_score: f32,

    /// Detected language
    pub language: Language,

    /// Owning document
    pub document_id: String,

    /// Position of the chunk within its document
    pub chunk_index: usize,

    /// Original file name, when known
    pub source_name: Option<String>,

    /// Document keywords used by keyword filters
    pub keywords: Vec<String>,
}

/// A retrievable span of document text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub content: String,
    pub metadata: ChunkMetadata,
}

/// Caller-supplied description of a document being chunked
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Unique document identifier
    pub document_id: String,

    /// Original file name
    pub source_name: Option<String>,

    /// Keywords attached to every chunk of the document
    pub keywords: Vec<String>,
}

impl DocumentMetadata {
    pub fn new(document_id: impl Into<String>) -> Self {
        Self { document_id: document_id.into(), ..Default::default() }
    }

    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = Some(name.into());
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_id_format() {
        assert_eq!(ChunkId::for_document("doc-7", 3).as_str(), "doc-7_chunk_3");
    }

    #[test]
    fn test_chunk_type_serializes_snake_case() {
        let json = serde_json::to_string(&ChunkType::QaPair).unwrap();
        assert_eq!(json, "\"qa_pair\"");
        let parsed: ChunkType = serde_json::from_str("\"list_item\"").unwrap();
        assert_eq!(parsed, ChunkType::ListItem);
    }

    #[test]
    fn test_language_codes() {
        assert_eq!(serde_json::to_string(&Language::French).unwrap(), "\"fr\"");
        assert_eq!(Language::default(), Language::Unknown);
    }
}
