use serde::{Deserialize, Serialize};
use std::fmt;

use super::{ChunkMetadata, ChunkType};
use crate::error::{QaragError, Result};

/// How candidates are gathered before ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Vector similarity only
    #[default]
    Semantic,
    /// Weighted merge of vector and keyword lookups
    Hybrid,
}

/// How assertively a caller should answer, chosen from the top score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalStrategy {
    Direct,
    Rag,
    Fallback,
    NoAnswer,
}

impl RetrievalStrategy {
    pub const ALL: [RetrievalStrategy; 4] = [
        RetrievalStrategy::Direct,
        RetrievalStrategy::Rag,
        RetrievalStrategy::Fallback,
        RetrievalStrategy::NoAnswer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RetrievalStrategy::Direct => "direct",
            RetrievalStrategy::Rag => "rag",
            RetrievalStrategy::Fallback => "fallback",
            RetrievalStrategy::NoAnswer => "no_answer",
        }
    }
}

impl fmt::Display for RetrievalStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata pre-filter pushed down to the vector index.
///
/// Empty criteria match everything. Keyword matching is any-of,
/// case-insensitive containment against the chunk's document keywords.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataFilter {
    pub keywords: Vec<String>,
    pub document_ids: Vec<String>,
    pub chunk_type: Option<ChunkType>,
}

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords.extend(keywords.into_iter().map(Into::into));
        self
    }

    pub fn with_document_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.document_ids.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn with_chunk_type(mut self, chunk_type: ChunkType) -> Self {
        self.chunk_type = Some(chunk_type);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty() && self.document_ids.is_empty() && self.chunk_type.is_none()
    }

    /// Reject blank keyword or document entries
    pub fn validate(&self) -> Result<()> {
        if self.keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(QaragError::validation("keywords", "keyword filter entries must not be blank"));
        }
        if self.document_ids.iter().any(|d| d.trim().is_empty()) {
            return Err(QaragError::validation(
                "document_ids",
                "document filter entries must not be blank",
            ));
        }
        Ok(())
    }

    /// Check whether chunk metadata satisfies every criterion
    pub fn matches(&self, metadata: &ChunkMetadata) -> bool {
        if let Some(chunk_type) = self.chunk_type {
            if metadata.chunk_type != chunk_type {
                return false;
            }
        }

        if !self.document_ids.is_empty()
            && !self.document_ids.iter().any(|id| id == &metadata.document_id)
        {
            return false;
        }

        if !self.keywords.is_empty() {
            let wanted: Vec<String> = self.keywords.iter().map(|k| k.to_lowercase()).collect();
            let found = metadata.keywords.iter().any(|have| {
                let have = have.to_lowercase();
                wanted.iter().any(|w| have.contains(w.as_str()))
            });
            if !found {
                return false;
            }
        }

        true
    }
}

/// A retrieval request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalQuery {
    /// Query text
    pub text: String,

    /// Number of results requested
    pub k: usize,

    /// Metadata pre-filter
    pub filter: MetadataFilter,

    /// Whether to run the cross-encoder pass
    pub use_reranking: bool,

    /// Candidate gathering mode
    pub mode: SearchMode,
}

impl RetrievalQuery {
    pub fn new(text: impl Into<String>, k: usize) -> Self {
        Self {
            text: text.into(),
            k,
            filter: MetadataFilter::default(),
            use_reranking: true,
            mode: SearchMode::Semantic,
        }
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter = self.filter.with_keywords(keywords);
        self
    }

    pub fn with_documents<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter = self.filter.with_document_ids(ids);
        self
    }

    pub fn with_filter(mut self, filter: MetadataFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_reranking(mut self, enabled: bool) -> Self {
        self.use_reranking = enabled;
        self
    }

    pub fn with_mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Validate the request before any I/O is attempted
    pub fn validate(&self, max_k: usize) -> Result<()> {
        if self.text.trim().is_empty() {
            return Err(QaragError::validation("query", "query text must not be empty"));
        }
        if self.k == 0 {
            return Err(QaragError::validation("k", "k must be at least 1"));
        }
        if self.k > max_k {
            return Err(QaragError::validation(
                "k",
                format!("k ({}) exceeds the maximum of {}", self.k, max_k),
            ));
        }
        self.filter.validate()
    }
}
