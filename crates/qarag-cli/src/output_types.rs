use qarag_core::models::{Chunk, ChunkType, RetrievalStrategy, ScoredChunk};
use qarag_core::ChunkSummary;
use qarag_retrieval::MetricsExport;
use serde::Serialize;

/// Output for chunk command
#[derive(Debug, Serialize)]
pub struct ChunkOutput {
    pub document_id: String,
    pub summary: ChunkSummary,
    pub chunks: Vec<ChunkItem>,
}

#[derive(Debug, Serialize)]
pub struct ChunkItem {
    pub id: String,
    pub chunk_type: ChunkType,
    pub length: usize,
    pub word_count: usize,
    pub confidence_score: f32,
    pub content: String,
}

impl From<&Chunk> for ChunkItem {
    fn from(chunk: &Chunk) -> Self {
        Self {
            id: chunk.id.to_string(),
            chunk_type: chunk.metadata.chunk_type,
            length: chunk.metadata.length,
            word_count: chunk.metadata.word_count,
            confidence_score: chunk.metadata.confidence_score,
            content: chunk.content.clone(),
        }
    }
}

/// Output for query command
#[derive(Debug, Serialize)]
pub struct QueryOutput {
    pub query: String,
    pub strategy: RetrievalStrategy,
    pub top_score: Option<f32>,
    pub reranked: bool,
    pub indexed_chunks: usize,
    pub results: Vec<QueryResultItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsExport>,
}

#[derive(Debug, Serialize)]
pub struct QueryResultItem {
    pub chunk_id: String,
    pub document_id: String,
    pub source: Option<String>,
    pub chunk_type: ChunkType,
    pub similarity_score: f32,
    pub rerank_score: Option<f32>,
    pub combined_score: f32,
    pub content: String,
}

impl From<&ScoredChunk> for QueryResultItem {
    fn from(result: &ScoredChunk) -> Self {
        let metadata = &result.chunk.metadata;
        Self {
            chunk_id: result.chunk.id.to_string(),
            document_id: metadata.document_id.clone(),
            source: metadata.source_name.clone(),
            chunk_type: metadata.chunk_type,
            similarity_score: result.similarity_score,
            rerank_score: result.rerank_score,
            combined_score: result.combined_score,
            content: result.chunk.content.clone(),
        }
    }
}

/// Output for config command
#[derive(Debug, Serialize)]
pub struct ConfigOutput {
    pub values: Vec<ConfigEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
    pub source: String,
}
