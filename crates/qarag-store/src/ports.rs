use async_trait::async_trait;
use qarag_core::error::Result;
use qarag_core::models::{Chunk, MetadataFilter};

/// A raw nearest-neighbour result
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHit {
    /// Stored chunk (content and metadata)
    pub chunk: Chunk,

    /// Vector distance to the query; similarity is `1 - distance`
    pub distance: f32,
}

/// Port for an external nearest-neighbour index.
///
/// Filters are evaluated by the index itself, before the `k` cut, so
/// filtered queries keep their full recall budget.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Return up to `k` nearest chunks to `vector`, closest first
    async fn query(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<IndexHit>>;

    /// Metadata-only lookup, no vector involved
    async fn get(&self, filter: &MetadataFilter, limit: usize) -> Result<Vec<Chunk>>;

    /// Insert or replace chunks with their vectors; both slices are parallel
    async fn upsert(&self, chunks: &[Chunk], vectors: &[Vec<f32>]) -> Result<()>;

    /// Delete every chunk matching the filter and return how many were removed
    async fn delete(&self, filter: &MetadataFilter) -> Result<usize>;

    /// Number of stored chunks
    async fn count(&self) -> Result<usize>;

    /// All chunks of one document, in chunk order
    async fn document_chunks(&self, document_id: &str) -> Result<Vec<Chunk>> {
        let filter = MetadataFilter::new().with_document_ids([document_id]);
        let mut chunks = self.get(&filter, usize::MAX).await?;
        chunks.sort_by_key(|c| c.metadata.chunk_index);
        Ok(chunks)
    }
}
