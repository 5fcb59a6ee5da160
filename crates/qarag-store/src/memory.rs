//! In-memory vector index for development and testing.
//!
//! A poisoned lock only means another thread panicked mid-operation; the
//! map itself is still consistent, so the guard is recovered and used.

use async_trait::async_trait;
use qarag_core::error::{QaragError, Result};
use qarag_core::models::{Chunk, ChunkId, MetadataFilter};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::ports::{IndexHit, VectorIndex};

#[derive(Debug, Clone)]
struct Entry {
    /// Insertion sequence, used to break distance ties deterministically
    seq: u64,
    chunk: Chunk,
    vector: Vec<f32>,
}

#[derive(Debug, Default)]
struct State {
    entries: HashMap<ChunkId, Entry>,
    next_seq: u64,
    dimensions: Option<usize>,
}

/// In-memory implementation of VectorIndex using cosine distance
#[derive(Debug, Clone, Default)]
pub struct MemoryVectorIndex {
    state: Arc<RwLock<State>>,
}

impl MemoryVectorIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Dimensionality fixed by the first upsert
    pub fn dimensions(&self) -> Option<usize> {
        self.read().dimensions
    }

    /// Calculate cosine similarity between two vectors
    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot_product / (norm_a * norm_b)
    }

    fn matching<'a>(
        state: &'a State,
        filter: Option<&'a MetadataFilter>,
    ) -> impl Iterator<Item = &'a Entry> + 'a {
        state
            .entries
            .values()
            .filter(move |entry| filter.map_or(true, |f| f.matches(&entry.chunk.metadata)))
    }
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    async fn query(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<IndexHit>> {
        let state = self.read();

        if let Some(dims) = state.dimensions {
            if vector.len() != dims {
                return Err(QaragError::index(format!(
                    "query vector has {} dimensions, index expects {}",
                    vector.len(),
                    dims
                )));
            }
        }

        let mut scored: Vec<(u64, IndexHit)> = Self::matching(&state, filter)
            .map(|entry| {
                let distance = 1.0 - Self::cosine_similarity(vector, &entry.vector);
                (entry.seq, IndexHit { chunk: entry.chunk.clone(), distance })
            })
            .collect();

        scored.sort_by(|(seq_a, a), (seq_b, b)| {
            a.distance.total_cmp(&b.distance).then(seq_a.cmp(seq_b))
        });
        scored.truncate(k);

        Ok(scored.into_iter().map(|(_, hit)| hit).collect())
    }

    async fn get(&self, filter: &MetadataFilter, limit: usize) -> Result<Vec<Chunk>> {
        let state = self.read();

        let mut entries: Vec<&Entry> = Self::matching(&state, Some(filter)).collect();
        entries.sort_by_key(|entry| entry.seq);

        Ok(entries.into_iter().take(limit).map(|entry| entry.chunk.clone()).collect())
    }

    async fn upsert(&self, chunks: &[Chunk], vectors: &[Vec<f32>]) -> Result<()> {
        if chunks.len() != vectors.len() {
            return Err(QaragError::index(format!(
                "{} chunks but {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }

        let mut state = self.write();

        let expected = state.dimensions.or_else(|| vectors.first().map(Vec::len));
        if let Some(dims) = expected {
            if let Some(bad) = vectors.iter().find(|v| v.len() != dims) {
                return Err(QaragError::index(format!(
                    "vector has {} dimensions, index expects {}",
                    bad.len(),
                    dims
                )));
            }
        }
        state.dimensions = expected;

        for (chunk, vector) in chunks.iter().zip(vectors) {
            let seq = match state.entries.get(&chunk.id) {
                Some(existing) => existing.seq,
                None => {
                    state.next_seq += 1;
                    state.next_seq
                }
            };
            state.entries.insert(
                chunk.id.clone(),
                Entry { seq, chunk: chunk.clone(), vector: vector.clone() },
            );
        }

        tracing::debug!(upserted = chunks.len(), total = state.entries.len(), "Upserted chunks");
        Ok(())
    }

    async fn delete(&self, filter: &MetadataFilter) -> Result<usize> {
        if filter.is_empty() {
            return Err(QaragError::validation("filter", "refusing to delete with an empty filter"));
        }

        let mut state = self.write();
        let before = state.entries.len();
        state.entries.retain(|_, entry| !filter.matches(&entry.chunk.metadata));
        let removed = before - state.entries.len();

        if state.entries.is_empty() {
            state.dimensions = None;
        }

        Ok(removed)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.read().entries.len())
    }
}
