use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use qarag_core::error::{QaragError, Result};
use qarag_core::models::{DocumentMetadata, IngestJob, JobId, JobState, MetadataFilter};
use qarag_core::{summarize_chunks, ChunkSummary, QaChunker};
use qarag_llm::EmbeddingGateway;
use qarag_store::ports::VectorIndex;
use tokio::sync::Notify;

/// Progress information for document indexing
#[derive(Debug, Clone)]
pub struct IndexProgress {
    pub phase: IndexPhase,
    pub current: usize,
    pub total: usize,
    pub message: String,
}

/// Current phase of document indexing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexPhase {
    Chunking,
    Embedding,
    Storing,
    Finalizing,
}

/// Result of indexing one document
#[derive(Debug, Clone)]
pub struct IndexReport {
    pub document_id: String,
    pub chunk_count: usize,
    pub summary: ChunkSummary,
}

/// Finished jobs kept for inspection before the oldest are evicted
pub const DEFAULT_JOB_RETENTION: usize = 100;

/// Chunks, embeds and stores documents, tracking background jobs
pub struct DocumentIndexer {
    chunker: QaChunker,
    gateway: EmbeddingGateway,
    index: Arc<dyn VectorIndex>,
    jobs: RwLock<HashMap<JobId, IngestJob>>,
    job_retention: usize,
    finished: Notify,
}

impl DocumentIndexer {
    /// Create a new document indexer
    pub fn new(chunker: QaChunker, gateway: EmbeddingGateway, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            chunker,
            gateway,
            index,
            jobs: RwLock::new(HashMap::new()),
            job_retention: DEFAULT_JOB_RETENTION,
            finished: Notify::new(),
        }
    }

    /// Keep at most `retention` finished jobs (at least one)
    pub fn with_job_retention(mut self, retention: usize) -> Self {
        self.job_retention = retention.max(1);
        self
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// Index a document
    pub async fn index_document(&self, text: &str, metadata: &DocumentMetadata) -> Result<IndexReport> {
        self.index_document_with_progress(text, metadata, |_| {}).await
    }

    /// Index a document with progress reporting
    ///
    /// This performs the following steps:
    /// 1. Chunk the text, preserving Q&A pairs
    /// 2. Embed every chunk through the gateway
    /// 3. Upsert chunks and vectors into the index
    pub async fn index_document_with_progress<F>(
        &self,
        text: &str,
        metadata: &DocumentMetadata,
        mut progress: F,
    ) -> Result<IndexReport>
    where
        F: FnMut(IndexProgress),
    {
        progress(IndexProgress {
            phase: IndexPhase::Chunking,
            current: 0,
            total: 3,
            message: format!("Chunking {}", metadata.document_id),
        });

        let chunks = self.chunker.chunk_document(text, metadata)?;
        let summary = summarize_chunks(&chunks);

        tracing::info!(
            document_id = %metadata.document_id,
            chunk_count = summary.total_chunks,
            qa_pairs = summary.qa_pairs,
            qa_coverage = summary.qa_coverage,
            "Document chunked"
        );

        progress(IndexProgress {
            phase: IndexPhase::Embedding,
            current: 1,
            total: 3,
            message: format!("Embedding {} chunks", chunks.len()),
        });

        let contents: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = self.gateway.embed_documents(&contents).await?;

        progress(IndexProgress {
            phase: IndexPhase::Storing,
            current: 2,
            total: 3,
            message: "Storing chunks".to_string(),
        });

        self.index.upsert(&chunks, &vectors).await?;

        progress(IndexProgress {
            phase: IndexPhase::Finalizing,
            current: 3,
            total: 3,
            message: "Indexing complete".to_string(),
        });

        Ok(IndexReport {
            document_id: metadata.document_id.clone(),
            chunk_count: chunks.len(),
            summary,
        })
    }

    /// Remove every chunk of a document
    pub async fn delete_document(&self, document_id: &str) -> Result<usize> {
        if document_id.trim().is_empty() {
            return Err(QaragError::validation("document_id", "document id must not be empty"));
        }
        let filter = MetadataFilter::new().with_document_ids([document_id]);
        let removed = self.index.delete(&filter).await?;
        tracing::info!(document_id, removed, "Document deleted from index");
        Ok(removed)
    }

    /// Replace a document's chunks with a fresh indexing of `text`
    pub async fn reindex_document(&self, text: &str, metadata: &DocumentMetadata) -> Result<IndexReport> {
        self.delete_document(&metadata.document_id).await?;
        self.index_document(text, metadata).await
    }

    /// Index in the background and return a job id to observe
    pub fn spawn_index(self: &Arc<Self>, text: String, metadata: DocumentMetadata) -> JobId {
        let job = IngestJob::pending(metadata.document_id.clone());
        let id = job.id;
        self.jobs_mut().insert(id, job);

        let worker_indexer = Arc::clone(self);
        let worker = tokio::spawn(async move {
            worker_indexer.set_state(id, JobState::Running);

            match worker_indexer.index_document(&text, &metadata).await {
                Ok(report) => JobState::Done { chunk_count: report.chunk_count },
                Err(e) => {
                    tracing::warn!(
                        job_id = %id,
                        document_id = %metadata.document_id,
                        error = %e,
                        "Indexing job failed"
                    );
                    JobState::Failed { reason: e.to_string() }
                }
            }
        });

        // Supervisor: a panicking worker still ends in a terminal state
        let indexer = Arc::clone(self);
        tokio::spawn(async move {
            let state = match worker.await {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!(job_id = %id, error = %e, "Indexing task aborted");
                    JobState::Failed { reason: format!("indexing task aborted: {}", e) }
                }
            };

            indexer.set_state(id, state);
            indexer.evict_finished();
            indexer.finished.notify_waiters();
        });

        id
    }

    pub fn job(&self, id: JobId) -> Option<IngestJob> {
        self.jobs.read().unwrap_or_else(|p| p.into_inner()).get(&id).cloned()
    }

    /// All known jobs, oldest first
    pub fn jobs(&self) -> Vec<IngestJob> {
        let mut jobs: Vec<IngestJob> =
            self.jobs.read().unwrap_or_else(|p| p.into_inner()).values().cloned().collect();
        jobs.sort_by_key(|j| j.created_at);
        jobs
    }

    /// Wait until a job reaches `done` or `failed`; `None` for unknown or evicted ids
    pub async fn wait(&self, id: JobId) -> Option<IngestJob> {
        loop {
            let notified = self.finished.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let job = self.job(id)?;
            if job.state.is_finished() {
                return Some(job);
            }
            notified.await;
        }
    }

    fn set_state(&self, id: JobId, state: JobState) {
        if let Some(job) = self.jobs_mut().get_mut(&id) {
            tracing::debug!(job_id = %id, state = ?state, "Job state changed");
            job.transition(state);
        }
    }

    /// Drop the oldest finished jobs beyond the retention count
    fn evict_finished(&self) {
        let mut jobs = self.jobs_mut();
        let mut finished: Vec<(JobId, _)> = jobs
            .values()
            .filter(|j| j.state.is_finished())
            .map(|j| (j.id, j.updated_at))
            .collect();
        if finished.len() <= self.job_retention {
            return;
        }

        finished.sort_by_key(|(_, updated_at)| *updated_at);
        let excess = finished.len() - self.job_retention;
        for (id, _) in finished.into_iter().take(excess) {
            jobs.remove(&id);
        }
        tracing::debug!(evicted = excess, retained = self.job_retention, "Evicted finished jobs");
    }

    fn jobs_mut(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<JobId, IngestJob>> {
        self.jobs.write().unwrap_or_else(|p| p.into_inner())
    }
}
