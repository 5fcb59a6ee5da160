//! QARAG Retrieval - Ranking, search and adaptive retrieval
//!
//! This crate implements the retrieval use cases: multi-factor ranking over
//! vector results, hybrid search, cross-encoder re-ranking, adaptive strategy
//! selection, retrieval metrics and document indexing.

pub mod index;
pub mod metrics;
pub mod pipeline;
pub mod ranking;
pub mod rerank;
pub mod search;

pub use index::{DocumentIndexer, IndexPhase, IndexProgress, IndexReport};
pub use metrics::{
    MetricsExport, MetricsRecorder, PerformanceMetrics, QualityMetrics, RetrievalMetricsRecord,
};
pub use pipeline::{apply_quality_filters, select_strategy, AdaptiveRetrieval, Retriever};
pub use rerank::Reranker;
pub use search::VectorSearch;
