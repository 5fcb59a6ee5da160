pub mod chunk;
pub mod job;
pub mod query;
pub mod scored;

pub use chunk::{Chunk, ChunkId, ChunkMetadata, ChunkType, DocumentMetadata, Language};
pub use job::{IngestJob, JobId, JobState};
pub use query::{MetadataFilter, RetrievalQuery, RetrievalStrategy, SearchMode};
pub use scored::{
    clamp_unit, sort_by_combined_desc, HybridScores, RankingFactors, ScoredChunk,
    MISSING_AXIS_SCORE,
};
