//! QARAG LLM - Embedding and scoring ports
//!
//! This crate defines the ports for embedding and cross-encoder scoring,
//! the batching gateway in front of the embedding provider, and adapter
//! implementations.

pub mod gateway;
pub mod ollama;
pub mod pooled;
pub mod ports;

// Re-export main types
pub use gateway::{clean_text, normalize_query, EmbeddingGateway};
pub use ollama::OllamaEmbedder;
pub use pooled::{term_overlap_scorer, BlockingScorer};
pub use ports::{CrossEncoderScorer, EmbeddingProvider};
