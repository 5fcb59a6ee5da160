//! QARAG Core - Domain models, chunking, configuration and retry policy
//!
//! This crate contains the QA-aware chunker and the types shared by the
//! index, provider and retrieval crates.

pub mod config;
pub mod error;
pub mod models;
pub mod processing;
pub mod retry;

pub use config::{LayeredConfig, RagConfig};
pub use error::{QaragError, Result};
pub use processing::{summarize_chunks, ChunkSummary, ChunkerConfig, QaChunker};
pub use retry::RetryPolicy;
