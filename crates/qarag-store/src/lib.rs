//! QARAG Store - Vector index port and adapters
//!
//! This crate defines the nearest-neighbour index port consumed by the
//! retrieval engine and an in-memory adapter with filter push-down.

pub mod memory;
pub mod ports;

pub use memory::MemoryVectorIndex;
pub use ports::{IndexHit, VectorIndex};
