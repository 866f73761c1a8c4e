//! Retrieval-augmented generation core.
//!
//! - `normalize`: strips boilerplate fences from raw book text
//! - `Chunker`: fixed-size overlapping chunking
//! - `VectorStore` / `SqliteVectorStore`: chunk persistence and similarity search
//! - `RagEngine`: ingestion and query orchestration

pub mod chunker;
pub mod engine;
pub mod normalize;
pub mod sqlite;
pub mod store;

pub use chunker::Chunker;
pub use engine::{QueryOutcome, RagEngine, Source, DEFAULT_N_RESULTS};
pub use normalize::normalize;
pub use sqlite::SqliteVectorStore;
pub use store::{ChunkRecord, RetrievedChunk, VectorStore};
