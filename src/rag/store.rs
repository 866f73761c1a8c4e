//! VectorStore trait — abstract interface for chunk storage backends.
//!
//! The engine only relies on this contract; the concrete implementation is
//! `SqliteVectorStore` in the `sqlite` module. Records carry free-form string
//! tags so the store stays ignorant of the book/title schema layered on top.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::RagError;

/// A chunk record as written by ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Unique chunk identifier.
    pub id: String,
    /// The chunk's text content, never empty.
    pub text: String,
    /// Embedding vector; dimension is fixed per store.
    pub embedding: Vec<f32>,
    /// Key-value labels used for filtering and bulk deletion.
    pub tags: HashMap<String, String>,
}

/// A chunk as returned by similarity search.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub text: String,
    pub tags: HashMap<String, String>,
    /// Cosine similarity to the query vector (higher = better).
    pub score: f32,
}

/// Abstract trait for vector storage backends.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Store records keyed by id, replacing any record with the same id.
    ///
    /// The first write fixes the store's embedding dimension; later writes
    /// with a different dimension are rejected, since vectors from different
    /// embedding models are not comparable.
    async fn upsert(&self, records: Vec<ChunkRecord>) -> Result<(), RagError>;

    /// Remove all records whose `tag_key` tag equals `tag_value`.
    ///
    /// Returns the number of records removed; zero matches is not an error.
    async fn delete_by_tag(&self, tag_key: &str, tag_value: &str) -> Result<usize, RagError>;

    /// Return up to `k` records ranked by decreasing similarity to
    /// `query_embedding`. Ties are broken by record id so identical inputs
    /// always produce identical output order. When `tag_filter` is given,
    /// only matching records participate.
    async fn search(
        &self,
        query_embedding: &[f32],
        k: usize,
        tag_filter: Option<(&str, &str)>,
    ) -> Result<Vec<RetrievedChunk>, RagError>;

    /// Total live record count.
    async fn count(&self) -> Result<usize, RagError>;

    /// Distinct non-empty values of `tag_key` across all records, sorted.
    async fn list_distinct(&self, tag_key: &str) -> Result<Vec<String>, RagError>;
}
