//! Book RAG backend: chat with uploaded books via retrieval-augmented
//! generation.
//!
//! Books are chunked, embedded, and stored in a local vector store; a query
//! embeds the question, retrieves the most similar chunks, and asks the
//! model for an answer grounded in that context with attributed sources.

pub mod core;
pub mod llm;
pub mod logging;
pub mod rag;
pub mod server;
pub mod state;

pub use crate::core::config::{AppPaths, ProviderKind, Settings};
pub use crate::core::errors::RagError;
pub use rag::{QueryOutcome, RagEngine, Source};
pub use state::AppState;
