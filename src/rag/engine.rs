//! RAG orchestration engine.
//!
//! Ties the normalizer, chunker, model provider, and vector store together:
//! the write path indexes one book (replacing any prior version), the read
//! path answers one question grounded in retrieved chunks.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex as StdMutex};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::chunker::Chunker;
use super::normalize::normalize;
use super::store::{ChunkRecord, VectorStore};
use crate::core::errors::RagError;
use crate::llm::ModelProvider;

/// Tag key holding the owning book id on every chunk record.
pub const TAG_BOOK: &str = "book";
/// Tag key holding the display title on every chunk record.
pub const TAG_TITLE: &str = "title";

/// Separator between chunks in the generation context, visually distinct so
/// the model can see chunk boundaries.
const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Characters of chunk text kept in a source attribution, display economy
/// only.
const SOURCE_PREVIEW_CHARS: usize = 200;

/// Default number of chunks retrieved per query.
pub const DEFAULT_N_RESULTS: usize = 3;

/// A source attribution returned with every answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub book: String,
    pub text: String,
}

/// The outcome of one grounded query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub answer: String,
    pub sources: Vec<Source>,
}

#[derive(Clone)]
pub struct RagEngine {
    store: Arc<dyn VectorStore>,
    provider: Arc<dyn ModelProvider>,
    chunker: Chunker,
    // Serializes concurrent ingestions of the same book id; two interleaved
    // delete-then-write sequences for one book would lose data.
    ingest_locks: Arc<StdMutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl RagEngine {
    pub fn new(
        store: Arc<dyn VectorStore>,
        provider: Arc<dyn ModelProvider>,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Result<Self, RagError> {
        Ok(Self {
            store,
            provider,
            chunker: Chunker::new(chunk_size, chunk_overlap)?,
            ingest_locks: Arc::new(StdMutex::new(HashMap::new())),
        })
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Index one book, replacing any prior version under the same id.
    ///
    /// All embeddings are computed before the old version is deleted, so a
    /// provider failure mid-stream leaves the previously ingested book fully
    /// intact. `progress` is invoked with `(completed, total)` after each
    /// chunk is embedded. Returns the number of chunks written.
    pub async fn ingest(
        &self,
        text: &str,
        book_id: &str,
        title: Option<&str>,
        progress: Option<&(dyn Fn(usize, usize) + Send + Sync)>,
    ) -> Result<usize, RagError> {
        if book_id.trim().is_empty() {
            return Err(RagError::InvalidInput("book_id must not be empty".to_string()));
        }

        let lock = self.book_lock(book_id);
        let _guard = lock.lock().await;

        let body = normalize(text);
        let chunks = self.chunker.chunk(body);
        let total = chunks.len();
        let title = title.filter(|t| !t.trim().is_empty()).unwrap_or(book_id);

        tracing::info!("Ingesting '{}' ({} chunks)", book_id, total);

        let mut records = Vec::with_capacity(total);
        for (i, chunk) in chunks.into_iter().enumerate() {
            let embedding = self.provider.embed(&chunk).await?;

            let mut tags = HashMap::new();
            tags.insert(TAG_BOOK.to_string(), book_id.to_string());
            tags.insert(TAG_TITLE.to_string(), title.to_string());

            records.push(ChunkRecord {
                id: format!("{book_id}_chunk_{i}"),
                text: chunk,
                embedding,
                tags,
            });

            if let Some(callback) = progress {
                // A broken progress display must never abort ingestion.
                let _ = catch_unwind(AssertUnwindSafe(|| callback(i + 1, total)));
            }
        }

        self.store.delete_by_tag(TAG_BOOK, book_id).await?;
        self.store.upsert(records).await?;

        tracing::info!("Ingested '{}' ({} chunks)", book_id, total);
        Ok(total)
    }

    /// Remove a book and all its chunks. Idempotent: deleting an unknown
    /// book id is not an error.
    pub async fn delete(&self, book_id: &str) -> Result<(), RagError> {
        let deleted = self.store.delete_by_tag(TAG_BOOK, book_id).await?;
        tracing::info!("Deleted '{}' ({} chunks)", book_id, deleted);
        Ok(())
    }

    /// Sorted ids of all ingested books.
    pub async fn list_books(&self) -> Result<Vec<String>, RagError> {
        self.store.list_distinct(TAG_BOOK).await
    }

    /// Answer a question grounded in retrieved chunks.
    ///
    /// When `book_id` is given, retrieval is scoped to that book only; a
    /// filter matching nothing yields empty context, and the grounding
    /// instruction makes the model say so rather than fall back to other
    /// books.
    pub async fn query(
        &self,
        question: &str,
        book_id: Option<&str>,
        n_results: usize,
    ) -> Result<QueryOutcome, RagError> {
        if self.store.count().await? == 0 {
            return Err(RagError::EmptyStore);
        }

        let query_embedding = self.provider.embed(question).await?;

        let tag_filter = book_id.map(|id| (TAG_BOOK, id));
        let retrieved = self
            .store
            .search(&query_embedding, n_results, tag_filter)
            .await?;

        let context = retrieved
            .iter()
            .map(|chunk| chunk.text.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR);

        let answer = self.provider.generate(question, &context).await?;

        let sources = retrieved
            .into_iter()
            .map(|chunk| Source {
                book: chunk
                    .tags
                    .get(TAG_BOOK)
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                text: chunk.text.chars().take(SOURCE_PREVIEW_CHARS).collect(),
            })
            .collect();

        Ok(QueryOutcome { answer, sources })
    }

    fn book_lock(&self, book_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.ingest_locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .entry(book_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::rag::sqlite::SqliteVectorStore;

    /// Deterministic provider stub: embeddings derive from byte content,
    /// answers echo the question and context length.
    struct MockProvider {
        embed_calls: AtomicUsize,
        fail_embed_after: Option<usize>,
    }

    impl MockProvider {
        fn new() -> Self {
            Self {
                embed_calls: AtomicUsize::new(0),
                fail_embed_after: None,
            }
        }

        fn failing_after(n: usize) -> Self {
            Self {
                embed_calls: AtomicUsize::new(0),
                fail_embed_after: Some(n),
            }
        }
    }

    #[async_trait]
    impl ModelProvider for MockProvider {
        fn name(&self) -> &'static str {
            "mock"
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
            let calls = self.embed_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(limit) = self.fail_embed_after {
                if calls >= limit {
                    return Err(RagError::provider("mock", "simulated embedding outage"));
                }
            }

            let sum: u32 = text.bytes().map(u32::from).sum();
            Ok(vec![
                (sum % 97) as f32,
                (text.len() % 89) as f32,
                text.bytes().next().unwrap_or(0) as f32,
                1.0,
            ])
        }

        async fn generate(&self, question: &str, context: &str) -> Result<String, RagError> {
            Ok(format!("answer to '{question}' from {} context chars", context.len()))
        }
    }

    async fn test_engine() -> RagEngine {
        test_engine_with(Arc::new(MockProvider::new()), 10, 4).await
    }

    async fn test_engine_with(
        provider: Arc<dyn ModelProvider>,
        size: usize,
        overlap: usize,
    ) -> RagEngine {
        let tmp = std::env::temp_dir().join(format!("bookrag-engine-{}.db", uuid::Uuid::new_v4()));
        let store = Arc::new(SqliteVectorStore::with_path(tmp).await.unwrap());
        RagEngine::new(store, provider, size, overlap).unwrap()
    }

    #[tokio::test]
    async fn ingest_returns_chunk_count() {
        let engine = test_engine().await;
        let count = engine
            .ingest("AAAA BBBB CCCC DDDD", "alice", None, None)
            .await
            .unwrap();
        assert_eq!(count, 4);
        assert_eq!(engine.list_books().await.unwrap(), vec!["alice"]);
    }

    #[tokio::test]
    async fn ingest_rejects_empty_book_id() {
        let engine = test_engine().await;
        let err = engine.ingest("text", "  ", None, None).await.unwrap_err();
        assert!(matches!(err, RagError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn reingestion_replaces_rather_than_duplicates() {
        let engine = test_engine().await;
        let text = "AAAA BBBB CCCC DDDD";

        let first = engine.ingest(text, "alice", None, None).await.unwrap();
        let second = engine.ingest(text, "alice", None, None).await.unwrap();
        assert_eq!(first, second);

        let outcome = engine.query("BBBB?", Some("alice"), 100).await.unwrap();
        assert_eq!(outcome.sources.len(), first);
    }

    #[tokio::test]
    async fn deleting_one_book_leaves_others_intact() {
        let engine = test_engine().await;
        engine.ingest("aaaa bbbb cccc", "alice", None, None).await.unwrap();
        engine.ingest("xxxx yyyy zzzz", "oz", None, None).await.unwrap();

        engine.delete("alice").await.unwrap();

        assert_eq!(engine.list_books().await.unwrap(), vec!["oz"]);
        let outcome = engine.query("yyyy?", Some("oz"), 100).await.unwrap();
        assert!(!outcome.sources.is_empty());
        assert!(outcome.sources.iter().all(|s| s.book == "oz"));
    }

    #[tokio::test]
    async fn deleting_unknown_book_is_a_noop() {
        let engine = test_engine().await;
        engine.ingest("some text", "alice", None, None).await.unwrap();

        engine.delete("never-ingested").await.unwrap();
        assert_eq!(engine.list_books().await.unwrap(), vec!["alice"]);
    }

    #[tokio::test]
    async fn query_on_empty_store_fails_distinctly() {
        let engine = test_engine().await;
        let err = engine.query("anything?", None, 3).await.unwrap_err();
        assert!(matches!(err, RagError::EmptyStore));
    }

    #[tokio::test]
    async fn title_falls_back_to_book_id() {
        let engine = test_engine().await;
        engine.ingest("alice in wonderland", "alice", None, None).await.unwrap();
        engine
            .ingest("the wizard of oz", "oz", Some("The Wizard of Oz"), None)
            .await
            .unwrap();

        let store_titles = engine.store.list_distinct(TAG_TITLE).await.unwrap();
        assert_eq!(store_titles, vec!["The Wizard of Oz", "alice"]);
    }

    #[tokio::test]
    async fn query_filtered_to_unknown_book_yields_empty_context() {
        let engine = test_engine().await;
        engine.ingest("alice text body", "alice", None, None).await.unwrap();

        let outcome = engine.query("anything?", Some("oz"), 3).await.unwrap();
        assert!(outcome.sources.is_empty());
        // Empty context reaches the model; the grounding prompt handles it.
        assert!(outcome.answer.contains("0 context chars"));
    }

    #[tokio::test]
    async fn sources_are_truncated_for_display() {
        let provider = Arc::new(MockProvider::new());
        let engine = test_engine_with(provider, 500, 0).await;

        let text = "x".repeat(400);
        engine.ingest(&text, "big", None, None).await.unwrap();

        let outcome = engine.query("x?", None, 1).await.unwrap();
        assert_eq!(outcome.sources.len(), 1);
        assert_eq!(outcome.sources[0].text.chars().count(), 200);
    }

    #[tokio::test]
    async fn progress_callback_sees_every_chunk() {
        let engine = test_engine().await;
        let seen = StdMutex::new(Vec::new());

        let progress = |done: usize, total: usize| {
            seen.lock().unwrap().push((done, total));
        };
        engine
            .ingest("AAAA BBBB CCCC DDDD", "alice", None, Some(&progress))
            .await
            .unwrap();

        let seen = seen.into_inner().unwrap();
        assert_eq!(seen, vec![(1, 4), (2, 4), (3, 4), (4, 4)]);
    }

    #[tokio::test]
    async fn panicking_progress_callback_does_not_abort_ingestion() {
        let engine = test_engine().await;

        let progress = |_done: usize, _total: usize| panic!("broken display");
        let count = engine
            .ingest("AAAA BBBB CCCC DDDD", "alice", None, Some(&progress))
            .await
            .unwrap();
        assert_eq!(count, 4);
    }

    #[tokio::test]
    async fn embedding_failure_mid_ingest_preserves_prior_version() {
        let tmp = std::env::temp_dir().join(format!("bookrag-engine-{}.db", uuid::Uuid::new_v4()));
        let store = Arc::new(SqliteVectorStore::with_path(tmp).await.unwrap());

        let good: Arc<dyn ModelProvider> = Arc::new(MockProvider::new());
        let engine = RagEngine::new(store.clone(), good, 10, 4).unwrap();
        engine.ingest("AAAA BBBB CCCC DDDD", "alice", None, None).await.unwrap();

        // Second ingestion fails on the second chunk's embedding.
        let flaky: Arc<dyn ModelProvider> = Arc::new(MockProvider::failing_after(1));
        let engine = RagEngine::new(store.clone(), flaky, 10, 4).unwrap();
        let err = engine
            .ingest("EEEE FFFF GGGG HHHH", "alice", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Provider { .. }));

        // The first version must still be fully present.
        assert_eq!(store.count().await.unwrap(), 4);
    }
}
