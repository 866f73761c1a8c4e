//! SQLite-backed vector store implementation.
//!
//! In-process store using SQLite for records and brute-force cosine
//! similarity for search. Tags live in a JSON column queried with
//! `json_extract`; embeddings are little-endian f32 BLOBs.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::store::{ChunkRecord, RetrievedChunk, VectorStore};
use crate::core::config::AppPaths;
use crate::core::errors::RagError;

pub struct SqliteVectorStore {
    pool: SqlitePool,
    #[allow(dead_code)]
    db_path: PathBuf,
}

impl SqliteVectorStore {
    pub async fn new(paths: &AppPaths) -> Result<Self, RagError> {
        Self::with_path(paths.db_path.clone()).await
    }

    pub async fn with_path(db_path: PathBuf) -> Result<Self, RagError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(RagError::storage)?;

        let store = Self { pool, db_path };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), RagError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS chunks (
                chunk_id TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                tags TEXT NOT NULL DEFAULT '{}',
                embedding BLOB NOT NULL,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(RagError::storage)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS store_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(RagError::storage)?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }

        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        let denom = norm_a * norm_b;

        if denom <= f32::EPSILON {
            0.0
        } else {
            dot / denom
        }
    }

    fn tag_path(tag_key: &str) -> String {
        format!("$.{tag_key}")
    }

    async fn embedding_dim(&self) -> Result<Option<usize>, RagError> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM store_meta WHERE key = 'embedding_dim'")
                .fetch_optional(&self.pool)
                .await
                .map_err(RagError::storage)?;

        Ok(value.and_then(|v| v.parse().ok()))
    }

    /// Reject vectors whose dimension disagrees with what the store holds.
    /// The first successful upsert pins the dimension.
    async fn check_dimension(&self, records: &[ChunkRecord]) -> Result<(), RagError> {
        let Some(first) = records.first() else {
            return Ok(());
        };

        let dim = first.embedding.len();
        if dim == 0 {
            return Err(RagError::Config("empty embedding vector".to_string()));
        }
        if let Some(record) = records.iter().find(|r| r.embedding.len() != dim) {
            return Err(RagError::Config(format!(
                "mixed embedding dimensions in one batch: {} vs {}",
                dim,
                record.embedding.len()
            )));
        }

        match self.embedding_dim().await? {
            Some(stored) if stored != dim => Err(RagError::Config(format!(
                "embedding dimension {dim} does not match store dimension {stored}; \
                 reindex with a single embedding model"
            ))),
            Some(_) => Ok(()),
            None => {
                sqlx::query(
                    "INSERT OR REPLACE INTO store_meta (key, value, updated_at)
                     VALUES ('embedding_dim', ?1, STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))",
                )
                .bind(dim.to_string())
                .execute(&self.pool)
                .await
                .map_err(RagError::storage)?;
                Ok(())
            }
        }
    }

    fn row_to_tags(row: &sqlx::sqlite::SqliteRow) -> HashMap<String, String> {
        let tags_str: String = row.get("tags");
        serde_json::from_str(&tags_str).unwrap_or_default()
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn upsert(&self, records: Vec<ChunkRecord>) -> Result<(), RagError> {
        if records.is_empty() {
            return Ok(());
        }

        self.check_dimension(&records).await?;

        let mut tx = self.pool.begin().await.map_err(RagError::storage)?;

        for record in &records {
            let blob = Self::serialize_embedding(&record.embedding);
            let tags_str = serde_json::to_string(&record.tags).map_err(RagError::storage)?;

            sqlx::query(
                "INSERT OR REPLACE INTO chunks (chunk_id, content, tags, embedding)
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(&record.id)
            .bind(&record.text)
            .bind(&tags_str)
            .bind(&blob)
            .execute(&mut *tx)
            .await
            .map_err(RagError::storage)?;
        }

        tx.commit().await.map_err(RagError::storage)?;
        Ok(())
    }

    async fn delete_by_tag(&self, tag_key: &str, tag_value: &str) -> Result<usize, RagError> {
        let result = sqlx::query("DELETE FROM chunks WHERE json_extract(tags, ?1) = ?2")
            .bind(Self::tag_path(tag_key))
            .bind(tag_value)
            .execute(&self.pool)
            .await
            .map_err(RagError::storage)?;

        Ok(result.rows_affected() as usize)
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        k: usize,
        tag_filter: Option<(&str, &str)>,
    ) -> Result<Vec<RetrievedChunk>, RagError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let rows = if let Some((tag_key, tag_value)) = tag_filter {
            sqlx::query(
                "SELECT chunk_id, content, tags, embedding FROM chunks
                 WHERE json_extract(tags, ?1) = ?2",
            )
            .bind(Self::tag_path(tag_key))
            .bind(tag_value)
            .fetch_all(&self.pool)
            .await
            .map_err(RagError::storage)?
        } else {
            sqlx::query("SELECT chunk_id, content, tags, embedding FROM chunks")
                .fetch_all(&self.pool)
                .await
                .map_err(RagError::storage)?
        };

        let mut scored: Vec<(String, RetrievedChunk)> = rows
            .iter()
            .map(|row| {
                let embedding_bytes: Vec<u8> = row.get("embedding");
                let stored = Self::deserialize_embedding(&embedding_bytes);
                let score = Self::cosine_similarity(query_embedding, &stored);

                (
                    row.get("chunk_id"),
                    RetrievedChunk {
                        text: row.get("content"),
                        tags: Self::row_to_tags(row),
                        score,
                    },
                )
            })
            .collect();

        // Descending score, ascending chunk id on ties: deterministic for
        // identical inputs.
        scored.sort_by(|(id_a, a), (id_b, b)| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| id_a.cmp(id_b))
        });
        scored.truncate(k);

        Ok(scored.into_iter().map(|(_, chunk)| chunk).collect())
    }

    async fn count(&self) -> Result<usize, RagError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await
            .map_err(RagError::storage)?;

        Ok(count as usize)
    }

    async fn list_distinct(&self, tag_key: &str) -> Result<Vec<String>, RagError> {
        let values: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT json_extract(tags, ?1) FROM chunks
             WHERE json_extract(tags, ?1) IS NOT NULL
             ORDER BY 1",
        )
        .bind(Self::tag_path(tag_key))
        .fetch_all(&self.pool)
        .await
        .map_err(RagError::storage)?;

        Ok(values.into_iter().filter(|v| !v.is_empty()).collect())
    }
}
