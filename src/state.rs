use std::sync::Arc;

use crate::core::config::{AppPaths, Settings};
use crate::core::errors::RagError;
use crate::llm::build_provider;
use crate::rag::{RagEngine, SqliteVectorStore};

/// Application state shared across routes and the CLI tools.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub settings: Settings,
    pub engine: RagEngine,
}

impl AppState {
    /// Load configuration, open the vector store, and wire up the engine.
    ///
    /// Configuration errors are fatal here, before any request is served.
    pub async fn initialize() -> Result<Arc<Self>, RagError> {
        let paths = Arc::new(AppPaths::new());
        let settings = Settings::from_env()?;

        let store = Arc::new(SqliteVectorStore::new(&paths).await?);
        let provider = build_provider(&settings)?;
        let engine = RagEngine::new(
            store,
            provider,
            settings.chunk_size,
            settings.chunk_overlap,
        )?;

        Ok(Arc::new(AppState {
            paths,
            settings,
            engine,
        }))
    }
}
