//! Environment-driven configuration.
//!
//! All knobs the core needs are read once at startup and validated eagerly:
//! an invalid provider name, a missing API key, or a chunk overlap that would
//! stall the chunker are fatal before any request is served.

use std::env;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use crate::core::errors::RagError;

/// Which model provider backs embedding and generation.
///
/// Both capabilities are bound by the same switch; mixing embedding models
/// within one store corrupts similarity ranking, so the selection is made
/// once here and injected, never re-decided per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Gemini,
    Ollama,
}

impl FromStr for ProviderKind {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gemini" => Ok(ProviderKind::Gemini),
            "ollama" => Ok(ProviderKind::Ollama),
            other => Err(RagError::Config(format!(
                "LLM_PROVIDER must be 'gemini' or 'ollama', got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub provider: ProviderKind,

    pub google_api_key: String,
    pub gemini_chat_model: String,
    pub gemini_embedding_model: String,

    pub ollama_host: String,
    pub ollama_chat_model: String,
    pub ollama_embedding_model: String,

    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Settings {
    /// Load settings from the environment and validate them.
    pub fn from_env() -> Result<Self, RagError> {
        let settings = Settings {
            provider: get_env("LLM_PROVIDER", "gemini").parse()?,
            google_api_key: get_env("GOOGLE_API_KEY", ""),
            gemini_chat_model: get_env("GEMINI_CHAT_MODEL", "gemini-2.0-flash"),
            gemini_embedding_model: get_env("GEMINI_EMBEDDING_MODEL", "text-embedding-004"),
            ollama_host: get_env("OLLAMA_HOST", "http://localhost:11434"),
            ollama_chat_model: get_env("OLLAMA_CHAT_MODEL", "llama3.1"),
            ollama_embedding_model: get_env("OLLAMA_EMBEDDING_MODEL", "nomic-embed-text"),
            chunk_size: parse_env("CHUNK_SIZE", 500)?,
            chunk_overlap: parse_env("CHUNK_OVERLAP", 100)?,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), RagError> {
        if self.provider == ProviderKind::Gemini && self.google_api_key.is_empty() {
            return Err(RagError::Config(
                "GOOGLE_API_KEY is required when LLM_PROVIDER is 'gemini'".to_string(),
            ));
        }
        if self.chunk_size == 0 {
            return Err(RagError::Config("CHUNK_SIZE must be positive".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::Config(format!(
                "CHUNK_OVERLAP ({}) must be smaller than CHUNK_SIZE ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

fn get_env(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(value) if !value.is_empty() => value,
        _ => default.to_string(),
    }
}

fn parse_env(key: &str, default: usize) -> Result<usize, RagError> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => value
            .parse()
            .map_err(|_| RagError::Config(format!("{key} must be an integer, got '{value}'"))),
        _ => Ok(default),
    }
}

/// Filesystem locations owned by the backend.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub db_path: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        let data_dir = env::var("BOOKRAG_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));
        let log_dir = data_dir.join("logs");
        let db_path = data_dir.join("bookrag.db");

        for dir in [&data_dir, &log_dir] {
            let _ = fs::create_dir_all(dir);
        }

        AppPaths {
            data_dir,
            log_dir,
            db_path,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
