//! Model provider abstraction.
//!
//! Embedding and generation are external capabilities reached over HTTP.
//! The provider is chosen once from configuration and injected into the
//! engine; business logic never compares provider names.

pub mod gemini;
pub mod ollama;
pub mod provider;

use std::sync::Arc;

use crate::core::config::{ProviderKind, Settings};
use crate::core::errors::RagError;

pub use gemini::GeminiProvider;
pub use ollama::OllamaProvider;
pub use provider::ModelProvider;

/// System instruction constraining answers to the retrieved context.
pub const RAG_SYSTEM_PROMPT: &str = "\
You are a helpful assistant that answers questions based on the provided context.
Use ONLY the information from the context to answer. If the context doesn't contain
enough information to answer the question, say so honestly.
Be concise and helpful.";

/// Build the configured provider.
pub fn build_provider(settings: &Settings) -> Result<Arc<dyn ModelProvider>, RagError> {
    settings.validate()?;

    let provider: Arc<dyn ModelProvider> = match settings.provider {
        ProviderKind::Gemini => Arc::new(GeminiProvider::new(
            settings.google_api_key.clone(),
            settings.gemini_chat_model.clone(),
            settings.gemini_embedding_model.clone(),
        )),
        ProviderKind::Ollama => Arc::new(OllamaProvider::new(
            settings.ollama_host.clone(),
            settings.ollama_chat_model.clone(),
            settings.ollama_embedding_model.clone(),
        )),
    };

    Ok(provider)
}

/// User-turn prompt shared by both providers.
pub(crate) fn user_prompt(question: &str, context: &str) -> String {
    format!("Context:\n{context}\n\nQuestion: {question}")
}
