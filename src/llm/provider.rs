use async_trait::async_trait;

use crate::core::errors::RagError;

/// Abstract model provider backing both RAG capabilities.
///
/// One deployment binds exactly one implementation; all chunks and queries
/// must be embedded by the same model or similarity ranking is meaningless.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Provider name (e.g. "gemini", "ollama").
    fn name(&self) -> &'static str;

    /// Embed a text into a fixed-dimension vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError>;

    /// Answer a question grounded in the supplied context.
    ///
    /// Implementations always attach the grounding system instruction that
    /// constrains the model to the context and tells it to decline when the
    /// context is insufficient.
    async fn generate(&self, question: &str, context: &str) -> Result<String, RagError>;
}
