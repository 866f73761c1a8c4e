//! Local inference via an Ollama server.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::ModelProvider;
use super::{user_prompt, RAG_SYSTEM_PROMPT};
use crate::core::errors::RagError;

#[derive(Clone)]
pub struct OllamaProvider {
    base_url: String,
    chat_model: String,
    embedding_model: String,
    client: Client,
}

impl OllamaProvider {
    pub fn new(base_url: String, chat_model: String, embedding_model: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            chat_model,
            embedding_model,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl ModelProvider for OllamaProvider {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let url = format!("{}/api/embeddings", self.base_url);
        let body = json!({
            "model": self.embedding_model,
            "prompt": text,
        });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RagError::provider("ollama", e))?;

        if !res.status().is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(RagError::provider(
                "ollama",
                format!("embeddings request failed: {text}"),
            ));
        }

        let payload: Value = res.json().await.map_err(|e| RagError::provider("ollama", e))?;
        let embedding: Vec<f32> = payload["embedding"]
            .as_array()
            .map(|vals| {
                vals.iter()
                    .filter_map(|v| v.as_f64().map(|f| f as f32))
                    .collect()
            })
            .unwrap_or_default();

        if embedding.is_empty() {
            return Err(RagError::provider(
                "ollama",
                "embeddings response contained no vector",
            ));
        }

        Ok(embedding)
    }

    async fn generate(&self, question: &str, context: &str) -> Result<String, RagError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = json!({
            "model": self.chat_model,
            "messages": [
                { "role": "system", "content": RAG_SYSTEM_PROMPT },
                { "role": "user", "content": user_prompt(question, context) },
            ],
            "stream": false,
        });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RagError::provider("ollama", e))?;

        if !res.status().is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(RagError::provider(
                "ollama",
                format!("chat request failed: {text}"),
            ));
        }

        let payload: Value = res.json().await.map_err(|e| RagError::provider("ollama", e))?;
        match payload["message"]["content"].as_str() {
            Some(content) => Ok(content.to_string()),
            None => Err(RagError::provider(
                "ollama",
                "chat response contained no answer text",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::json;

    use super::*;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn provider(base_url: String) -> OllamaProvider {
        OllamaProvider::new(base_url, "test-chat".to_string(), "test-embed".to_string())
    }

    #[tokio::test]
    async fn generate_extracts_message_content() {
        let router = Router::new().route(
            "/api/chat",
            post(|| async {
                Json(json!({ "message": { "role": "assistant", "content": "grounded answer" } }))
            }),
        );
        let provider = provider(serve(router).await);

        let answer = provider.generate("q?", "ctx").await.unwrap();
        assert_eq!(answer, "grounded answer");
    }

    #[tokio::test]
    async fn generate_without_message_content_is_a_provider_error() {
        let router = Router::new().route(
            "/api/chat",
            post(|| async { Json(json!({ "done": true })) }),
        );
        let provider = provider(serve(router).await);

        let err = provider.generate("q?", "ctx").await.unwrap_err();
        assert!(matches!(err, RagError::Provider { provider: "ollama", .. }));
    }
}
