//! Hosted inference via the Google Gemini API.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::ModelProvider;
use super::{user_prompt, RAG_SYSTEM_PROMPT};
use crate::core::errors::RagError;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Clone)]
pub struct GeminiProvider {
    base_url: String,
    api_key: String,
    chat_model: String,
    embedding_model: String,
    client: Client,
}

impl GeminiProvider {
    pub fn new(api_key: String, chat_model: String, embedding_model: String) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL.to_string(), api_key, chat_model, embedding_model)
    }

    pub fn with_base_url(
        base_url: String,
        api_key: String,
        chat_model: String,
        embedding_model: String,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            chat_model,
            embedding_model,
            client: Client::new(),
        }
    }

    async fn post(&self, url: &str, body: &Value) -> Result<Value, RagError> {
        let res = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| RagError::provider("gemini", e))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(RagError::provider(
                "gemini",
                format!("request failed with {status}: {text}"),
            ));
        }

        res.json().await.map_err(|e| RagError::provider("gemini", e))
    }
}

#[async_trait]
impl ModelProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let url = format!(
            "{}/models/{}:embedContent",
            self.base_url, self.embedding_model
        );
        let body = json!({
            "content": { "parts": [{ "text": text }] },
        });

        let payload = self.post(&url, &body).await?;
        let embedding: Vec<f32> = payload["embedding"]["values"]
            .as_array()
            .map(|vals| {
                vals.iter()
                    .filter_map(|v| v.as_f64().map(|f| f as f32))
                    .collect()
            })
            .unwrap_or_default();

        if embedding.is_empty() {
            return Err(RagError::provider(
                "gemini",
                "embedContent response contained no vector",
            ));
        }

        Ok(embedding)
    }

    async fn generate(&self, question: &str, context: &str) -> Result<String, RagError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, self.chat_model
        );
        let body = json!({
            "system_instruction": { "parts": [{ "text": RAG_SYSTEM_PROMPT }] },
            "contents": [
                { "role": "user", "parts": [{ "text": user_prompt(question, context) }] },
            ],
        });

        let payload = self.post(&url, &body).await?;
        // A safety-blocked or otherwise malformed reply carries no text; that
        // is a provider failure, not an empty answer.
        match payload["candidates"][0]["content"]["parts"][0]["text"].as_str() {
            Some(text) => Ok(text.to_string()),
            None => Err(RagError::provider(
                "gemini",
                "generateContent response contained no answer text",
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

    fn provider(base_url: String) -> GeminiProvider {
        GeminiProvider::with_base_url(
            base_url,
            "test-key".to_string(),
            "test-chat".to_string(),
            "test-embed".to_string(),
        )
    }

    #[tokio::test]
    async fn generate_extracts_answer_text() {
        let router = Router::new().route(
            "/models/:call",
            post(|| async {
                Json(json!({
                    "candidates": [
                        { "content": { "parts": [{ "text": "grounded answer" }] } },
                    ],
                }))
            }),
        );
        let provider = provider(serve(router).await);

        let answer = provider.generate("q?", "ctx").await.unwrap();
        assert_eq!(answer, "grounded answer");
    }

    #[tokio::test]
    async fn generate_without_answer_text_is_a_provider_error() {
        // Shape of a safety-blocked reply: 200 OK, no content parts.
        let router = Router::new().route(
            "/models/:call",
            post(|| async { Json(json!({ "candidates": [] })) }),
        );
        let provider = provider(serve(router).await);

        let err = provider.generate("q?", "ctx").await.unwrap_err();
        assert!(matches!(err, RagError::Provider { provider: "gemini", .. }));
    }
}
