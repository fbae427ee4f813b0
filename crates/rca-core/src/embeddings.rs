use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{RcaError, Result};

/// Turns a text blob into a fixed-length vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Client for an embedding service exposing `POST {endpoint}/v1/embeddings`.
#[derive(Debug, Clone)]
pub struct HttpEmbedder {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl HttpEmbedder {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RcaError::Upstream(format!("embedding client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: None,
        })
    }

    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key;
        self
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut req = self
            .client
            .post(format!("{}/v1/embeddings", self.endpoint))
            .json(&EmbeddingRequest {
                model: &self.model,
                input: text,
            });
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().await.map_err(|e| {
            tracing::error!(error = %e, "embedding request failed");
            RcaError::Upstream(format!("embedding service: {e}"))
        })?;
        let status = resp.status();
        if !status.is_success() {
            tracing::error!(status = status.as_u16(), "embedding service rejected request");
            return Err(RcaError::Upstream(format!(
                "embedding service returned {status}"
            )));
        }
        let body: EmbeddingResponse = resp
            .json()
            .await
            .map_err(|e| RcaError::Upstream(format!("embedding response: {e}")))?;
        if body.embedding.is_empty() {
            return Err(RcaError::Upstream("embedding service returned an empty vector".into()));
        }
        tracing::debug!(dims = body.embedding.len(), "embedded text");
        Ok(body.embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedder(url: String) -> HttpEmbedder {
        HttpEmbedder::new(url, "gemini-embedding-001", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn returns_vector_from_service() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/embeddings")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"model":"gemini-embedding-001","input":"narrative"}"#.into(),
            ))
            .with_status(200)
            .with_body(r#"{"embedding":[0.25,-0.5,1.0]}"#)
            .create_async()
            .await;
        let v = embedder(server.url()).embed("narrative").await.unwrap();
        assert_eq!(v, vec![0.25, -0.5, 1.0]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn error_status_is_upstream() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/embeddings")
            .with_status(500)
            .create_async()
            .await;
        let err = embedder(server.url()).embed("x").await.unwrap_err();
        assert!(matches!(err, RcaError::Upstream(_)));
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn empty_vector_is_upstream() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/embeddings")
            .with_status(200)
            .with_body(r#"{"embedding":[]}"#)
            .create_async()
            .await;
        let err = embedder(server.url()).embed("x").await.unwrap_err();
        assert!(matches!(err, RcaError::Upstream(_)));
    }
}
