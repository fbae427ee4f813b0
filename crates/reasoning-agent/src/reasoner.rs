use std::time::Duration;

use async_trait::async_trait;

use crate::stream::ResponseStream;
use crate::types::CompletionRequest;
use crate::{ReasoningError, Result};

// ─── Reasoner ─────────────────────────────────────────────────────────────

/// Capability interface over the reasoning/completion service.
///
/// Implementations must honour `request.tools` as the complete set of tools
/// the model may call for this request.
#[async_trait]
pub trait Reasoner: Send + Sync {
    async fn stream(&self, request: CompletionRequest) -> Result<ResponseStream>;
}

// ─── HttpReasoner ─────────────────────────────────────────────────────────

/// Talks to a reasoning service exposing `POST {endpoint}/v1/completions`,
/// which answers with a JSONL body of `partial` / `final` messages.
#[derive(Debug, Clone)]
pub struct HttpReasoner {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpReasoner {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: None,
        })
    }

    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key;
        self
    }

    fn url(&self) -> String {
        format!("{}/v1/completions", self.endpoint)
    }
}

#[async_trait]
impl Reasoner for HttpReasoner {
    async fn stream(&self, request: CompletionRequest) -> Result<ResponseStream> {
        tracing::debug!(model = %request.model, tools = request.tools.len(), "completion request");
        let mut req = self
            .client
            .post(self.url())
            .header("accept", "application/x-ndjson")
            .json(&request);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ReasoningError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(ResponseStream::from_body(Box::pin(resp.bytes_stream())))
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::complete;
    use crate::types::{GroundingChunk, GroundingSource};

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "test-model".into(),
            instructions: "analyze".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn http_reasoner_streams_final_completion() {
        let mut server = mockito::Server::new_async().await;
        let body = concat!(
            r#"{"type":"partial","text":"he"}"#,
            "\n",
            r#"{"type":"final","text":"hello","tool_calls":[{"id":"1","name":"save_analysis","args":{"analysis":"ok"}}]}"#,
            "\n"
        );
        let mock = server
            .mock("POST", "/v1/completions")
            .match_header("authorization", "Bearer secret")
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let reasoner = HttpReasoner::new(server.url(), Duration::from_secs(5))
            .unwrap()
            .with_api_key(Some("secret".into()));
        let done = complete(&reasoner, request()).await.unwrap();
        assert_eq!(done.text, "hello");
        assert_eq!(done.tool_calls[0].name, "save_analysis");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn http_reasoner_parses_grounding_chunks() {
        let mut server = mockito::Server::new_async().await;
        let body = r#"{"type":"final","text":"docs","grounding":{"retrieval_queries":["erab"],"grounding_chunks":[{"web":{"uri":"https://a.example/x","title":"A"}},{"retrieved_context":{"document_name":"projects/p/doc1","text":"Doc one"}}]}}"#;
        server
            .mock("POST", "/v1/completions")
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let reasoner = HttpReasoner::new(server.url(), Duration::from_secs(5)).unwrap();
        let mut req = request();
        req.grounding = Some(GroundingSource::Web {
            urls: vec!["https://a.example/x".into()],
        });
        let done = complete(&reasoner, req).await.unwrap();
        assert!(done.is_grounded());
        let chunks = &done.grounding.unwrap().grounding_chunks;
        assert_eq!(chunks.len(), 2);
        assert!(matches!(&chunks[1], GroundingChunk::RetrievedContext { document_name, .. } if document_name == "projects/p/doc1"));
    }

    #[tokio::test]
    async fn http_reasoner_maps_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/completions")
            .with_status(503)
            .with_body("overloaded")
            .create_async()
            .await;

        let reasoner = HttpReasoner::new(server.url(), Duration::from_secs(5)).unwrap();
        let err = complete(&reasoner, request()).await.unwrap_err();
        match err {
            ReasoningError::Status { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "overloaded");
            }
            other => panic!("expected Status, got {other:?}"),
        }
    }
}
