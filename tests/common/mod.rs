//! Mock provider for testing the client and gateway offline
//!
//! Wraps a wiremock server that speaks the OpenAI-compatible
//! chat-completions shape, so tests run without a real API key.

#![allow(dead_code)]

use ragfin_llm::{Credential, OpenAIClient, ProviderConfig};
use std::time::Duration;
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

/// Key the mock expects in the `Authorization` header
pub const TEST_KEY: &str = "gsk_test_key";

/// Chat-completions mock provider
pub struct ProviderMockServer {
    server: MockServer,
}

impl ProviderMockServer {
    /// Create a new mock provider
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        Self { server }
    }

    /// Get the base URL of this mock server
    pub fn base_url(&self) -> String {
        self.server.uri()
    }

    /// Provider config pointing at this server
    pub fn config(&self) -> ProviderConfig {
        ProviderConfig::new(self.base_url())
    }

    /// Client with [`TEST_KEY`] configured
    pub fn client(&self) -> OpenAIClient {
        OpenAIClient::new(self.config(), Credential::new(TEST_KEY)).unwrap()
    }

    /// Setup a successful chat completion
    pub async fn mock_chat_completion(&self, content: &str, total_tokens: u32) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", format!("Bearer {}", TEST_KEY).as_str()))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "id": "chatcmpl-mock",
                    "object": "chat.completion",
                    "created": 1234567890,
                    "model": "llama-3.3-70b-versatile",
                    "choices": [{
                        "index": 0,
                        "message": {
                            "role": "assistant",
                            "content": content
                        },
                        "finish_reason": "stop"
                    }],
                    "usage": {
                        "prompt_tokens": 10,
                        "completion_tokens": total_tokens - 10,
                        "total_tokens": total_tokens
                    }
                })),
            )
            .mount(&self.server)
            .await;
    }

    /// Setup an error status, optionally with `Retry-After` and a body that
    /// must never leak to callers
    pub async fn mock_status(&self, status: u16, retry_after: Option<u64>) {
        let mut template = ResponseTemplate::new(status).set_body_json(serde_json::json!({
            "error": {
                "message": format!("Invalid API Key: {}", TEST_KEY),
                "type": "invalid_request_error"
            }
        }));
        if let Some(secs) = retry_after {
            template = template.insert_header("retry-after", secs.to_string().as_str());
        }

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(template)
            .mount(&self.server)
            .await;
    }

    /// Setup a 200 response with an arbitrary body
    pub async fn mock_raw_body(&self, body: &str) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&self.server)
            .await;
    }

    /// Setup a successful completion that arrives after `delay`
    pub async fn mock_delayed(&self, content: &str, delay: Duration) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(delay)
                    .set_body_json(serde_json::json!({
                        "choices": [{"message": {"role": "assistant", "content": content}}]
                    })),
            )
            .mount(&self.server)
            .await;
    }

    /// Bodies of all requests the provider received, parsed as JSON
    pub async fn received_bodies(&self) -> Vec<serde_json::Value> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(|r| serde_json::from_slice(&r.body).unwrap())
            .collect()
    }

    /// Number of requests the provider received
    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|r| r.len())
            .unwrap_or(0)
    }
}
