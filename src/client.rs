//! Upstream LLM client
//!
//! All knowledge of the provider's JSON shape lives in this module. Callers
//! deal in [`ChatRequest`] / [`ChatResponse`] and the closed [`UpstreamError`]
//! classification.

use super::{
    config::{Credential, ProviderConfig},
    message::{ChatRequest, ChatResponse, ChatTurn, MessageRole, Usage},
    Result, UpstreamError,
};
use reqwest::{header::HeaderMap, Client as HttpClient, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Build an HTTP client with specified timeout
fn build_http_client(timeout: Duration) -> std::result::Result<HttpClient, reqwest::Error> {
    HttpClient::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .build()
}

/// Trait for upstream completion clients
#[async_trait::async_trait]
pub trait Client: Send + Sync {
    /// Send one chat completion request. Exactly one attempt, no retry.
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse>;

    /// Whether a credential was configured at startup
    fn is_configured(&self) -> bool;
}

/// Provider-neutral view of what is sent upstream
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    /// Fixed model identifier from configuration
    pub model: String,

    /// Configured system prompt, sent ahead of the turns
    pub system_prompt: Option<String>,

    /// Conversation turns: history in order, then the new message
    pub turns: Vec<ChatTurn>,

    /// Sampling temperature, omitted from the body when unset
    pub temperature: Option<f32>,

    /// Completion token limit, omitted from the body when unset
    pub max_tokens: Option<u32>,
}

impl OutboundRequest {
    fn body(&self) -> CompletionRequest<'_> {
        let system = self
            .system_prompt
            .as_deref()
            .map(|content| WireMessage {
                role: MessageRole::System,
                content,
            });
        let turns = self.turns.iter().map(|turn| WireMessage {
            role: turn.role,
            content: &turn.text,
        });

        CompletionRequest {
            model: &self.model,
            messages: system.into_iter().chain(turns).collect(),
            stream: false,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

/// Combine configuration and a caller request into the outbound request.
///
/// History is kept in order and the new message is appended last as a user
/// turn. The model comes from configuration only. A blank system prompt is
/// dropped.
pub fn build_request(config: &ProviderConfig, request: &ChatRequest) -> OutboundRequest {
    let mut turns = Vec::with_capacity(request.history.len() + 1);
    turns.extend(request.history.iter().cloned());
    turns.push(ChatTurn::user(request.message.clone()));

    OutboundRequest {
        model: config.model.clone(),
        system_prompt: config
            .system_prompt
            .clone()
            .filter(|prompt| !prompt.trim().is_empty()),
        turns,
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    }
}

/// Client for OpenAI-compatible chat-completions APIs (Groq, OpenAI, ...)
pub struct OpenAIClient {
    config: ProviderConfig,
    credential: Option<Credential>,
    http_client: HttpClient,
}

impl OpenAIClient {
    /// Create a new client. `credential` is `None` when no key was configured;
    /// every call then fails with [`UpstreamError::Unauthenticated`].
    pub fn new(config: ProviderConfig, credential: Option<Credential>) -> anyhow::Result<Self> {
        let timeout = config.timeout();
        Ok(OpenAIClient {
            http_client: build_http_client(timeout)?,
            config,
            credential,
        })
    }
}

#[async_trait::async_trait]
impl Client for OpenAIClient {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let credential = self
            .credential
            .as_ref()
            .ok_or(UpstreamError::Unauthenticated)?;

        request.validate().map_err(UpstreamError::InvalidInput)?;

        let outbound = build_request(&self.config, request);
        let url = self.config.completions_url();

        debug!(
            model = %outbound.model,
            turns = outbound.turns.len(),
            "Sending chat completion request"
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(credential.expose())
            .json(&outbound.body())
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers());
            warn!("Provider returned HTTP {}", status);
            return Err(classify_status(status, retry_after));
        }

        let body = response.bytes().await.map_err(classify_transport)?;
        parse_completion(&body)
    }

    fn is_configured(&self) -> bool {
        self.credential.is_some()
    }
}

/// Map a transport-level failure. The URL is stripped so it never reaches logs
/// or callers.
fn classify_transport(err: reqwest::Error) -> UpstreamError {
    if err.is_timeout() {
        return UpstreamError::UpstreamUnavailable {
            timed_out: true,
            reason: "request timed out".to_string(),
        };
    }
    if err.is_connect() {
        return UpstreamError::unavailable("connection failed");
    }
    UpstreamError::unavailable(err.without_url().to_string())
}

/// Map a non-success HTTP status
fn classify_status(status: StatusCode, retry_after: Option<Duration>) -> UpstreamError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => UpstreamError::Unauthenticated,
        StatusCode::TOO_MANY_REQUESTS => UpstreamError::RateLimited { retry_after },
        _ => UpstreamError::unavailable(format!("provider returned HTTP {}", status)),
    }
}

/// Parse a delta-seconds `Retry-After` header. HTTP-date values are ignored.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Extract the reply from a success body
fn parse_completion(body: &[u8]) -> Result<ChatResponse> {
    // Only the error category and position are kept; serde messages can quote
    // body fragments.
    let response: CompletionResponse = serde_json::from_slice(body).map_err(|e| {
        UpstreamError::MalformedUpstreamResponse(format!(
            "{:?} error at line {} column {}",
            e.classify(),
            e.line(),
            e.column()
        ))
    })?;

    let choice = response.choices.into_iter().next().ok_or_else(|| {
        UpstreamError::MalformedUpstreamResponse("no choices in response".to_string())
    })?;

    let reply = choice.message.content.ok_or_else(|| {
        UpstreamError::MalformedUpstreamResponse("choice has no content".to_string())
    })?;

    Ok(ChatResponse {
        reply,
        usage: response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }),
    })
}

// OpenAI wire types

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: MessageRole,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
    #[serde(default)]
    usage: Option<CompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}
