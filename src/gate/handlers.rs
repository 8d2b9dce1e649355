//! HTTP request handlers for the gateway

use crate::{ChatRequest, ChatResponse, Client, UpstreamError};
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

/// Gateway state shared across handlers
#[derive(Clone)]
pub struct GatewayState {
    pub client: Arc<dyn Client>,
}

impl GatewayState {
    pub fn new(client: Arc<dyn Client>) -> Self {
        Self { client }
    }
}

/// Everything the chat endpoint can fail with
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Body did not parse, or failed validation. Nothing was sent upstream.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Body could not be buffered, e.g. over the size limit
    #[error("request body rejected: {0}")]
    BodyRejected(#[from] BytesRejection),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl GatewayError {
    /// Stable machine-readable name, sent as `kind`
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::InvalidRequest(_) | GatewayError::BodyRejected(_) => "InvalidRequest",
            GatewayError::Upstream(e) => e.kind(),
        }
    }

    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::BodyRejected(rejection) => rejection.status(),
            GatewayError::Upstream(e) => match e {
                UpstreamError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                UpstreamError::Unauthenticated => StatusCode::UNAUTHORIZED,
                UpstreamError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
                UpstreamError::UpstreamUnavailable { timed_out: true, .. } => {
                    StatusCode::GATEWAY_TIMEOUT
                }
                UpstreamError::UpstreamUnavailable { .. }
                | UpstreamError::MalformedUpstreamResponse(_) => StatusCode::BAD_GATEWAY,
            },
        }
    }

    /// Caller-facing message. Upstream failures get fixed text; the detail
    /// stays in the logs.
    fn public_message(&self) -> String {
        let message = match self {
            GatewayError::InvalidRequest(detail)
            | GatewayError::Upstream(UpstreamError::InvalidInput(detail)) => return detail.clone(),
            GatewayError::BodyRejected(rejection) => return rejection.body_text(),
            GatewayError::Upstream(UpstreamError::Unauthenticated) => {
                "The gateway is not authorized to reach the language model provider"
            }
            GatewayError::Upstream(UpstreamError::RateLimited { .. }) => {
                "The language model provider is rate limiting requests, retry later"
            }
            GatewayError::Upstream(UpstreamError::UpstreamUnavailable { timed_out: true, .. }) => {
                "The language model provider did not respond in time"
            }
            GatewayError::Upstream(UpstreamError::UpstreamUnavailable { .. }) => {
                "The language model provider is unavailable"
            }
            GatewayError::Upstream(UpstreamError::MalformedUpstreamResponse(_)) => {
                "The language model provider returned an unexpected response"
            }
        };
        message.to_string()
    }
}

/// Error body returned to callers
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: &'static str,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.public_message(),
            kind: self.kind(),
        };
        let mut response = (self.status(), Json(body)).into_response();

        if let GatewayError::Upstream(UpstreamError::RateLimited {
            retry_after: Some(after),
        }) = &self
        {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(after.as_secs()));
        }

        response
    }
}

/// Validate a raw body and forward it through `client`.
///
/// Invalid input never reaches the client.
pub async fn handle(client: &dyn Client, body: &[u8]) -> Result<ChatResponse, GatewayError> {
    let request: ChatRequest = serde_json::from_slice(body)
        .map_err(|e| GatewayError::InvalidRequest(format!("Invalid JSON body: {}", e)))?;

    request.validate().map_err(GatewayError::InvalidRequest)?;

    Ok(client.complete(&request).await?)
}

/// Handle `POST /api/v1/chat`
///
/// Takes raw bytes rather than `Json<ChatRequest>` so that content-type, size
/// and parse failures come back in the gateway's own error shape.
pub async fn chat_handler(
    State(state): State<GatewayState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<ChatResponse>, GatewayError> {
    let result = match body {
        Ok(body) => handle(state.client.as_ref(), &body).await,
        Err(rejection) => Err(GatewayError::from(rejection)),
    };

    match result {
        Ok(response) => {
            info!(
                reply_len = response.reply.len(),
                total_tokens = ?response.usage.as_ref().map(|u| u.total_tokens),
                "Chat completion relayed"
            );
            Ok(Json(response))
        }
        Err(e) => {
            match &e {
                GatewayError::InvalidRequest(_) | GatewayError::BodyRejected(_) => {
                    info!(kind = e.kind(), "Rejected: {}", e)
                }
                GatewayError::Upstream(UpstreamError::MalformedUpstreamResponse(_)) => {
                    error!(kind = e.kind(), "Upstream call failed: {}", e)
                }
                GatewayError::Upstream(_) => warn!(kind = e.kind(), "Upstream call failed: {}", e),
            }
            Err(e)
        }
    }
}
