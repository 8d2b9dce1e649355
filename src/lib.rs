//! Chat gateway in front of a hosted LLM completion API.
//!
//! The gateway accepts a provider-agnostic [`ChatRequest`], forwards it to the
//! upstream provider with a server-held [`Credential`], and relays the reply as a
//! [`ChatResponse`]. Callers never see the credential or the provider's wire shape.
mod client;
mod config;
mod message;
pub mod gate;

use std::time::Duration;
use thiserror::Error;

/// Result type for upstream calls
pub type Result<T> = std::result::Result<T, UpstreamError>;

/// Classified failure of a single upstream call.
///
/// Raw transport and parse errors are folded into one of these variants inside
/// the client; nothing provider-specific crosses this boundary.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The request was rejected before any I/O (empty message)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Credential missing, or rejected by the provider (401/403)
    #[error("upstream credential missing or rejected")]
    Unauthenticated,

    /// Provider signalled throttling (429)
    #[error("upstream rate limited (retry after {retry_after:?})")]
    RateLimited {
        /// Provider's `Retry-After` hint, passed through untouched
        retry_after: Option<Duration>,
    },

    /// Network failure, timeout, or a non-success status from the provider
    #[error("upstream unavailable: {reason}")]
    UpstreamUnavailable {
        /// Whether the call hit the configured timeout
        timed_out: bool,
        /// Log-only detail; never contains the upstream body
        reason: String,
    },

    /// Success status but a body we could not interpret
    #[error("malformed upstream response: {0}")]
    MalformedUpstreamResponse(String),
}

impl UpstreamError {
    /// Stable machine-readable name exposed to callers
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::InvalidInput(_) => "InvalidRequest",
            UpstreamError::Unauthenticated => "Unauthenticated",
            UpstreamError::RateLimited { .. } => "RateLimited",
            UpstreamError::UpstreamUnavailable { .. } => "UpstreamUnavailable",
            UpstreamError::MalformedUpstreamResponse(_) => "MalformedUpstreamResponse",
        }
    }

    pub(crate) fn unavailable(reason: impl Into<String>) -> Self {
        UpstreamError::UpstreamUnavailable {
            timed_out: false,
            reason: reason.into(),
        }
    }
}

pub use client::{build_request, Client, OpenAIClient, OutboundRequest};
pub use config::{Credential, ProviderConfig, Settings, CREDENTIAL_ENV, DEFAULT_SYSTEM_PROMPT};
pub use message::{ChatRequest, ChatResponse, ChatTurn, MessageRole, Usage};
