//! LLM Gateway module
//!
//! Exposes the chat endpoint that forwards caller conversations to the
//! upstream provider, plus a health check.

pub mod config;
pub mod handlers;
pub mod server;

pub use config::GatewayConfig;
pub use handlers::{handle, GatewayError, GatewayState};
pub use server::{router, serve, start_server, CHAT_PATH};
