//! ragfin-gate binary
//!
//! Chat gateway holding the provider credential on behalf of its callers

use anyhow::Result;
use clap::Parser;
use ragfin_llm::gate::start_server;
use ragfin_llm::{Credential, OpenAIClient, Settings};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

/// ragfin-gate: chat gateway in front of a hosted LLM API
#[derive(Parser, Debug)]
#[command(name = "ragfin-gate")]
#[command(about = "Chat gateway in front of a hosted LLM API", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to listen on
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Provider API key (defaults to GROQ_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Upstream request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Validate configuration and exit
    #[arg(long)]
    validate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref())?;
    settings.apply_env(|name| std::env::var(name).ok())?;

    // Override with CLI arguments
    if let Some(host) = args.host {
        settings.gateway.host = host;
    }
    if let Some(port) = args.port {
        settings.gateway.port = port;
    }
    if let Some(timeout) = args.timeout {
        settings.provider.timeout_secs = timeout;
    }

    let credential = args
        .api_key
        .and_then(Credential::new)
        .or_else(Credential::from_env);

    if args.validate {
        return validate_config(&settings, credential.is_some());
    }

    settings.validate()?;

    let client = OpenAIClient::new(settings.provider, credential)?;
    start_server(settings.gateway, Arc::new(client)).await
}

/// Print the effective configuration and check it
fn validate_config(settings: &Settings, has_credential: bool) -> Result<()> {
    println!("Configuration validation:");
    println!("  Host: {}", settings.gateway.host);
    println!("  Port: {}", settings.gateway.port);
    println!("  CORS (any origin): {}", settings.gateway.cors_allow_any);
    println!("  API base: {}", settings.provider.api_base);
    println!("  Model: {}", settings.provider.model);
    println!("  Timeout: {}s", settings.provider.timeout_secs);
    println!(
        "  System prompt: {}",
        if settings.provider.system_prompt.is_some() { "set" } else { "none" }
    );
    println!(
        "  API key: {}",
        if has_credential { "configured" } else { "missing" }
    );

    settings.validate()?;

    if !has_credential {
        println!("\nWarning: no API key; chat requests will be rejected as Unauthenticated");
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}
