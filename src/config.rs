//! Gateway and provider configuration
//!
//! Configuration is loaded from multiple sources in priority order:
//! 1. Command-line arguments (highest, applied by the binary)
//! 2. Environment variables (`PORT`, `RAGFIN_*`)
//! 3. Config file (explicit path, `./ragfin.toml`, or `~/.ragfin/config.toml`)
//! 4. Default values (lowest)
//!
//! The credential never comes from the config file. It is read from
//! `GROQ_API_KEY` (or `--api-key`) once at startup and handed to the client.

use crate::gate::GatewayConfig;
use anyhow::Context;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the provider API key
pub const CREDENTIAL_ENV: &str = "GROQ_API_KEY";

/// Local config file name, looked up in the working directory
const LOCAL_CONFIG: &str = "ragfin.toml";

/// Provider API key.
///
/// Held by the upstream client for the process lifetime. `Debug` never prints
/// the value.
pub struct Credential(SecretString);

impl Credential {
    /// Wrap a key; blank keys count as "not configured"
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            None
        } else {
            Some(Credential(SecretString::from(key)))
        }
    }

    /// Read the key from `GROQ_API_KEY`
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the key through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        lookup(CREDENTIAL_ENV).and_then(Self::new)
    }

    pub(crate) fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

/// Configuration for the upstream LLM provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API base URL of an OpenAI-compatible chat-completions API
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Fixed model identifier; callers cannot choose another
    #[serde(default = "default_model")]
    pub model: String,

    /// System prompt sent ahead of every conversation. An empty string
    /// disables it.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: Option<String>,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: Option<f32>,

    /// Maximum tokens for the completion
    #[serde(default = "default_max_tokens")]
    pub max_tokens: Option<u32>,

    /// Upstream request timeout in seconds (default: 60)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            model: default_model(),
            system_prompt: default_system_prompt(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

/// Remittance-expert persona sent when no other prompt is configured
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are RAGFIN1, an expert on international \
remittances, money transfers, and financial services for the Americas. Provide accurate, \
helpful information about sending money internationally, comparing providers, exchange \
rates, and regulations.";

fn default_system_prompt() -> Option<String> {
    Some(DEFAULT_SYSTEM_PROMPT.to_string())
}

fn default_temperature() -> Option<f32> {
    Some(0.7)
}

fn default_max_tokens() -> Option<u32> {
    Some(1000)
}

fn default_timeout() -> u64 {
    60
}

impl ProviderConfig {
    /// Create a provider config pointing at `api_base`, defaults elsewhere
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            ..Self::default()
        }
    }

    /// Upstream request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Chat completions URL
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }
}

/// Full configuration file contents
///
/// ```toml
/// [gateway]
/// host = "0.0.0.0"
/// port = 10000
/// cors_allow_any = true
///
/// [provider]
/// api_base = "https://api.groq.com/openai/v1"
/// model = "llama-3.3-70b-versatile"
/// system_prompt = "You are RAGFIN1, an expert on international remittances."
/// temperature = 0.7
/// max_tokens = 1000
/// timeout_secs = 60
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub provider: ProviderConfig,
}

impl Settings {
    /// Load settings from `path`, or from the first default location that
    /// exists. No file at all means built-in defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match default_config_path() {
                Some(path) => Self::from_file(&path),
                None => Ok(Self::default()),
            },
        }
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(settings)
    }

    /// Apply environment overrides through `lookup`
    ///
    /// Recognised variables: `PORT`, `RAGFIN_HOST`, `RAGFIN_API_BASE`,
    /// `RAGFIN_MODEL`.
    pub fn apply_env<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.gateway.port = port
                .trim()
                .parse()
                .with_context(|| format!("invalid PORT value: {}", port))?;
        }
        if let Some(host) = lookup("RAGFIN_HOST") {
            self.gateway.host = host;
        }
        if let Some(api_base) = lookup("RAGFIN_API_BASE") {
            self.provider.api_base = api_base;
        }
        if let Some(model) = lookup("RAGFIN_MODEL") {
            self.provider.model = model;
        }
        Ok(())
    }

    /// Check ranges that would otherwise only fail at request time
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.gateway.port == 0 {
            anyhow::bail!("Invalid port: 0");
        }
        if self.provider.timeout_secs == 0 || self.provider.timeout_secs > 600 {
            anyhow::bail!(
                "Invalid timeout: {} (must be between 1 and 600 seconds)",
                self.provider.timeout_secs
            );
        }
        if !(self.provider.api_base.starts_with("http://")
            || self.provider.api_base.starts_with("https://"))
        {
            anyhow::bail!("Invalid api_base: {}", self.provider.api_base);
        }
        if self.provider.model.trim().is_empty() {
            anyhow::bail!("Model must not be empty");
        }
        if let Some(t) = self.provider.temperature {
            if !(0.0..=2.0).contains(&t) {
                anyhow::bail!("Invalid temperature: {} (must be between 0 and 2)", t);
            }
        }
        Ok(())
    }
}

fn default_config_path() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG);
    if local.exists() {
        return Some(local);
    }
    let home = dirs::home_dir()?.join(".ragfin").join("config.toml");
    home.exists().then_some(home)
}
