//! Service configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

use crate::app_state::DEFAULT_MAX_UPLOAD_BYTES;
use crate::provider::ProviderCredential;
use crate::service::EngineSettings;

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Top-level service configuration.
///
/// Loaded once at startup via [`SpawnerConfig::from_env`].
#[derive(Debug, Clone)]
pub struct SpawnerConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:3000`).
    pub listen_addr: SocketAddr,

    /// Root directory of the record store.
    pub data_dir: PathBuf,

    /// Provider calls in flight per batch.
    pub provider_concurrency: usize,

    /// HTTP timeout of one provider call.
    pub provider_timeout: Duration,

    /// Default provider credential.
    pub gemini_api_key: Option<ProviderCredential>,

    /// Provider model name.
    pub gemini_model: String,

    /// Provider API base URL.
    pub gemini_base_url: String,

    /// Style directive appended to every card prompt.
    pub style_prompt: String,

    /// Capacity of the EventBus broadcast channel.
    pub event_bus_capacity: usize,

    /// Body limit of reference uploads, in bytes.
    pub max_upload_bytes: usize,

    /// Log output format.
    pub log_format: LogFormat,
}

impl SpawnerConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to sensible defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed as
    /// a [`SocketAddr`].
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let raw_addr = std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let listen_addr: SocketAddr = raw_addr
            .parse()
            .with_context(|| format!("invalid LISTEN_ADDR: {raw_addr}"))?;

        let data_dir = std::env::var("SPAWNER_DATA_DIR")
            .map_or_else(|_| PathBuf::from("./output"), PathBuf::from);

        let provider_concurrency = parse_env("PROVIDER_CONCURRENCY", 4_usize).max(1);
        let provider_timeout = Duration::from_secs(parse_env("PROVIDER_TIMEOUT_SECS", 180));

        let gemini_api_key = ProviderCredential::from_optional(std::env::var("GEMINI_API_KEY").ok());
        let gemini_model = std::env::var("GEMINI_MODEL")
            .unwrap_or_else(|_| "gemini-3-pro-image-preview".to_string());
        let gemini_base_url = std::env::var("GEMINI_BASE_URL")
            .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".to_string());

        let style_prompt = std::env::var("STYLE_PROMPT").unwrap_or_default();

        let event_bus_capacity = parse_env("EVENT_BUS_CAPACITY", 10_000);
        let max_upload_bytes = parse_env("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES);
        let log_format = LogFormat::parse(std::env::var("LOG_FORMAT").ok().as_deref());

        Ok(Self {
            listen_addr,
            data_dir,
            provider_concurrency,
            provider_timeout,
            gemini_api_key,
            gemini_model,
            gemini_base_url,
            style_prompt,
            event_bus_capacity,
            max_upload_bytes,
            log_format,
        })
    }

    /// Engine settings derived from this configuration.
    #[must_use]
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            concurrency: self.provider_concurrency,
            style_prompt: self.style_prompt.trim().to_string(),
            default_credential: self.gemini_api_key.clone(),
        }
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
