use anyhow::{bail, Context, Result};
use cqgate_core::bridge::DEFAULT_BINARY_PATH;
use cqgate_core::rate_limit::{DEFAULT_MAX_REQUESTS, DEFAULT_SWEEP_INTERVAL, DEFAULT_WINDOW_MS};
use crate::api::RequestSchemas;
use cqgate_core::{CqDecoder, ProcessBridge, RateLimitPolicy, RateLimiter};
use cqgate_mcp::McpServer;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Default request ceiling for the JSON-RPC endpoint
pub const DEFAULT_MCP_MAX_REQUESTS: u32 = 200;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub decoder: DecoderConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub mcp: McpConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecoderConfig {
    #[serde(default = "default_binary_path")]
    pub binary_path: PathBuf,

    /// Deadline for a single decoder run; unset means no deadline
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    #[serde(default = "default_mcp_max_requests")]
    pub max_requests: u32,
}

fn default_binary_path() -> PathBuf {
    PathBuf::from(DEFAULT_BINARY_PATH)
}

fn default_window_ms() -> u64 {
    DEFAULT_WINDOW_MS
}

fn default_max_requests() -> u32 {
    DEFAULT_MAX_REQUESTS
}

fn default_sweep_interval_ms() -> u64 {
    u64::try_from(DEFAULT_SWEEP_INTERVAL.as_millis()).unwrap_or(u64::MAX)
}

fn default_mcp_max_requests() -> u32 {
    DEFAULT_MCP_MAX_REQUESTS
}

fn default_true() -> bool {
    true
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            binary_path: default_binary_path(),
            timeout_ms: None,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_ms: default_window_ms(),
            max_requests: default_max_requests(),
            sweep_interval_ms: default_sweep_interval_ms(),
        }
    }
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_ms: default_window_ms(),
            max_requests: default_mcp_max_requests(),
        }
    }
}

impl ServerConfig {
    /// Load the config file (defaults if it does not exist), then apply
    /// environment overrides
    pub fn load(config_path: &Path) -> Result<Self> {
        let mut config: Self = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)
                .context("Failed to read configuration file")?;
            toml::from_str(&content).context("Failed to parse configuration file")?
        } else {
            tracing::info!("Configuration file not found, using defaults");
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;

        Ok(config)
    }

    /// Apply `CQ_BINARY_PATH`, `CQ_TIMEOUT_MS`, `RATE_LIMIT_WINDOW_MS`,
    /// `RATE_LIMIT_MAX_REQUESTS` and `MCP_ENABLED`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("CQ_BINARY_PATH") {
            self.decoder.binary_path = PathBuf::from(path);
        }
        if let Some(value) = lookup("CQ_TIMEOUT_MS") {
            self.decoder.timeout_ms = Some(parse_number("CQ_TIMEOUT_MS", &value)?);
        }
        if let Some(value) = lookup("RATE_LIMIT_WINDOW_MS") {
            self.rate_limit.window_ms = parse_number("RATE_LIMIT_WINDOW_MS", &value)?;
        }
        if let Some(value) = lookup("RATE_LIMIT_MAX_REQUESTS") {
            self.rate_limit.max_requests = parse_number("RATE_LIMIT_MAX_REQUESTS", &value)?;
        }
        if let Some(value) = lookup("MCP_ENABLED") {
            // Anything but an explicit "false" keeps the endpoint on
            self.mcp.enabled = value.trim() != "false";
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.rate_limit.window_ms == 0 || self.mcp.window_ms == 0 {
            bail!("Rate-limit windows must be at least 1ms");
        }
        if self.rate_limit.max_requests == 0 || self.mcp.max_requests == 0 {
            bail!("Rate-limit ceilings must allow at least one request");
        }
        if self.rate_limit.sweep_interval_ms == 0 {
            bail!("Rate-limit sweep interval must be at least 1ms");
        }
        if self.decoder.timeout_ms == Some(0) {
            bail!("Decoder timeout must be at least 1ms");
        }
        Ok(())
    }

    /// Policy for the REST endpoints
    pub fn rest_policy(&self) -> RateLimitPolicy {
        RateLimitPolicy::new(self.rate_limit.window_ms, self.rate_limit.max_requests)
    }

    /// Policy for the JSON-RPC endpoint
    pub fn mcp_policy(&self) -> RateLimitPolicy {
        RateLimitPolicy::new(self.mcp.window_ms, self.mcp.max_requests)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.rate_limit.sweep_interval_ms)
    }

    pub fn decoder_timeout(&self) -> Option<Duration> {
        self.decoder.timeout_ms.map(Duration::from_millis)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("Invalid value for {}: {:?}", key, value))
}

/// Decoder availability as reported by the health endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecoderHealth {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DecoderHealth {
    /// Ask the decoder for its version once
    pub async fn check(decoder: &CqDecoder) -> Self {
        match decoder.version().await {
            Ok(version) => Self {
                available: true,
                version: Some(version),
                error: None,
            },
            Err(e) => {
                tracing::warn!("Decoder version check failed: {}", e);
                Self {
                    available: false,
                    version: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

/// Application state shared across handlers
pub struct AppState {
    pub config: ServerConfig,
    pub decoder: Arc<CqDecoder>,
    pub decoder_health: DecoderHealth,
    pub limiter: Arc<RateLimiter>,
    pub schemas: RequestSchemas,
    pub mcp: McpServer,
}

impl AppState {
    /// Resolve the decoder binary and build the shared services
    ///
    /// A missing decoder is a deployment error and fails startup.
    pub async fn new(config: ServerConfig) -> Result<Self> {
        let bridge = ProcessBridge::new(config.decoder.binary_path.clone())
            .context("Decoder binary unavailable")?
            .with_timeout(config.decoder_timeout());

        Self::from_parts(config, CqDecoder::new(bridge), Arc::new(RateLimiter::new())).await
    }

    pub async fn from_parts(
        config: ServerConfig,
        decoder: CqDecoder,
        limiter: Arc<RateLimiter>,
    ) -> Result<Self> {
        let decoder_health = DecoderHealth::check(&decoder).await;
        tracing::info!(
            decoder = %decoder.bridge().binary().display(),
            timeout_ms = ?decoder.bridge().timeout().map(|t| t.as_millis()),
            available = decoder_health.available,
            version = decoder_health.version.as_deref().unwrap_or("unknown"),
            "Using cq decoder"
        );

        let decoder = Arc::new(decoder);
        let schemas = RequestSchemas::compile().context("Invalid request schemas")?;
        let mcp = McpServer::new(decoder.clone()).context("Invalid tool schemas")?;

        Ok(Self {
            config,
            decoder,
            decoder_health,
            limiter,
            schemas,
            mcp,
        })
    }
}
