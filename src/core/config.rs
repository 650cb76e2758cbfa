//! Application configuration management
//!
//! Configuration comes from an optional TOML file (`CONFIG_PATH`) with every
//! value defaulted, then environment variables override individual values.
//! Everything is validated at startup so a misconfigured process exits early.

use crate::core::constants::upstream;
use crate::core::rate_limiter::RateLimitConfig;
use crate::models::proxy::is_valid_model_name;
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Default server port
const DEFAULT_PORT: u16 = 3001;

/// Default per-attempt upstream timeout in seconds
const DEFAULT_REQUEST_TIMEOUT: u64 = 30;

/// Default requests per rate-limit window
const DEFAULT_RATE_LIMIT_MAX_REQUESTS: u32 = 100;

/// Default rate-limit window in seconds (15 minutes)
const DEFAULT_RATE_LIMIT_WINDOW: u64 = 15 * 60;

/// Origin of the local frontend dev server
const DEV_ORIGIN: &str = "http://localhost:5173";

/// Origin of the deployed frontend
const PRODUCTION_ORIGIN: &str = "https://your-domain.vercel.app";

/// Deployment mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "production" | "prod" => Some(Environment::Production),
            "development" | "dev" => Some(Environment::Development),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub environment: Environment,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            environment: Environment::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            default_model: default_model(),
            request_timeout: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSection {
    #[serde(default = "default_rate_limit_max_requests")]
    pub max_requests: u32,
    #[serde(default = "default_rate_limit_window")]
    pub window_seconds: u64,
}

impl Default for RateLimitSection {
    fn default() -> Self {
        Self {
            max_requests: default_rate_limit_max_requests(),
            window_seconds: default_rate_limit_window(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CorsConfig {
    /// Explicit allow-list; when absent the list follows the environment
    #[serde(default)]
    pub allowed_origins: Option<Vec<String>>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_base_url() -> String {
    upstream::DEFAULT_BASE_URL.to_string()
}

fn default_model() -> String {
    upstream::DEFAULT_MODEL.to_string()
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT
}

fn default_rate_limit_max_requests() -> u32 {
    DEFAULT_RATE_LIMIT_MAX_REQUESTS
}

fn default_rate_limit_window() -> u64 {
    DEFAULT_RATE_LIMIT_WINDOW
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub rate_limit: RateLimitSection,
    #[serde(default)]
    pub cors: CorsConfig,
}

/// Application configuration
///
/// Holds no upstream credential: callers always supply their own key.
#[derive(Debug, Clone)]
pub struct Config {
    /// Deployment mode
    pub environment: Environment,

    /// Server host address
    pub host: String,

    /// Server port
    pub port: u16,

    /// Logging level
    pub log_level: String,

    /// Upstream API base URL
    pub upstream_base_url: String,

    /// Model used when a request names none
    pub default_model: String,

    /// Per-attempt upstream timeout in seconds
    pub request_timeout: u64,

    /// Requests allowed per client per window
    pub rate_limit_max_requests: u32,

    /// Rate-limit window in seconds
    pub rate_limit_window: u64,

    /// Explicit CORS allow-list, if configured
    pub cors_allowed_origins: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default())
    }
}

impl Config {
    fn from_toml(config: TomlConfig) -> Self {
        Config {
            environment: config.server.environment,
            host: config.server.host,
            port: config.server.port,
            log_level: config.server.log_level,
            upstream_base_url: config.upstream.base_url,
            default_model: config.upstream.default_model,
            request_timeout: config.upstream.request_timeout,
            rate_limit_max_requests: config.rate_limit.max_requests,
            rate_limit_window: config.rate_limit.window_seconds,
            cors_allowed_origins: config.cors.allowed_origins,
        }
    }

    /// Load configuration from TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the TOML file cannot be read or parsed, or if a value
    /// is invalid.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read configuration file")?;

        let config: TomlConfig =
            toml::from_str(&content).context("Failed to parse TOML configuration")?;

        let config = Self::from_toml(config);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the environment
    ///
    /// Reads `CONFIG_PATH` if set, otherwise starts from defaults, then applies
    /// `PORT`, `HOST`, `APP_ENV` (or `NODE_ENV` when unset), `LOG_LEVEL`,
    /// `UPSTREAM_BASE_URL`, `REQUEST_TIMEOUT` and `ALLOWED_ORIGINS`.
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var("CONFIG_PATH") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment-style overrides from `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid PORT value: {}", port))?;
        }
        if let Some(host) = lookup("HOST") {
            self.host = host;
        }
        if let Some(env) = lookup("APP_ENV") {
            self.environment = Environment::from_str(&env)
                .with_context(|| format!("Invalid APP_ENV value: {}. Must be development or production", env))?;
        } else if let Some(env) = lookup("NODE_ENV") {
            // Conventional values such as "test" mean a non-production deployment.
            self.environment = Environment::from_str(&env).unwrap_or_default();
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(url) = lookup("UPSTREAM_BASE_URL") {
            self.upstream_base_url = url;
        }
        if let Some(timeout) = lookup("REQUEST_TIMEOUT") {
            self.request_timeout = timeout
                .trim()
                .parse()
                .with_context(|| format!("Invalid REQUEST_TIMEOUT value: {}", timeout))?;
        }
        if let Some(origins) = lookup("ALLOWED_ORIGINS") {
            let origins: Vec<String> = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
            self.cors_allowed_origins = Some(origins);
        }
        Ok(())
    }

    /// Check that every value is usable
    pub fn validate(&self) -> Result<()> {
        if !self.upstream_base_url.starts_with("http://")
            && !self.upstream_base_url.starts_with("https://")
        {
            bail!("Upstream base URL must be http(s): {}", self.upstream_base_url);
        }
        if !is_valid_model_name(&self.default_model) {
            bail!("Invalid default model name: {}", self.default_model);
        }
        if self.request_timeout == 0 {
            bail!("Request timeout must be at least one second");
        }
        if self.rate_limit_max_requests == 0 || self.rate_limit_window == 0 {
            bail!("Rate limit must allow at least one request per non-empty window");
        }
        if self.allowed_origins().is_empty() {
            bail!("At least one allowed CORS origin is required");
        }
        Ok(())
    }

    /// Origins allowed to call the API with credentials
    pub fn allowed_origins(&self) -> Vec<String> {
        if let Some(origins) = &self.cors_allowed_origins {
            return origins.clone();
        }
        match self.environment {
            Environment::Production => vec![PRODUCTION_ORIGIN.to_string(), DEV_ORIGIN.to_string()],
            Environment::Development => vec![DEV_ORIGIN.to_string()],
        }
    }

    pub fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig {
            max_requests: self.rate_limit_max_requests,
            window: Duration::from_secs(self.rate_limit_window),
        }
    }
}
