//! Logging configuration and initialization
//!
//! This module sets up the tracing subscriber for structured logging
//! throughout the application, and holds the helper used to keep caller
//! credentials out of log lines.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Longest credential prefix that may ever appear in a log line
const MASK_PREFIX_CHARS: usize = 10;

/// Output format of log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human readable, for local development
    Pretty,
    /// One JSON object per line, for log shippers
    Json,
}

/// Normalize a log level string, falling back to "info"
///
/// Accepts the usual names plus "warning" and "critical" for compatibility.
pub fn normalize_level(log_level: &str) -> &'static str {
    // Parse log level - extract just the first word to handle comments
    let level = log_level
        .split_whitespace()
        .next()
        .unwrap_or("info")
        .to_lowercase();

    match level.as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "warn" | "warning" => "warn",
        "error" | "critical" => "error",
        _ => "info",
    }
}

/// Initialize the logging system with the specified level and format
///
/// `RUST_LOG`, when set, takes precedence over `log_level`.
pub fn init_logging(log_level: &str, format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(normalize_level(log_level)));

    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
            .init(),
    }
}

/// Mask a credential for logging
///
/// Shows at most ten leading characters and never more than half the key.
pub fn mask_credential(key: &str) -> String {
    let total = key.chars().count();
    let shown = MASK_PREFIX_CHARS.min(total / 2);
    let prefix: String = key.chars().take(shown).collect();
    format!("{}...", prefix)
}
