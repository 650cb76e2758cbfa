//! Gemini Prompt Proxy
//!
//! This application sits between the mock-interview web client and Google's
//! generative language API. Browsers post a prompt together with their own
//! API key; the proxy validates it, forwards a single-turn request and
//! retries transient upstream failures with bounded backoff.

mod api;
mod core;
mod models;

use crate::api::endpoints::{AppState, create_router};
use crate::core::config::{Config, Environment};
use crate::core::gateway::ProxyGateway;
use crate::core::logging::{LogFormat, init_logging};
use crate::core::provider::Upstream;
use crate::core::providers::GeminiProvider;
use crate::core::rate_limiter::RateLimiter;
use crate::core::retry::RetryPolicy;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Check for --help flag
    if std::env::args().any(|arg| arg == "--help") {
        print_help();
        return;
    }

    dotenv::dotenv().ok();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            eprintln!("Configuration Error: {:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    let log_format = match config.environment {
        Environment::Production => LogFormat::Json,
        Environment::Development => LogFormat::Pretty,
    };
    init_logging(&config.log_level, log_format);

    let upstream: Arc<dyn Upstream> = match GeminiProvider::new(
        Some(config.upstream_base_url.clone()),
        config.request_timeout,
    ) {
        Ok(provider) => Arc::new(provider),
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let gateway = ProxyGateway::new(upstream, RetryPolicy::default())
        .with_default_model(config.default_model.clone());

    log_startup(&config, &gateway);

    // Create application state
    let app_state = AppState {
        config: config.clone(),
        gateway: Arc::new(gateway),
        rate_limiter: Arc::new(RateLimiter::new(config.rate_limit())),
    };

    // Create router
    let app = create_router(app_state);

    // Bind to address
    let addr = format!("{}:{}", config.host, config.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    info!("Server running on port {}", config.port);

    // Run server; peer addresses feed the rate limiter
    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Log the effective configuration at startup
fn log_startup(config: &Config, gateway: &ProxyGateway) {
    let policy = gateway.policy();
    info!("Gemini Prompt Proxy v{}", env!("CARGO_PKG_VERSION"));
    info!("Environment: {}", config.environment.as_str());
    info!("Upstream: {} ({})", gateway.provider_name(), config.upstream_base_url);
    info!("Default model: {}", config.default_model);
    info!(
        "Retries: {} attempts, per-attempt timeout {}s, max backoff {:?}",
        policy.max_attempts,
        config.request_timeout,
        policy.max_total_backoff()
    );
    info!(
        "Rate limit: {} requests per {}s per client",
        config.rate_limit_max_requests, config.rate_limit_window
    );
    info!("Allowed origins: {}", config.allowed_origins().join(", "));
}

/// Print help message
fn print_help() {
    println!("Gemini Prompt Proxy v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Usage: gemini-prompt-proxy [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --help    Display this help message");
    println!();
    println!("Environment variables (a .env file is read if present):");
    println!("  CONFIG_PATH - Optional TOML configuration file");
    println!("  PORT - Server port (default: 3001)");
    println!("  HOST - Server host (default: 0.0.0.0)");
    println!("  APP_ENV - development or production (default: development)");
    println!("  NODE_ENV - Used when APP_ENV is unset; unrecognized values mean development");
    println!("  LOG_LEVEL - Logging level (default: info); RUST_LOG takes precedence");
    println!("  UPSTREAM_BASE_URL - Generative language API base URL");
    println!("  REQUEST_TIMEOUT - Per-attempt upstream timeout in seconds (default: 30)");
    println!("  ALLOWED_ORIGINS - Comma separated CORS allow-list");
    println!();
    println!("Callers supply their own Gemini API key with every request;");
    println!("the server never holds or falls back to a key of its own.");
}
