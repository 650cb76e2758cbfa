//! Upstream abstraction
//!
//! The gateway talks to the generative language API only through the
//! `Upstream` trait, so the retry loop can be exercised against a scripted
//! upstream and the real HTTP client stays a thin adapter.

use crate::models::gemini::GenerateContentRequest;
use async_trait::async_trait;
use axum::http::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Error types for a single upstream call
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No usable response: connect failure, timeout, or a body that could not be read
    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

/// One upstream reply, whatever its status
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    /// Parsed JSON body; `None` when the body was not JSON
    pub body: Option<Value>,
}

/// Trait for generative language backends
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Perform exactly one `generateContent` call with the caller's credential
    async fn generate_content(
        &self,
        model: &str,
        api_key: &str,
        request: &GenerateContentRequest,
    ) -> Result<UpstreamResponse, ProviderError>;

    /// Get the provider name
    fn provider_name(&self) -> &str;
}
