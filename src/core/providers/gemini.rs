//! Gemini (generative language API) provider implementation

use crate::core::constants::upstream;
use crate::core::provider::{ProviderError, Upstream, UpstreamResponse};
use crate::models::gemini::GenerateContentRequest;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Provider for Google's generative language API, keyed per request
///
/// Holds no credential of its own: every call carries the caller's key.
pub struct GeminiProvider {
    client: Client,
    base_url: String,
}

impl GeminiProvider {
    /// Create a new Gemini provider
    ///
    /// # Arguments
    ///
    /// * `base_url` - API base URL (default: https://generativelanguage.googleapis.com/v1)
    /// * `timeout` - Per-attempt request timeout in seconds
    pub fn new(base_url: Option<String>, timeout: u64) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()
            .map_err(|e| ProviderError::Client(e.to_string()))?;

        let base_url = base_url.unwrap_or_else(|| upstream::DEFAULT_BASE_URL.to_string());

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Get the endpoint URL for the model, without the credential
    fn get_endpoint_url(&self, model: &str) -> String {
        format!(
            "{}/models/{}:{}",
            self.base_url,
            model,
            upstream::GENERATE_CONTENT
        )
    }
}

#[async_trait]
impl Upstream for GeminiProvider {
    async fn generate_content(
        &self,
        model: &str,
        api_key: &str,
        request: &GenerateContentRequest,
    ) -> Result<UpstreamResponse, ProviderError> {
        let url = self.get_endpoint_url(model);

        // The key rides in the query string, so reqwest errors must lose their URL
        // before they are formatted anywhere.
        let response = self
            .client
            .post(&url)
            .query(&[(upstream::KEY_PARAM, api_key)])
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.without_url().to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::Network(e.without_url().to_string()))?;

        let body = match serde_json::from_slice::<Value>(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Upstream returned a non-JSON body (status {}): {}", status, e);
                None
            }
        };

        debug!("Upstream {} answered {} ({} bytes)", url, status, bytes.len());

        Ok(UpstreamResponse { status, body })
    }

    fn provider_name(&self) -> &str {
        "Gemini"
    }
}
