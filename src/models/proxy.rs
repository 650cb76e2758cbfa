//! Inbound proxy API models
//!
//! `GenerationPayload` is the wire schema the browser posts. It is turned into
//! a `GenerationRequest` by `validate`, which is the only way to build one.

use crate::core::constants::{limits, message};
use crate::core::error::GatewayError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Raw body of `POST /api/gemini`
///
/// `prompt` is kept as a JSON value so a wrong-typed prompt is reported by
/// validation with a 400 rather than by the JSON extractor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerationPayload {
    #[serde(default)]
    pub prompt: Option<Value>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default, rename = "userApiKey")]
    pub user_api_key: Option<String>,
}

/// A validated generation request
#[derive(Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub model: String,
    pub api_key: String,
}

// Hand-written so the credential never ends up in a `{:?}` log line.
impl fmt::Debug for GenerationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationRequest")
            .field("prompt_chars", &self.prompt.chars().count())
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl GenerationPayload {
    /// Validate the payload, short-circuiting on the first failure
    ///
    /// Order: prompt presence and type, prompt length, credential, model name.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::InvalidInput` or `GatewayError::MissingCredential`.
    pub fn validate(self, default_model: &str) -> Result<GenerationRequest, GatewayError> {
        let prompt = match self.prompt {
            Some(Value::String(prompt)) if !prompt.is_empty() => prompt,
            _ => return Err(GatewayError::InvalidInput(message::PROMPT_REQUIRED.to_string())),
        };

        if prompt.chars().count() > limits::MAX_PROMPT_CHARS {
            return Err(GatewayError::InvalidInput(message::PROMPT_TOO_LONG.to_string()));
        }

        let api_key = match self.user_api_key {
            Some(key) if !key.is_empty() => key,
            _ => return Err(GatewayError::MissingCredential),
        };

        let model = self.model.unwrap_or_else(|| default_model.to_string());
        if !is_valid_model_name(&model) {
            return Err(GatewayError::InvalidInput(message::INVALID_MODEL.to_string()));
        }

        Ok(GenerationRequest {
            prompt,
            model,
            api_key,
        })
    }
}

/// Model names end up in the upstream URL path, so only allow plain identifiers
pub fn is_valid_model_name(model: &str) -> bool {
    !model.is_empty()
        && model
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_'))
}

/// Body of every error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: String,
}

/// Body of `GET /api/health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}
