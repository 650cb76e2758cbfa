//! Proxy gateway
//!
//! Validates a generation payload, forwards it to the upstream with the
//! caller's own credential, and retries transient failures on a fixed
//! budget. Every piece of retry state lives on the stack of one `handle`
//! call, so concurrent requests never influence each other.

use crate::core::constants::{message, upstream};
use crate::core::error::GatewayError;
use crate::core::logging::mask_credential;
use crate::core::provider::{ProviderError, Upstream, UpstreamResponse};
use crate::core::retry::RetryPolicy;
use crate::models::gemini::{GenerateContentRequest, error_message};
use crate::models::proxy::{GenerationPayload, GenerationRequest};
use anyhow::anyhow;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, error, info, warn};

/// Upstream success payload, returned to the caller verbatim
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl IntoResponse for GenerationResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// How a single upstream attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    TransientFailure,
    TerminalFailure,
}

/// Diagnostic record of one upstream attempt
#[derive(Debug, Clone)]
pub struct UpstreamAttempt {
    pub attempt: u32,
    pub outcome: AttemptOutcome,
    pub status: Option<StatusCode>,
    pub latency: Duration,
}

/// The single component between the browser and the generative language API
pub struct ProxyGateway {
    upstream: Arc<dyn Upstream>,
    policy: RetryPolicy,
    default_model: String,
}

impl ProxyGateway {
    pub fn new(upstream: Arc<dyn Upstream>, policy: RetryPolicy) -> Self {
        Self {
            upstream,
            policy,
            default_model: upstream::DEFAULT_MODEL.to_string(),
        }
    }

    /// Override the model used when the caller names none
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn provider_name(&self) -> &str {
        self.upstream.provider_name()
    }

    /// Validate `payload` and run it against the upstream
    ///
    /// Validation failures return before any upstream call is made.
    pub async fn handle(
        &self,
        payload: GenerationPayload,
    ) -> Result<GenerationResponse, GatewayError> {
        let request = payload.validate(&self.default_model).inspect_err(|e| {
            if matches!(e, GatewayError::MissingCredential) {
                error!("No user API key provided");
            }
        })?;

        self.generate(&request).await
    }

    /// Run the retry loop for an already validated request
    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, GatewayError> {
        info!(
            "Making request to {} API with key: {}",
            self.upstream.provider_name(),
            mask_credential(&request.api_key)
        );

        let body = GenerateContentRequest::single_turn(&request.prompt);
        let mut attempts = Vec::with_capacity(self.policy.max_attempts as usize);
        let mut last_status: Option<StatusCode> = None;
        let mut last_error: Option<GatewayError> = None;

        for attempt in 1..=self.policy.max_attempts {
            let started = Instant::now();
            let result = self
                .upstream
                .generate_content(&request.model, &request.api_key, &body)
                .await;
            let latency = started.elapsed();

            let delay = match result {
                Ok(response) => {
                    info!(
                        "Response status: {} (attempt {}, {:?})",
                        response.status, attempt, latency
                    );
                    last_status = Some(response.status);

                    match classify(response) {
                        Ok(generated) => {
                            attempts.push(UpstreamAttempt {
                                attempt,
                                outcome: AttemptOutcome::Success,
                                status: Some(generated.status),
                                latency,
                            });
                            info!("{} API success", self.upstream.provider_name());
                            return Ok(generated);
                        }
                        Err(err) => {
                            let retry =
                                err.is_transient() && self.policy.has_attempts_left(attempt);
                            attempts.push(UpstreamAttempt {
                                attempt,
                                outcome: if retry {
                                    AttemptOutcome::TransientFailure
                                } else {
                                    AttemptOutcome::TerminalFailure
                                },
                                status: last_status,
                                latency,
                            });

                            if matches!(err, GatewayError::InternalFault(_)) {
                                return Err(err);
                            }
                            last_error = Some(err);

                            if !retry {
                                break;
                            }
                            let delay = self.policy.overload_delay(attempt);
                            warn!(
                                "Attempt {} failed with 503, retrying in {} seconds...",
                                attempt,
                                delay.as_secs_f64()
                            );
                            delay
                        }
                    }
                }
                Err(ProviderError::Network(detail)) => {
                    error!("Attempt {} failed with network error: {}", attempt, detail);
                    let retry = self.policy.has_attempts_left(attempt);
                    attempts.push(UpstreamAttempt {
                        attempt,
                        outcome: if retry {
                            AttemptOutcome::TransientFailure
                        } else {
                            AttemptOutcome::TerminalFailure
                        },
                        status: None,
                        latency,
                    });
                    last_error = Some(GatewayError::UpstreamTransient {
                        status: None,
                        message: message::NETWORK_ERROR.to_string(),
                    });

                    if !retry {
                        break;
                    }
                    self.policy.network_delay(attempt)
                }
                Err(err @ ProviderError::Client(_)) => {
                    return Err(GatewayError::InternalFault(anyhow!(err)));
                }
            };

            sleep(delay).await;
        }

        let summary: Vec<String> = attempts
            .iter()
            .map(|a| {
                format!(
                    "#{} {:?} status={:?} {:?}",
                    a.attempt, a.outcome, a.status, a.latency
                )
            })
            .collect();
        debug!("Upstream attempts: {}", summary.join("; "));

        let reason = last_error
            .as_ref()
            .map(|e| e.to_string())
            .unwrap_or_else(|| message::GENERATION_FAILED.to_string());
        error!(
            "{} API error after {} attempts: status={:?} message={}",
            self.upstream.provider_name(),
            attempts.len(),
            last_status,
            reason
        );

        // A status seen on an earlier attempt survives a later network failure.
        Err(GatewayError::UpstreamFailure {
            status: last_status,
            message: reason,
        })
    }
}

/// Sort one upstream reply into success, transient or terminal
fn classify(response: UpstreamResponse) -> Result<GenerationResponse, GatewayError> {
    let UpstreamResponse { status, body } = response;

    if status.is_success() {
        return match body {
            Some(body) => Ok(GenerationResponse { status, body }),
            None => Err(GatewayError::InternalFault(anyhow!(
                "upstream returned status {} with a non-JSON body",
                status
            ))),
        };
    }

    let reason = body
        .as_ref()
        .and_then(error_message)
        .unwrap_or(message::GENERATION_FAILED)
        .to_string();

    if status == StatusCode::SERVICE_UNAVAILABLE {
        Err(GatewayError::UpstreamTransient {
            status: Some(status),
            message: reason,
        })
    } else {
        Err(GatewayError::UpstreamFailure {
            status: Some(status),
            message: reason,
        })
    }
}
