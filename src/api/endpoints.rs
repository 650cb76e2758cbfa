//! API endpoint handlers
//!
//! This module implements the HTTP surface of the proxy: the generation
//! endpoint, the health check, and the layers every route shares.

use crate::api::rate_limit::rate_limit_middleware;
use crate::core::config::Config;
use crate::core::constants::{limits, path};
use crate::core::error::GatewayError;
use crate::core::gateway::{GenerationResponse, ProxyGateway};
use crate::core::rate_limiter::RateLimiter;
use crate::models::proxy::{GenerationPayload, HealthResponse};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State, rejection::JsonRejection},
    http::{HeaderName, HeaderValue, Method, StatusCode, header},
    middleware,
    routing::{get, post},
};
use chrono::SecondsFormat;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::{Instrument, debug, info_span, warn};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub gateway: Arc<ProxyGateway>,
    pub rate_limiter: Arc<RateLimiter>,
}

/// Create the API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    // Every route under the prefix is counted, health included.
    let api = Router::new()
        .route(path::GEMINI, post(generate))
        .route(path::HEALTH, get(health_check))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));

    Router::new()
        .nest(path::API_PREFIX, api)
        .layer(DefaultBodyLimit::max(limits::MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-xss-protection"),
            HeaderValue::from_static("1; mode=block"),
        ))
        .with_state(state)
}

/// CORS restricted to the configured origins, with credentials
fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins()
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

/// POST /api/gemini - Forward a prompt to the generative language API
async fn generate(
    State(state): State<AppState>,
    payload: Result<Json<GenerationPayload>, JsonRejection>,
) -> Result<GenerationResponse, GatewayError> {
    let Json(payload) = payload.map_err(|rejection| {
        debug!("Rejected request body: {}", rejection.body_text());
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return GatewayError::PayloadTooLarge;
        }
        GatewayError::InvalidInput(format!("Invalid request body: {}", rejection.body_text()))
    })?;

    // Generate unique request ID for log correlation
    let request_id = uuid::Uuid::new_v4().to_string();
    let span = info_span!("generate", %request_id);

    state.gateway.handle(payload).instrument(span).await
}

/// GET /api/health - Liveness check; never touches the upstream
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constants::message;
    use crate::core::gateway::tests::{ScriptedUpstream, ok, overloaded, success_body};
    use crate::core::rate_limiter::RateLimitConfig;
    use crate::core::retry::RetryPolicy;
    use axum::body::{Body, to_bytes};
    use axum::extract::ConnectInfo;
    use axum::http::Request;
    use axum::response::Response;
    use serde_json::{Value, json};
    use std::net::SocketAddr;
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_state(upstream: Arc<ScriptedUpstream>, rate_limit: RateLimitConfig) -> AppState {
        AppState {
            config: Arc::new(Config::default()),
            gateway: Arc::new(ProxyGateway::new(
                upstream,
                RetryPolicy::new(3, Duration::from_millis(5), Duration::from_millis(5)),
            )),
            rate_limiter: Arc::new(RateLimiter::new(rate_limit)),
        }
    }

    fn app(upstream: Arc<ScriptedUpstream>) -> Router {
        create_router(test_state(upstream, RateLimitConfig::default()))
    }

    fn with_peer(mut request: Request<Body>, peer: &str) -> Request<Body> {
        let addr: SocketAddr = peer.parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));
        request
    }

    fn post_json(body: Value) -> Request<Body> {
        let request = Request::builder()
            .method("POST")
            .uri("/api/gemini")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        with_peer(request, "198.51.100.1:40000")
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_returns_ok_and_never_calls_upstream() {
        let upstream = ScriptedUpstream::new(vec![]);
        let request = with_peer(
            Request::builder().uri("/api/health").body(Body::empty()).unwrap(),
            "198.51.100.1:40000",
        );

        let response = app(upstream.clone()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        let timestamp = body["timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
        assert!(timestamp.ends_with('Z'));
        assert_eq!(upstream.call_count(), 0);
    }

    #[tokio::test]
    async fn test_generate_passes_upstream_body_through() {
        let upstream = ScriptedUpstream::new(vec![overloaded(), ok()]);
        let response = app(upstream.clone())
            .oneshot(post_json(json!({ "prompt": "Hello", "userApiKey": "AIzaSyTestKey" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, success_body());
        assert_eq!(upstream.call_count(), 2);
    }

    #[tokio::test]
    async fn test_validation_errors_are_400_with_envelope() {
        let cases = [
            (json!({ "userApiKey": "k" }), message::PROMPT_REQUIRED),
            (json!({ "prompt": 1, "userApiKey": "k" }), message::PROMPT_REQUIRED),
            (json!({ "prompt": "x".repeat(10_001), "userApiKey": "k" }), message::PROMPT_TOO_LONG),
            (json!({ "prompt": "Hello" }), message::API_KEY_REQUIRED),
        ];

        for (body, expected) in cases {
            let upstream = ScriptedUpstream::new(vec![ok()]);
            let response = app(upstream.clone()).oneshot(post_json(body)).await.unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(json_body(response).await, json!({ "error": expected }));
            assert_eq!(upstream.call_count(), 0);
        }
    }

    #[tokio::test]
    async fn test_malformed_json_is_400() {
        let upstream = ScriptedUpstream::new(vec![ok()]);
        let request = with_peer(
            Request::builder()
                .method("POST")
                .uri("/api/gemini")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
            "198.51.100.1:40000",
        );

        let response = app(upstream.clone()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().starts_with("Invalid request body"));
        assert_eq!(upstream.call_count(), 0);
    }

    #[tokio::test]
    async fn test_body_over_limit_is_413() {
        let upstream = ScriptedUpstream::new(vec![ok()]);
        let prompt = "a".repeat(limits::MAX_BODY_BYTES + 1024 * 1024);
        let response = app(upstream.clone())
            .oneshot(post_json(json!({ "prompt": prompt, "userApiKey": "k" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            json_body(response).await,
            json!({ "error": message::PAYLOAD_TOO_LARGE })
        );
        assert_eq!(upstream.call_count(), 0);
    }

    #[tokio::test]
    async fn test_body_under_limit_reaches_validation() {
        let upstream = ScriptedUpstream::new(vec![ok()]);
        let prompt = "a".repeat(limits::MAX_BODY_BYTES - 1024);
        let response = app(upstream.clone())
            .oneshot(post_json(json!({ "prompt": prompt, "userApiKey": "k" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await,
            json!({ "error": message::PROMPT_TOO_LONG })
        );
        assert_eq!(upstream.call_count(), 0);
    }

    #[tokio::test]
    async fn test_upstream_failure_status_is_mirrored() {
        let upstream = ScriptedUpstream::new(vec![overloaded(), overloaded(), overloaded()]);
        let response = app(upstream.clone())
            .oneshot(post_json(json!({ "prompt": "Hello", "userApiKey": "k" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            json_body(response).await,
            json!({ "error": "The model is overloaded." })
        );
        assert_eq!(upstream.call_count(), 3);
    }

    #[tokio::test]
    async fn test_rate_limit_rejects_101st_request_before_validation() {
        let upstream = ScriptedUpstream::new(vec![]);
        let router = create_router(test_state(upstream.clone(), RateLimitConfig::default()));

        // Invalid payloads: they are counted all the same.
        for _ in 0..100 {
            let response = router.clone().oneshot(post_json(json!({}))).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }

        let response = router
            .clone()
            .oneshot(post_json(json!({ "prompt": "Hello", "userApiKey": "k" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key(header::RETRY_AFTER));
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], message::RATE_LIMITED.as_bytes());
        assert_eq!(upstream.call_count(), 0);

        // A different address still gets through.
        let other = with_peer(
            Request::builder().uri("/api/health").body(Body::empty()).unwrap(),
            "198.51.100.2:40000",
        );
        let response = router.oneshot(other).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_is_rate_limited_too() {
        let upstream = ScriptedUpstream::new(vec![]);
        let router = create_router(test_state(
            upstream,
            RateLimitConfig {
                max_requests: 1,
                window: Duration::from_secs(60),
            },
        ));
        let health = || {
            with_peer(
                Request::builder().uri("/api/health").body(Body::empty()).unwrap(),
                "198.51.100.1:40000",
            )
        };

        let first = router.clone().oneshot(health()).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(first.headers()["x-ratelimit-remaining"], "0");

        let second = router.oneshot(health()).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_security_headers_present() {
        let upstream = ScriptedUpstream::new(vec![]);
        let request = with_peer(
            Request::builder().uri("/api/health").body(Body::empty()).unwrap(),
            "198.51.100.1:40000",
        );

        let response = app(upstream).oneshot(request).await.unwrap();

        let headers = response.headers();
        assert_eq!(headers["x-content-type-options"], "nosniff");
        assert_eq!(headers["x-frame-options"], "DENY");
        assert_eq!(headers["x-xss-protection"], "1; mode=block");
    }

    #[tokio::test]
    async fn test_cors_allows_listed_origin_with_credentials() {
        let upstream = ScriptedUpstream::new(vec![]);
        let preflight = |origin: &str| {
            with_peer(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/gemini")
                    .header("origin", origin)
                    .header("access-control-request-method", "POST")
                    .header("access-control-request-headers", "content-type")
                    .body(Body::empty())
                    .unwrap(),
                "198.51.100.1:40000",
            )
        };

        let router = app(upstream);
        let allowed = router
            .clone()
            .oneshot(preflight("http://localhost:5173"))
            .await
            .unwrap();
        assert_eq!(
            allowed.headers()["access-control-allow-origin"],
            "http://localhost:5173"
        );
        assert_eq!(allowed.headers()["access-control-allow-credentials"], "true");

        let denied = router.oneshot(preflight("https://evil.example")).await.unwrap();
        assert!(!denied.headers().contains_key("access-control-allow-origin"));
    }
}
