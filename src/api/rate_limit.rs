//! Rate limiting middleware
//!
//! Gates every route under the API prefix with the per-IP fixed-window
//! limiter held in `AppState`.

use crate::api::endpoints::AppState;
use crate::core::constants::message;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tracing::warn;

/// Address the limit is keyed on: the TCP peer, as seen by the listener
fn client_ip(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

/// Rate limiting middleware, applied to every route under the API prefix
///
/// Runs before the handlers, so rejected requests are never validated.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_ip(&request);
    let decision = state.rate_limiter.check(client).await;

    let mut response = if decision.allowed {
        next.run(request).await
    } else {
        warn!("Rate limit exceeded for {}", client);
        (StatusCode::TOO_MANY_REQUESTS, message::RATE_LIMITED).into_response()
    };

    let response_headers = response.headers_mut();
    for (name, value) in decision.headers() {
        response_headers.insert(name, value);
    }
    response
}
