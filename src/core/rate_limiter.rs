//! Fixed-window rate limiter
//!
//! Request counting per client IP, held in memory. A window opens on a
//! client's first request and admits `max_requests` until it expires; the
//! next request after expiry opens a fresh window.

use axum::http::{HeaderValue, header};
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Table size above which expired windows are swept on insert
const PRUNE_THRESHOLD: usize = 10_000;

/// Rate limit configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum requests per window
    pub max_requests: u32,
    /// Window length
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(15 * 60),
        }
    }
}

/// Rate limit check result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request is allowed
    pub allowed: bool,
    /// Maximum requests allowed in window
    pub limit: u32,
    /// Remaining requests in current window
    pub remaining: u32,
    /// Time until the current window closes
    pub reset_after: Duration,
}

impl RateLimitDecision {
    /// Create rate limit headers for the response
    pub fn headers(&self) -> Vec<(header::HeaderName, HeaderValue)> {
        let reset_secs = self.reset_after.as_secs().max(1);
        let reset_at = chrono::Utc::now().timestamp() + reset_secs as i64;

        let mut headers = vec![
            (
                header::HeaderName::from_static("x-ratelimit-limit"),
                HeaderValue::from(self.limit),
            ),
            (
                header::HeaderName::from_static("x-ratelimit-remaining"),
                HeaderValue::from(self.remaining),
            ),
            (
                header::HeaderName::from_static("x-ratelimit-reset"),
                HeaderValue::from(reset_at),
            ),
        ];

        if !self.allowed {
            headers.push((header::RETRY_AFTER, HeaderValue::from(reset_secs)));
        }

        headers
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// In-memory fixed-window limiter keyed by client IP
pub struct RateLimiter {
    config: RateLimitConfig,
    prune_threshold: usize,
    table: Mutex<WindowTable>,
}

struct WindowTable {
    windows: HashMap<IpAddr, Window>,
    last_sweep: Instant,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            prune_threshold: PRUNE_THRESHOLD,
            table: Mutex::new(WindowTable {
                windows: HashMap::new(),
                last_sweep: Instant::now(),
            }),
        }
    }

    #[cfg(test)]
    fn with_prune_threshold(mut self, threshold: usize) -> Self {
        self.prune_threshold = threshold;
        self
    }

    /// Count one request from `client` and decide whether it may proceed
    pub async fn check(&self, client: IpAddr) -> RateLimitDecision {
        self.check_at(client, Instant::now()).await
    }

    async fn check_at(&self, client: IpAddr, now: Instant) -> RateLimitDecision {
        let window_len = self.config.window;
        let mut table = self.table.lock().await;

        // Sweep at most once per window length.
        if table.windows.len() >= self.prune_threshold
            && now.duration_since(table.last_sweep) >= window_len
        {
            let before = table.windows.len();
            table
                .windows
                .retain(|_, w| now.duration_since(w.started) < window_len);
            table.last_sweep = now;
            debug!(
                "Pruned {} expired rate limit windows",
                before - table.windows.len()
            );
        }

        let window = table.windows.entry(client).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(window.started) >= window_len {
            *window = Window {
                started: now,
                count: 0,
            };
        }

        let allowed = window.count < self.config.max_requests;
        if allowed {
            window.count += 1;
        }

        RateLimitDecision {
            allowed,
            limit: self.config.max_requests,
            remaining: self.config.max_requests.saturating_sub(window.count),
            reset_after: window_len.saturating_sub(now.duration_since(window.started)),
        }
    }
}
