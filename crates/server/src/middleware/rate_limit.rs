//! Fixed-window rate limiting per client IP and endpoint path.
//!
//! Three independent limiters cover the traffic classes:
//! - auth (`/api/auth...`): strict, against code and password guessing
//! - admin (`/api/admin...`)
//! - general (everything else)
//!
//! A window opens on the first request for a `(ip, path)` key and lasts
//! `window`; requests beyond `max_requests` inside it get 429 with
//! `Retry-After`. The limiter state lives in [`AppState`], not in a global.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::config::{LimitRule, RateLimitConfig};
use crate::error::AppError;
use crate::state::AppState;

// =============================================================================
// Limiter
// =============================================================================

/// Outcome of counting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    /// Rejected; retry after this many seconds (at least 1).
    Limited { retry_after: u64 },
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

#[derive(Debug)]
struct LimiterState {
    windows: HashMap<(String, String), Window>,
    last_sweep: Option<Instant>,
}

/// Fixed-window counter keyed by `(client_ip, path)`.
#[derive(Debug)]
pub struct FixedWindowLimiter {
    rule: LimitRule,
    state: Mutex<LimiterState>,
}

impl FixedWindowLimiter {
    #[must_use]
    pub fn new(rule: LimitRule) -> Self {
        Self {
            rule,
            state: Mutex::new(LimiterState {
                windows: HashMap::new(),
                last_sweep: None,
            }),
        }
    }

    #[must_use]
    pub const fn rule(&self) -> LimitRule {
        self.rule
    }

    /// Count a request now.
    pub fn check(&self, client_ip: &str, path: &str) -> Decision {
        self.check_at(client_ip, path, Instant::now())
    }

    /// Count a request at `now`.
    pub fn check_at(&self, client_ip: &str, path: &str, now: Instant) -> Decision {
        let window = self.rule.window;
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        let sweep_due = state
            .last_sweep
            .is_none_or(|last| now.saturating_duration_since(last) >= window);
        if sweep_due {
            let horizon = window.saturating_mul(2);
            state
                .windows
                .retain(|_, w| now.saturating_duration_since(w.started) <= horizon);
            state.last_sweep = Some(now);
        }

        let entry = state
            .windows
            .entry((client_ip.to_owned(), path.to_owned()))
            .or_insert(Window {
                started: now,
                count: 0,
            });

        let elapsed = now.saturating_duration_since(entry.started);
        if elapsed >= window {
            entry.started = now;
            entry.count = 1;
        } else {
            entry.count = entry.count.saturating_add(1);
        }

        if entry.count > self.rule.max_requests {
            let remaining = window.saturating_sub(now.saturating_duration_since(entry.started));
            Decision::Limited {
                retry_after: ceil_secs(remaining).max(1),
            }
        } else {
            Decision::Allowed
        }
    }

    /// Number of tracked keys.
    #[must_use]
    pub fn tracked_keys(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .windows
            .len()
    }
}

fn ceil_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

/// One limiter per traffic class.
#[derive(Debug)]
pub struct RateLimiters {
    pub auth: FixedWindowLimiter,
    pub admin: FixedWindowLimiter,
    pub general: FixedWindowLimiter,
}

impl RateLimiters {
    #[must_use]
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            auth: FixedWindowLimiter::new(config.auth),
            admin: FixedWindowLimiter::new(config.admin),
            general: FixedWindowLimiter::new(config.general),
        }
    }

    /// Limiter responsible for `path`.
    #[must_use]
    pub fn for_path(&self, path: &str) -> &FixedWindowLimiter {
        if path.starts_with("/api/auth") {
            &self.auth
        } else if path.starts_with("/api/admin") {
            &self.admin
        } else {
            &self.general
        }
    }
}

// =============================================================================
// Client IP
// =============================================================================

/// Client address: TCP peer, then first `X-Forwarded-For` hop, then
/// `X-Real-IP`, then `"unknown"`.
#[must_use]
pub fn client_ip(peer: Option<SocketAddr>, headers: &HeaderMap) -> String {
    if let Some(addr) = peer {
        return addr.ip().to_string();
    }

    if let Some(ip) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        return ip.to_owned();
    }

    if let Some(ip) = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        return ip.to_owned();
    }

    "unknown".to_owned()
}

// =============================================================================
// Middleware
// =============================================================================

/// Reject requests over the limit of their traffic class.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip = client_ip(peer, request.headers());
    let path = request.uri().path().to_owned();

    if let Decision::Limited { retry_after } = state.rate_limiters().for_path(&path).check(&ip, &path)
    {
        warn!(client_ip = %ip, path = %path, retry_after, "Rate limit exceeded");
        return AppError::RateLimited { retry_after }.into_response();
    }

    next.run(request).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn limiter(max: u32, window_secs: u64) -> FixedWindowLimiter {
        FixedWindowLimiter::new(LimitRule {
            max_requests: max,
            window: Duration::from_secs(window_secs),
        })
    }

    #[test]
    fn test_allows_up_to_max_then_limits() {
        let limiter = limiter(3, 60);
        let t0 = Instant::now();
        for _ in 0..3 {
            assert_eq!(limiter.check_at("1.1.1.1", "/api/auth/login", t0), Decision::Allowed);
        }
        assert_eq!(
            limiter.check_at("1.1.1.1", "/api/auth/login", t0 + Duration::from_millis(500)),
            Decision::Limited { retry_after: 60 }
        );
    }

    #[test]
    fn test_retry_after_counts_down() {
        let limiter = limiter(1, 60);
        let t0 = Instant::now();
        assert_eq!(limiter.check_at("ip", "/x", t0), Decision::Allowed);
        assert_eq!(
            limiter.check_at("ip", "/x", t0 + Duration::from_secs(45)),
            Decision::Limited { retry_after: 15 }
        );
        assert_eq!(
            limiter.check_at("ip", "/x", t0 + Duration::from_millis(59_900)),
            Decision::Limited { retry_after: 1 }
        );
    }

    #[test]
    fn test_window_reset() {
        let limiter = limiter(1, 60);
        let t0 = Instant::now();
        assert_eq!(limiter.check_at("ip", "/x", t0), Decision::Allowed);
        assert!(matches!(
            limiter.check_at("ip", "/x", t0 + Duration::from_secs(1)),
            Decision::Limited { .. }
        ));
        assert_eq!(
            limiter.check_at("ip", "/x", t0 + Duration::from_secs(60)),
            Decision::Allowed
        );
    }

    #[test]
    fn test_keys_are_per_ip_and_path() {
        let limiter = limiter(1, 60);
        let t0 = Instant::now();
        assert_eq!(limiter.check_at("a", "/x", t0), Decision::Allowed);
        assert_eq!(limiter.check_at("b", "/x", t0), Decision::Allowed);
        assert_eq!(limiter.check_at("a", "/y", t0), Decision::Allowed);
        assert!(matches!(limiter.check_at("a", "/x", t0), Decision::Limited { .. }));
    }

    #[test]
    fn test_sweep_drops_stale_keys() {
        let limiter = limiter(5, 10);
        let t0 = Instant::now();
        limiter.check_at("a", "/x", t0);
        limiter.check_at("b", "/x", t0);
        assert_eq!(limiter.tracked_keys(), 2);

        // 25s later both windows are older than 2 x 10s and get swept.
        limiter.check_at("c", "/x", t0 + Duration::from_secs(25));
        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[test]
    fn test_for_path_classes() {
        let limiters = RateLimiters::new(&RateLimitConfig::defaults(false));
        assert_eq!(limiters.for_path("/api/auth/login").rule().max_requests, 10);
        assert_eq!(limiters.for_path("/api/admin/users").rule().max_requests, 20);
        assert_eq!(limiters.for_path("/api/products").rule().max_requests, 200);
    }

    #[test]
    fn test_client_ip_fallbacks() {
        let peer: SocketAddr = "10.1.2.3:5555".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9, 10.0.0.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.4"));

        assert_eq!(client_ip(Some(peer), &headers), "10.1.2.3");
        assert_eq!(client_ip(None, &headers), "203.0.113.9");

        headers.remove("x-forwarded-for");
        assert_eq!(client_ip(None, &headers), "198.51.100.4");
        assert_eq!(client_ip(None, &HeaderMap::new()), "unknown");
    }
}
