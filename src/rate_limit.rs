//! Fixed-window rate limiting for the signup and login endpoints.
//!
//! Counters are process-wide and keyed by `(client IP, window kind)`. A
//! window holds a fixed quota; when it elapses the counter starts over.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;

use crate::config::RateLimitConfig;
use crate::error::ApiError;
use crate::state::AppState;

/// Which quota applies to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowKind {
    Signup,
    Login,
}

#[derive(Debug, Clone)]
struct Counter {
    count: u32,
    window_start: Instant,
}

#[derive(Debug)]
pub struct RateLimiter {
    entries: DashMap<(IpAddr, WindowKind), Counter>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
        }
    }

    fn quota(&self, kind: WindowKind) -> (u32, Duration) {
        match kind {
            WindowKind::Signup => (
                self.config.signup_max,
                Duration::from_secs(self.config.signup_window_seconds),
            ),
            WindowKind::Login => (
                self.config.login_max,
                Duration::from_secs(self.config.login_window_seconds),
            ),
        }
    }

    /// Consume one slot for `ip` in the given window. `Err(retry_after)`
    /// carries the seconds until the window resets.
    pub fn check(&self, ip: IpAddr, kind: WindowKind) -> Result<(), u64> {
        if !self.config.enabled {
            return Ok(());
        }

        let (max, window) = self.quota(kind);
        let now = Instant::now();

        let mut entry = self.entries.entry((ip, kind)).or_insert_with(|| Counter {
            count: 0,
            window_start: now,
        });

        let elapsed = now.duration_since(entry.window_start);
        if elapsed >= window {
            entry.count = 0;
            entry.window_start = now;
        }

        if entry.count < max {
            entry.count += 1;
            Ok(())
        } else {
            let retry_after = window
                .saturating_sub(now.duration_since(entry.window_start))
                .as_secs()
                .max(1);
            Err(retry_after)
        }
    }

    /// Drop windows that ended long enough ago that they cannot matter.
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|&(_, kind), entry| {
            let (_, window) = self.quota(kind);
            now.duration_since(entry.window_start) < window * 2
        });
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

/// Periodically evict stale counters so the map does not grow unbounded.
pub fn spawn_cleanup_task(limiter: Arc<RateLimiter>, interval: Duration) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            limiter.cleanup_expired();
            tracing::debug!(entries = limiter.entry_count(), "rate limiter cleanup");
        }
    });
}

/// Best-effort client identity: forwarded headers first (reverse-proxy
/// deployments), then the connection's peer address, loopback as a last
/// resort. Without the peer fallback every direct client would share one
/// counter.
fn client_ip(request: &Request) -> IpAddr {
    if let Some(forwarded) = request.headers().get("x-forwarded-for") {
        if let Ok(value) = forwarded.to_str() {
            if let Some(ip) = value
                .split(',')
                .next()
                .and_then(|s| s.trim().parse::<IpAddr>().ok())
            {
                return ip;
            }
        }
    }
    if let Some(real_ip) = request.headers().get("x-real-ip") {
        if let Ok(ip) = real_ip.to_str().unwrap_or_default().trim().parse::<IpAddr>() {
            return ip;
        }
    }
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip();
    }
    IpAddr::from([127, 0, 0, 1])
}

async fn limit(
    state: AppState,
    request: Request,
    next: Next,
    kind: WindowKind,
) -> Result<Response, ApiError> {
    let ip = client_ip(&request);
    match state.limiter.check(ip, kind) {
        Ok(()) => Ok(next.run(request).await),
        Err(retry_after) => {
            tracing::warn!(%ip, ?kind, retry_after, "rate limit exceeded");
            Err(ApiError::Throttled { retry_after })
        }
    }
}

pub async fn limit_signup(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    limit(state, request, next, WindowKind::Signup).await
}

pub async fn limit_login(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    limit(state, request, next, WindowKind::Login).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> RateLimitConfig {
        RateLimitConfig {
            enabled: true,
            signup_max: 5,
            signup_window_seconds: 3600,
            login_max: 5,
            login_window_seconds: 900,
        }
    }

    #[test]
    fn allows_requests_under_quota() {
        let limiter = RateLimiter::new(test_config());
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        for i in 0..5 {
            assert!(
                limiter.check(ip, WindowKind::Signup).is_ok(),
                "request {} should pass",
                i
            );
        }
    }

    #[test]
    fn sixth_signup_in_window_is_throttled() {
        let limiter = RateLimiter::new(test_config());
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        for _ in 0..5 {
            limiter.check(ip, WindowKind::Signup).unwrap();
        }
        let retry_after = limiter.check(ip, WindowKind::Signup).unwrap_err();
        assert!(retry_after >= 1);
    }

    #[test]
    fn windows_are_independent_per_ip() {
        let limiter = RateLimiter::new(test_config());
        let ip1: IpAddr = "10.0.0.1".parse().unwrap();
        let ip2: IpAddr = "10.0.0.2".parse().unwrap();
        for _ in 0..5 {
            limiter.check(ip1, WindowKind::Login).unwrap();
        }
        assert!(limiter.check(ip1, WindowKind::Login).is_err());
        assert!(limiter.check(ip2, WindowKind::Login).is_ok());
    }

    #[test]
    fn signup_and_login_quotas_are_separate() {
        let limiter = RateLimiter::new(test_config());
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        for _ in 0..5 {
            limiter.check(ip, WindowKind::Login).unwrap();
        }
        assert!(limiter.check(ip, WindowKind::Login).is_err());
        assert!(limiter.check(ip, WindowKind::Signup).is_ok());
    }

    #[test]
    fn disabled_limiter_never_throttles() {
        let mut config = test_config();
        config.enabled = false;
        let limiter = RateLimiter::new(config);
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        for _ in 0..100 {
            assert!(limiter.check(ip, WindowKind::Login).is_ok());
        }
    }

    #[test]
    fn client_ip_prefers_forwarded_header() {
        let request = axum::http::Request::builder()
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(client_ip(&request), "203.0.113.9".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn client_ip_falls_back_to_peer_address() {
        let mut request = axum::http::Request::builder()
            .body(axum::body::Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo("198.51.100.7:4242".parse::<SocketAddr>().unwrap()));
        assert_eq!(
            client_ip(&request),
            "198.51.100.7".parse::<IpAddr>().unwrap()
        );
    }

    #[test]
    fn client_ip_defaults_to_loopback() {
        let request = axum::http::Request::builder()
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(client_ip(&request), IpAddr::from([127, 0, 0, 1]));
    }

    #[test]
    fn cleanup_keeps_live_windows() {
        let limiter = RateLimiter::new(test_config());
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        limiter.check(ip, WindowKind::Signup).unwrap();
        assert_eq!(limiter.entry_count(), 1);
        limiter.cleanup_expired();
        assert_eq!(limiter.entry_count(), 1);
    }
}
