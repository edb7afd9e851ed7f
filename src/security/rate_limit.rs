//! Fixed-window rate limiting middleware.
//!
//! # Responsibilities
//! - Count requests per (client identity, route class) in fixed windows
//! - Reject over-limit requests before they reach routing
//! - Exempt liveness probes and, optionally, loopback callers
//!
//! # Design Decisions
//! - Window rollover is lazy: evaluated on the next request after the
//!   boundary, no background timer
//! - Counters live behind a small store trait; the in-memory map is
//!   process-local and deliberately not shared across instances
//! - The rejection carries a retry hint equal to the remaining window

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::config::{RateLimitConfig, WindowLimit};
use crate::http::error::{ErrorNormalizer, GatewayError};
use crate::observability::metrics;
use crate::security::client_ip::client_identity;

/// Route class with an independent window configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteClass {
    General,
    Sensitive,
}

impl RouteClass {
    pub fn as_str(self) -> &'static str {
        match self {
            RouteClass::General => "general",
            RouteClass::Sensitive => "sensitive",
        }
    }
}

/// Counter key: one window per client per class.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WindowKey {
    pub client: IpAddr,
    pub class: RouteClass,
}

/// Outcome of a limiter check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Limited { retry_after: Duration },
}

/// Storage for window counters.
///
/// In-memory today; the seam exists so a shared external store can be
/// swapped in without touching the middleware.
pub trait WindowStore: Send + Sync {
    fn check(&self, key: WindowKey, limit: &WindowLimit, now: Instant) -> Decision;
}

struct WindowCounter {
    window_start: Instant,
    count: u32,
}

/// Process-local window store.
#[derive(Default)]
pub struct InMemoryWindowStore {
    windows: Mutex<HashMap<WindowKey, WindowCounter>>,
}

impl WindowStore for InMemoryWindowStore {
    fn check(&self, key: WindowKey, limit: &WindowLimit, now: Instant) -> Decision {
        let mut windows = self.windows.lock().expect("window store mutex poisoned");
        let counter = windows.entry(key).or_insert(WindowCounter {
            window_start: now,
            count: 0,
        });

        // Lazy rollover: reset happens atomically with the request that
        // observes the boundary, under the same lock as the count.
        if now.saturating_duration_since(counter.window_start) >= limit.window() {
            counter.window_start = now;
            counter.count = 0;
        }

        counter.count += 1;
        if counter.count <= limit.max_requests {
            Decision::Allowed
        } else {
            let elapsed = now.saturating_duration_since(counter.window_start);
            Decision::Limited {
                retry_after: limit.window().saturating_sub(elapsed),
            }
        }
    }
}

/// The rate limiter: classification, exemptions, and the store.
pub struct RateLimiter {
    store: Box<dyn WindowStore>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_store(config, Box::new(InMemoryWindowStore::default()))
    }

    pub fn with_store(config: RateLimitConfig, store: Box<dyn WindowStore>) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    fn classify(&self, path: &str) -> RouteClass {
        if self
            .config
            .sensitive_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
        {
            RouteClass::Sensitive
        } else {
            RouteClass::General
        }
    }

    fn is_exempt(&self, path: &str, client: IpAddr) -> bool {
        if self.config.exempt_loopback && client.is_loopback() {
            return true;
        }
        self.config.exempt_paths.iter().any(|p| p == path)
    }

    /// Check one request. `now` is injected so windows are testable
    /// without sleeping.
    pub fn check(&self, client: IpAddr, path: &str, now: Instant) -> (RouteClass, Decision) {
        let class = self.classify(path);
        if !self.config.enabled || self.is_exempt(path, client) {
            return (class, Decision::Allowed);
        }

        let limit = match class {
            RouteClass::General => &self.config.general,
            RouteClass::Sensitive => &self.config.sensitive,
        };
        let decision = self.store.check(WindowKey { client, class }, limit, now);
        (class, decision)
    }
}

/// State for the rate limiting middleware.
#[derive(Clone)]
pub struct RateLimitState {
    pub limiter: Arc<RateLimiter>,
    pub normalizer: ErrorNormalizer,
}

/// Middleware rejecting over-limit requests before routing.
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client = client_identity(
        addr.ip(),
        request.headers(),
        state.limiter.config().trusted_hops,
    );
    let path = request.uri().path();

    match state.limiter.check(client, path, Instant::now()) {
        (_, Decision::Allowed) => next.run(request).await,
        (class, Decision::Limited { retry_after }) => {
            tracing::warn!(
                client = %client,
                method = %request.method(),
                path = %path,
                class = class.as_str(),
                retry_after_ms = retry_after.as_millis() as u64,
                "Rate limit exceeded"
            );
            metrics::record_rejection("rate_limit");
            state
                .normalizer
                .render(&GatewayError::RateLimited { retry_after })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> RateLimiter {
        let mut config = RateLimitConfig {
            exempt_loopback: false,
            ..RateLimitConfig::default()
        };
        config.general = WindowLimit {
            window_ms: 1000,
            max_requests: 5,
        };
        config.sensitive = WindowLimit {
            window_ms: 500,
            max_requests: 2,
        };
        RateLimiter::new(config)
    }

    fn client() -> IpAddr {
        "203.0.113.20".parse().unwrap()
    }

    #[test]
    fn test_sixth_request_in_window_is_rejected() {
        let limiter = limiter();
        let now = Instant::now();

        for _ in 0..5 {
            let (_, decision) = limiter.check(client(), "/api/products", now);
            assert_eq!(decision, Decision::Allowed);
        }

        let (class, decision) = limiter.check(client(), "/api/products", now);
        assert_eq!(class, RouteClass::General);
        match decision {
            Decision::Limited { retry_after } => {
                assert!(retry_after <= Duration::from_millis(1000));
            }
            Decision::Allowed => panic!("sixth request should be limited"),
        }
    }

    #[test]
    fn test_window_rolls_over_lazily() {
        let limiter = limiter();
        let start = Instant::now();

        for _ in 0..6 {
            limiter.check(client(), "/api/products", start);
        }

        // First request after the boundary starts a fresh window.
        let later = start + Duration::from_millis(1100);
        let (_, decision) = limiter.check(client(), "/api/products", later);
        assert_eq!(decision, Decision::Allowed);
    }

    #[test]
    fn test_sensitive_class_has_independent_counter() {
        let limiter = limiter();
        let now = Instant::now();

        for _ in 0..5 {
            limiter.check(client(), "/api/products", now);
        }

        // General window is exhausted; sensitive still has room.
        let (class, decision) = limiter.check(client(), "/api/auth/login", now);
        assert_eq!(class, RouteClass::Sensitive);
        assert_eq!(decision, Decision::Allowed);

        limiter.check(client(), "/api/auth/login", now);
        let (_, decision) = limiter.check(client(), "/api/auth/login", now);
        assert!(matches!(decision, Decision::Limited { .. }));
    }

    #[test]
    fn test_clients_are_counted_separately() {
        let limiter = limiter();
        let now = Instant::now();
        let other: IpAddr = "203.0.113.21".parse().unwrap();

        for _ in 0..6 {
            limiter.check(client(), "/api/products", now);
        }
        let (_, decision) = limiter.check(other, "/api/products", now);
        assert_eq!(decision, Decision::Allowed);
    }

    #[test]
    fn test_health_path_bypasses_limiting() {
        let limiter = limiter();
        let now = Instant::now();

        for _ in 0..20 {
            let (_, decision) = limiter.check(client(), "/api/health", now);
            assert_eq!(decision, Decision::Allowed);
        }
    }

    #[test]
    fn test_loopback_bypass_when_enabled() {
        let limiter = RateLimiter::new(RateLimitConfig {
            general: WindowLimit {
                window_ms: 1000,
                max_requests: 1,
            },
            ..RateLimitConfig::default()
        });
        let loopback: IpAddr = "127.0.0.1".parse().unwrap();
        let now = Instant::now();

        for _ in 0..10 {
            let (_, decision) = limiter.check(loopback, "/api/products", now);
            assert_eq!(decision, Decision::Allowed);
        }
    }
}
