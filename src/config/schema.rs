//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the API gateway.
///
/// Built once at startup, validated eagerly, then frozen and passed
/// explicitly to every subsystem. Nothing reads the environment at
/// request time.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, body limits).
    pub listener: ListenerConfig,

    /// Backend service targets, in registration order.
    ///
    /// First prefix match wins: register longer prefixes before shorter
    /// ones sharing the same leading segment (`/api/auth` before `/api`).
    pub services: Vec<ServiceTargetConfig>,

    /// Cross-origin allow-list.
    pub cors: CorsConfig,

    /// Rate limiting settings per route class.
    pub rate_limit: RateLimitConfig,

    /// Health endpoint and dependency check settings.
    pub health: HealthConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Deployment environment; controls error detail exposure.
    pub environment: Environment,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Whole-request safety timeout in seconds, applied on top of the
    /// per-target forward timeouts.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            max_body_bytes: 10 * 1024 * 1024,
            request_timeout_secs: 60,
        }
    }
}

/// A backend service target.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceTargetConfig {
    /// Service identifier for logging/metrics.
    pub name: String,

    /// Base URL of the backend (e.g., "http://auth-service:3001").
    pub base_url: String,

    /// Inbound path prefix this target owns (e.g., "/api/auth").
    pub path_prefix: String,

    /// Prefix prepended to the remainder after stripping `path_prefix`.
    /// Empty means the prefix is stripped and nothing is substituted.
    #[serde(default)]
    pub rewrite_prefix: String,

    /// Per-call forward timeout in milliseconds.
    #[serde(default = "default_forward_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_forward_timeout_ms() -> u64 {
    30_000
}

impl ServiceTargetConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Cross-origin allow-list configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CorsConfig {
    /// Origins allowed verbatim (e.g., "http://localhost:3000").
    pub allowed_origins: Vec<String>,

    /// Regex patterns for allowed origins (e.g., "\\.example\\.com$").
    pub allowed_patterns: Vec<String>,
}

/// A fixed window limit: at most `max_requests` per `window_ms`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WindowLimit {
    pub window_ms: u64,
    pub max_requests: u32,
}

impl WindowLimit {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Limit for the general route class.
    pub general: WindowLimit,

    /// Limit for the sensitive route class (shorter window, lower ceiling).
    pub sensitive: WindowLimit,

    /// Path prefixes classified as sensitive (e.g., authentication).
    pub sensitive_prefixes: Vec<String>,

    /// Paths exempt from limiting (liveness probes).
    pub exempt_paths: Vec<String>,

    /// Exempt loopback clients (internal probes).
    pub exempt_loopback: bool,

    /// Number of trusted forwarding hops in front of the gateway.
    /// 0 means the socket peer is the client; N means the client address
    /// is taken N hops back through `x-forwarded-for`.
    pub trusted_hops: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            general: WindowLimit {
                window_ms: 15 * 60 * 1000,
                max_requests: 1000,
            },
            sensitive: WindowLimit {
                window_ms: 60 * 1000,
                max_requests: 30,
            },
            sensitive_prefixes: vec!["/api/auth".to_string()],
            exempt_paths: vec!["/api/health".to_string()],
            exempt_loopback: true,
            trusted_hops: 0,
        }
    }
}

/// Health endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Inbound path serving the health endpoint.
    pub path: String,

    /// Path probed on each backend service.
    pub check_path: String,

    /// Per-dependency check timeout in milliseconds.
    pub check_timeout_ms: u64,

    /// Overall deadline for the detailed aggregation in milliseconds.
    /// Must not be smaller than `check_timeout_ms`; should stay well below
    /// the sum of all per-check timeouts so one slow dependency cannot
    /// serialize the whole report.
    pub overall_timeout_ms: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            path: "/api/health".to_string(),
            check_path: "/health".to_string(),
            check_timeout_ms: 2_000,
            overall_timeout_ms: 3_000,
        }
    }
}

impl HealthConfig {
    pub fn check_timeout(&self) -> Duration {
        Duration::from_millis(self.check_timeout_ms)
    }

    pub fn overall_timeout(&self) -> Duration {
        Duration::from_millis(self.overall_timeout_ms)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Deployment environment.
///
/// Only non-production environments include error details in responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Development,
}

impl Environment {
    pub fn is_production(self) -> bool {
        matches!(self, Environment::Production)
    }
}
