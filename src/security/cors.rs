//! Cross-origin request validation.
//!
//! # Responsibilities
//! - Decide whether a request's origin is permitted
//! - Answer preflight requests for allowed origins
//! - Mirror the allowed origin on responses
//!
//! # Design Decisions
//! - Validation is a pure function over (origin, policy); no I/O
//! - Absent origin (same-origin or non-browser caller) is allowed
//! - Literal and pattern entries evaluated by one dispatch loop, OR
//!   semantics across the whole list
//! - The allow-list itself is never echoed to the client; only the
//!   request's own origin is mirrored back

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use regex::Regex;

use crate::config::validation::ValidationError;
use crate::config::CorsConfig;
use crate::http::error::{ErrorNormalizer, GatewayError};
use crate::observability::metrics;

/// One allow-list entry.
#[derive(Debug, Clone)]
pub enum OriginRule {
    Literal(String),
    Pattern(Regex),
}

impl OriginRule {
    fn matches(&self, origin: &str) -> bool {
        match self {
            OriginRule::Literal(allowed) => allowed == origin,
            OriginRule::Pattern(pattern) => pattern.is_match(origin),
        }
    }
}

/// Compiled origin allow-list, immutable after startup.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    rules: Vec<OriginRule>,
}

impl OriginPolicy {
    /// Compile the configured entries. Invalid patterns are a startup
    /// error, not a runtime one.
    pub fn from_config(config: &CorsConfig) -> Result<Self, ValidationError> {
        let mut rules = Vec::with_capacity(
            config.allowed_origins.len() + config.allowed_patterns.len(),
        );
        for origin in &config.allowed_origins {
            rules.push(OriginRule::Literal(origin.clone()));
        }
        for pattern in &config.allowed_patterns {
            let compiled = Regex::new(pattern).map_err(|e| {
                ValidationError::InvalidOriginPattern(pattern.clone(), e.to_string())
            })?;
            rules.push(OriginRule::Pattern(compiled));
        }
        Ok(Self { rules })
    }

    /// Pure allow/deny decision. No origin means same-origin or a
    /// non-browser caller and is always allowed.
    pub fn allows(&self, origin: Option<&str>) -> bool {
        match origin {
            None => true,
            Some(origin) => self.rules.iter().any(|rule| rule.matches(origin)),
        }
    }
}

/// State for the CORS middleware.
#[derive(Clone)]
pub struct CorsState {
    pub policy: Arc<OriginPolicy>,
    pub normalizer: ErrorNormalizer,
}

/// Middleware enforcing the origin policy on every request.
pub async fn cors_middleware(
    State(state): State<CorsState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let origin = request.headers().get(header::ORIGIN).cloned();
    let origin_str = origin.as_ref().and_then(|v| v.to_str().ok());

    if !state.policy.allows(origin_str) {
        tracing::warn!(
            method = %request.method(),
            path = %request.uri().path(),
            origin = origin_str.unwrap_or("<invalid>"),
            "Origin rejected"
        );
        metrics::record_rejection("cors");
        return state.normalizer.render(&GatewayError::CorsRejected);
    }

    let Some(origin) = origin else {
        // Same-origin traffic carries no CORS headers.
        return next.run(request).await;
    };

    if request.method() == Method::OPTIONS {
        return preflight_response(origin);
    }

    let mut response = next.run(request).await;
    apply_cors_headers(response.headers_mut(), origin);
    response
}

fn preflight_response(origin: HeaderValue) -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    let headers = response.headers_mut();
    apply_cors_headers(headers, origin);
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization, X-Requested-With"),
    );
    response
}

fn apply_cors_headers(headers: &mut axum::http::HeaderMap, origin: HeaderValue) {
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
}
