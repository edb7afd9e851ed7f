//! Error normalization.
//!
//! # Responsibilities
//! - Map every failure condition to one status code and one envelope
//! - Keep failure classes distinct (never collapsed into a generic 500)
//! - Gate error details behind the deployment environment
//!
//! # Design Decisions
//! - Client-facing messages are fixed strings; underlying causes go to
//!   logs and, outside production, into the `details` field
//! - 429 responses carry a `retry-after` hint equal to the remaining
//!   window

use std::error::Error as StdError;
use std::time::Duration;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::config::Environment;
use crate::http::response::Envelope;
use crate::proxy::ProxyError;

/// Every failure the gateway can surface to a caller.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("authentication required")]
    Unauthorized,

    #[error("access denied")]
    Forbidden,

    #[error("endpoint not found")]
    NotFound,

    #[error("too many requests")]
    RateLimited { retry_after: Duration },

    #[error("origin not allowed")]
    CorsRejected,

    #[error(transparent)]
    Upstream(#[from] ProxyError),

    #[error("internal server error")]
    Internal,
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
            GatewayError::Unauthorized => StatusCode::UNAUTHORIZED,
            GatewayError::Forbidden | GatewayError::CorsRejected => StatusCode::FORBIDDEN,
            GatewayError::NotFound => StatusCode::NOT_FOUND,
            GatewayError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::Upstream(ProxyError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::Upstream(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Fixed client-facing message; never includes backend addresses or
    /// other internals.
    fn client_message(&self) -> String {
        match self {
            GatewayError::Validation(msg) => format!("invalid request: {msg}"),
            GatewayError::Unauthorized => "authentication required".to_string(),
            GatewayError::Forbidden => "access denied".to_string(),
            GatewayError::NotFound => "endpoint not found".to_string(),
            GatewayError::RateLimited { .. } => "too many requests".to_string(),
            GatewayError::CorsRejected => "origin not allowed".to_string(),
            GatewayError::Upstream(ProxyError::Timeout { .. }) => {
                "internal service timed out".to_string()
            }
            GatewayError::Upstream(_) => "error connecting to internal service".to_string(),
            GatewayError::Internal => "internal server error".to_string(),
        }
    }

    /// Full cause chain, for logs and non-production `details`.
    fn detail_chain(&self) -> String {
        let mut parts = vec![self.to_string()];
        let mut source = self.source();
        while let Some(cause) = source {
            parts.push(cause.to_string());
            source = cause.source();
        }
        parts.join(": ")
    }
}

/// Renders every terminal failure into the uniform envelope.
#[derive(Debug, Clone, Copy)]
pub struct ErrorNormalizer {
    environment: Environment,
}

impl ErrorNormalizer {
    pub fn new(environment: Environment) -> Self {
        Self { environment }
    }

    pub fn render(&self, error: &GatewayError) -> Response {
        let status = error.status();
        let details = if self.environment.is_production() {
            None
        } else {
            Some(error.detail_chain())
        };

        let mut response =
            (status, Json(Envelope::failure(error.client_message(), details))).into_response();

        if let GatewayError::RateLimited { retry_after } = error {
            // Ceiling, so the hint never undershoots the actual reset.
            let secs = retry_after.as_millis().div_ceil(1000).max(1);
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeout_error() -> GatewayError {
        GatewayError::Upstream(ProxyError::Timeout {
            service: "auth".into(),
            timeout: Duration::from_secs(5),
        })
    }

    #[test]
    fn test_status_mapping_is_distinct() {
        assert_eq!(
            GatewayError::Validation("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(GatewayError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(GatewayError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(GatewayError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            GatewayError::RateLimited {
                retry_after: Duration::from_secs(1)
            }
            .status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(GatewayError::CorsRejected.status(), StatusCode::FORBIDDEN);
        assert_eq!(timeout_error().status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(GatewayError::Internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_production_omits_details() {
        let normalizer = ErrorNormalizer::new(Environment::Production);
        let response = normalizer.render(&timeout_error());
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_rate_limited_carries_retry_after() {
        let normalizer = ErrorNormalizer::new(Environment::Production);
        let response = normalizer.render(&GatewayError::RateLimited {
            retry_after: Duration::from_millis(2500),
        });
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        // Rounded up: a hint of 2 would invite a retry inside the window.
        assert_eq!(response.headers()[header::RETRY_AFTER], "3");
    }

    #[test]
    fn test_retry_after_rounding() {
        let normalizer = ErrorNormalizer::new(Environment::Production);
        let header_for = |millis| {
            let response = normalizer.render(&GatewayError::RateLimited {
                retry_after: Duration::from_millis(millis),
            });
            response.headers()[header::RETRY_AFTER].clone()
        };
        assert_eq!(header_for(400), "1");
        assert_eq!(header_for(2000), "2");
        assert_eq!(header_for(0), "1");
    }

    #[test]
    fn test_client_message_hides_service_name() {
        let message = timeout_error().client_message();
        assert!(!message.contains("auth"));
    }
}
