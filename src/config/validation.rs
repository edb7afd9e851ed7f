//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check service targets resolve to usable URLs
//! - Validate value ranges (windows > 0, timeouts coherent)
//! - Detect unreachable (shadowed) path prefixes
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before the config is accepted into the system; a config that
//!   fails here never starts the process

use regex::Regex;
use url::Url;

use crate::config::schema::{GatewayConfig, WindowLimit};

/// A single semantic problem found in the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("no service targets configured; refusing to start without routing targets")]
    NoServices,

    #[error("service `{0}`: base_url `{1}` is not a valid http(s) URL")]
    InvalidBaseUrl(String, String),

    #[error("service `{0}`: path_prefix `{1}` must start with '/'")]
    InvalidPathPrefix(String, String),

    #[error("duplicate service name `{0}`")]
    DuplicateServiceName(String),

    #[error("service `{shadowed}` is unreachable: `{shadowing}` is registered earlier and matches the same paths")]
    ShadowedPrefix { shadowing: String, shadowed: String },

    #[error("rate_limit.{0}: window_ms and max_requests must be greater than zero")]
    InvalidWindow(&'static str),

    #[error("health: check_timeout_ms must be greater than zero and not exceed overall_timeout_ms")]
    IncoherentHealthTimeouts,

    #[error("cors: pattern `{0}` is not a valid regex: {1}")]
    InvalidOriginPattern(String, String),

    #[error("listener: bind_address `{0}` is not a valid socket address")]
    InvalidBindAddress(String),
}

/// Validate the configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.services.is_empty() {
        errors.push(ValidationError::NoServices);
    }

    for (i, svc) in config.services.iter().enumerate() {
        match Url::parse(&svc.base_url) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            _ => errors.push(ValidationError::InvalidBaseUrl(
                svc.name.clone(),
                svc.base_url.clone(),
            )),
        }

        if !svc.path_prefix.starts_with('/') {
            errors.push(ValidationError::InvalidPathPrefix(
                svc.name.clone(),
                svc.path_prefix.clone(),
            ));
        }

        if config.services[..i].iter().any(|other| other.name == svc.name) {
            errors.push(ValidationError::DuplicateServiceName(svc.name.clone()));
        }

        // First match wins, so an earlier prefix that is a prefix of a
        // later one makes the later target dead configuration.
        for earlier in &config.services[..i] {
            if shadows(&earlier.path_prefix, &svc.path_prefix) {
                errors.push(ValidationError::ShadowedPrefix {
                    shadowing: earlier.name.clone(),
                    shadowed: svc.name.clone(),
                });
            }
        }
    }

    check_window(&config.rate_limit.general, "general", &mut errors);
    check_window(&config.rate_limit.sensitive, "sensitive", &mut errors);

    if config.health.check_timeout_ms == 0
        || config.health.check_timeout_ms > config.health.overall_timeout_ms
    {
        errors.push(ValidationError::IncoherentHealthTimeouts);
    }

    for pattern in &config.cors.allowed_patterns {
        if let Err(e) = Regex::new(pattern) {
            errors.push(ValidationError::InvalidOriginPattern(
                pattern.clone(),
                e.to_string(),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// True if `earlier` matches every path that `later` matches.
fn shadows(earlier: &str, later: &str) -> bool {
    later == earlier
        || later
            .strip_prefix(earlier)
            .is_some_and(|rest| rest.starts_with('/'))
}

fn check_window(limit: &WindowLimit, class: &'static str, errors: &mut Vec<ValidationError>) {
    if limit.window_ms == 0 || limit.max_requests == 0 {
        errors.push(ValidationError::InvalidWindow(class));
    }
}
