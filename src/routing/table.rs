//! Service target table and prefix rewriting.
//!
//! # Responsibilities
//! - Hold the ordered list of registered service targets
//! - Resolve an inbound path to the first matching target
//! - Rewrite the matched path for the backend
//!
//! # Design Decisions
//! - Targets compiled at startup, immutable at runtime
//! - First match wins, in registration order; callers must register
//!   longer prefixes before shorter ones sharing a leading segment
//! - Prefix matching is segment-aware: `/api/auth` does not match
//!   `/api/authx`
//! - No regex in the hot path

use std::time::Duration;

use url::Url;

use crate::config::ServiceTargetConfig;

/// A registered backend destination.
#[derive(Debug, Clone)]
pub struct ServiceTarget {
    /// Service identifier for logging/metrics.
    pub name: String,

    /// Backend base URL; the authority is used for the outbound call.
    pub base_url: Url,

    /// Inbound path prefix this target owns.
    pub path_prefix: String,

    /// Prefix substituted for the matched one when rewriting.
    pub rewrite_prefix: String,

    /// Per-call forward timeout.
    pub timeout: Duration,
}

/// The outcome of a successful route lookup.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub target: &'a ServiceTarget,
    /// Inbound path with the matched prefix stripped and the rewrite
    /// prefix applied.
    pub rewritten_path: String,
}

/// Ordered routing table, frozen after construction.
#[derive(Debug)]
pub struct RoutingTable {
    targets: Vec<ServiceTarget>,
}

impl RoutingTable {
    /// Build the table from validated configuration, preserving order.
    pub fn from_config(services: &[ServiceTargetConfig]) -> Self {
        let targets = services
            .iter()
            .filter_map(|svc| {
                // base_url validity is enforced by config validation;
                // anything unparsable here was already rejected.
                let base_url = Url::parse(&svc.base_url).ok()?;
                Some(ServiceTarget {
                    name: svc.name.clone(),
                    base_url,
                    path_prefix: svc.path_prefix.clone(),
                    rewrite_prefix: svc.rewrite_prefix.clone(),
                    timeout: svc.timeout(),
                })
            })
            .collect();

        Self { targets }
    }

    /// Resolve a path to the first target whose prefix matches.
    ///
    /// Returns `None` when no target matches; the caller surfaces that as
    /// a routing miss, never as a silent default.
    pub fn resolve(&self, path: &str) -> Option<RouteMatch<'_>> {
        self.targets.iter().find_map(|target| {
            matches_prefix(path, &target.path_prefix).map(|remainder| RouteMatch {
                target,
                rewritten_path: rewrite_path(&target.rewrite_prefix, remainder),
            })
        })
    }

    /// Registered targets, in order.
    pub fn targets(&self) -> &[ServiceTarget] {
        &self.targets
    }
}

/// Segment-aware prefix match. Returns the remainder after the prefix.
fn matches_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let remainder = path.strip_prefix(prefix)?;
    if remainder.is_empty() || remainder.starts_with('/') {
        Some(remainder)
    } else {
        None
    }
}

/// Combine the rewrite prefix with the remainder, always yielding an
/// absolute path.
fn rewrite_path(rewrite_prefix: &str, remainder: &str) -> String {
    let joined = format!("{rewrite_prefix}{remainder}");
    if joined.is_empty() {
        "/".to_string()
    } else if joined.starts_with('/') {
        joined
    } else {
        format!("/{joined}")
    }
}
