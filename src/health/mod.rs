//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Basic mode:
//!     → gateway's own liveness only, O(1), no outbound calls
//!
//! Detailed mode (aggregator.rs):
//!     → spawn one probe per configured service target (parallel fan-out)
//!     → each probe bounded by the per-check timeout
//!     → aggregation bounded by the overall deadline
//!     → reduce to one CompositeHealth
//! ```
//!
//! # Design Decisions
//! - A probe failure becomes a result entry, never an error escaping
//!   the aggregator
//! - Probes outstanding at the overall deadline are reported timed-out
//!   and aborted; late results are discarded
//! - Composite is healthy iff every check is healthy, otherwise degraded

pub mod aggregator;

use chrono::{DateTime, Utc};
use serde::Serialize;

pub use aggregator::HealthAggregator;

/// Status of one dependency check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Unreachable,
    TimedOut,
}

/// Result of one dependency check; created fresh per invocation.
#[derive(Debug, Clone, Serialize)]
pub struct HealthCheckResult {
    pub service: String,
    pub status: HealthStatus,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Overall status derived from all checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompositeStatus {
    Healthy,
    Degraded,
}

/// Aggregated dependency health; derived, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct CompositeHealth {
    pub status: CompositeStatus,
    pub checks: Vec<HealthCheckResult>,
    pub timestamp: DateTime<Utc>,
}

impl CompositeHealth {
    pub fn from_checks(checks: Vec<HealthCheckResult>) -> Self {
        let status = if checks
            .iter()
            .all(|c| c.status == HealthStatus::Healthy)
        {
            CompositeStatus::Healthy
        } else {
            CompositeStatus::Degraded
        };
        Self {
            status,
            checks,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(service: &str, status: HealthStatus) -> HealthCheckResult {
        HealthCheckResult {
            service: service.into(),
            status,
            latency_ms: 5,
            detail: None,
        }
    }

    #[test]
    fn test_composite_healthy_only_when_all_healthy() {
        let composite = CompositeHealth::from_checks(vec![
            check("auth", HealthStatus::Healthy),
            check("business", HealthStatus::Healthy),
        ]);
        assert_eq!(composite.status, CompositeStatus::Healthy);
    }

    #[test]
    fn test_one_failure_degrades_composite() {
        for bad in [
            HealthStatus::Unhealthy,
            HealthStatus::Unreachable,
            HealthStatus::TimedOut,
        ] {
            let composite = CompositeHealth::from_checks(vec![
                check("auth", HealthStatus::Healthy),
                check("business", bad),
            ]);
            assert_eq!(composite.status, CompositeStatus::Degraded);
        }
    }

    #[test]
    fn test_empty_check_list_is_healthy() {
        let composite = CompositeHealth::from_checks(Vec::new());
        assert_eq!(composite.status, CompositeStatus::Healthy);
    }
}
