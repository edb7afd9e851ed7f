//! Detailed health aggregation with bounded fan-out.
//!
//! # Responsibilities
//! - Probe every configured service target concurrently
//! - Bound each probe by the per-check timeout
//! - Bound the whole aggregation by the overall deadline
//!
//! # Design Decisions
//! - Probes run as spawned tasks: all are issued up front, completion is
//!   a race between "all settled" and the overall deadline
//! - A probe still outstanding at the deadline is reported timed-out and
//!   aborted; its late result can never leak into another response
//! - A backend is healthy when its probe returns 2xx and a body whose
//!   `status` field says "healthy"

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Uri};
use http_body_util::BodyExt;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use tokio::time::{self, Instant};

use crate::config::HealthConfig;
use crate::health::{CompositeHealth, HealthCheckResult, HealthStatus};
use crate::observability::metrics;
use crate::routing::ServiceTarget;

/// One registered dependency probe.
#[derive(Debug, Clone)]
struct DependencyCheck {
    service: String,
    url: Uri,
}

/// Fans out to all configured dependencies and reduces to one report.
pub struct HealthAggregator {
    client: Client<HttpConnector, Body>,
    checks: Vec<DependencyCheck>,
    check_timeout: Duration,
    overall_timeout: Duration,
}

impl HealthAggregator {
    pub fn from_config(targets: &[ServiceTarget], config: &HealthConfig) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let checks = targets
            .iter()
            .filter_map(|target| {
                let url: Uri = format!(
                    "{}://{}{}",
                    target.base_url.scheme(),
                    authority_of(target),
                    config.check_path
                )
                .parse()
                .ok()?;
                Some(DependencyCheck {
                    service: target.name.clone(),
                    url,
                })
            })
            .collect();

        Self {
            client,
            checks,
            check_timeout: config.check_timeout(),
            overall_timeout: config.overall_timeout(),
        }
    }

    /// Run all probes concurrently and reduce under the overall deadline.
    pub async fn aggregate(&self) -> CompositeHealth {
        let deadline = Instant::now() + self.overall_timeout;

        let handles: Vec<_> = self
            .checks
            .iter()
            .map(|check| {
                let client = self.client.clone();
                let check = check.clone();
                let timeout = self.check_timeout;
                (
                    check.service.clone(),
                    tokio::spawn(async move { probe(client, check, timeout).await }),
                )
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (service, mut handle) in handles {
            match time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(result)) => results.push(result),
                Ok(Err(join_error)) => {
                    // A panicking probe degrades its own entry, nothing else.
                    tracing::error!(service = %service, error = %join_error, "Health probe task failed");
                    results.push(HealthCheckResult {
                        service,
                        status: HealthStatus::Unreachable,
                        latency_ms: 0,
                        detail: Some("check task failed".to_string()),
                    });
                }
                Err(_) => {
                    handle.abort();
                    results.push(HealthCheckResult {
                        service,
                        status: HealthStatus::TimedOut,
                        latency_ms: self.overall_timeout.as_millis() as u64,
                        detail: Some("outstanding at overall deadline".to_string()),
                    });
                }
            }
        }

        for result in &results {
            metrics::record_dependency_health(
                &result.service,
                result.status == HealthStatus::Healthy,
            );
        }

        CompositeHealth::from_checks(results)
    }
}

fn authority_of(target: &ServiceTarget) -> String {
    match target.base_url.port() {
        Some(port) => format!("{}:{}", target.base_url.host_str().unwrap_or_default(), port),
        None => target.base_url.host_str().unwrap_or_default().to_string(),
    }
}

/// Probe one dependency, converting every failure into a result entry.
async fn probe(
    client: Client<HttpConnector, Body>,
    check: DependencyCheck,
    timeout: Duration,
) -> HealthCheckResult {
    let start = Instant::now();
    let service = check.service;

    let request = match Request::builder()
        .method("GET")
        .uri(check.url)
        .header("user-agent", "api-gateway-health-check")
        .body(Body::empty())
    {
        Ok(request) => request,
        Err(e) => {
            tracing::error!(service = %service, error = %e, "Failed to build health probe");
            return HealthCheckResult {
                service,
                status: HealthStatus::Unreachable,
                latency_ms: 0,
                detail: Some("invalid probe request".to_string()),
            };
        }
    };

    let exchange = async {
        let response = client.request(request).await?;
        let status = response.status();
        let body = response.into_body().collect().await?.to_bytes();
        Ok::<_, Box<dyn std::error::Error + Send + Sync>>((status, body))
    };

    match time::timeout(timeout, exchange).await {
        Ok(Ok((status, body))) => {
            let latency_ms = start.elapsed().as_millis() as u64;
            let reported = serde_json::from_slice::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("status").and_then(|s| s.as_str().map(String::from)));

            if status.is_success() && reported.as_deref() == Some("healthy") {
                HealthCheckResult {
                    service,
                    status: HealthStatus::Healthy,
                    latency_ms,
                    detail: None,
                }
            } else {
                tracing::warn!(
                    service = %service,
                    http_status = %status,
                    reported = reported.as_deref().unwrap_or("<none>"),
                    "Dependency reported unhealthy"
                );
                HealthCheckResult {
                    service,
                    status: HealthStatus::Unhealthy,
                    latency_ms,
                    detail: Some(format!("http status {}", status.as_u16())),
                }
            }
        }
        Ok(Err(e)) => {
            tracing::warn!(service = %service, error = %e, "Health probe failed");
            HealthCheckResult {
                service,
                status: HealthStatus::Unreachable,
                latency_ms: start.elapsed().as_millis() as u64,
                detail: Some("connect failed".to_string()),
            }
        }
        Err(_) => {
            tracing::warn!(service = %service, timeout_ms = timeout.as_millis() as u64, "Health probe timed out");
            HealthCheckResult {
                service,
                status: HealthStatus::TimedOut,
                latency_ms: start.elapsed().as_millis() as u64,
                detail: None,
            }
        }
    }
}
