//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create the Axum router with the health endpoint and the catch-all
//!   proxy handler
//! - Wire up middleware (trace, request ID, body limit, timeout, CORS,
//!   rate limiting) in the documented order
//! - Dispatch matched requests to the forward executor
//! - Normalize every failure through the error normalizer
//!
//! # Middleware Order
//! Origin validation runs before rate limiting, which runs before
//! routing; the health endpoint bypasses routing entirely.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, Query, State},
    http::{header, HeaderValue, Request},
    middleware,
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{ConfigError, GatewayConfig};
use crate::health::HealthAggregator;
use crate::http::error::{ErrorNormalizer, GatewayError};
use crate::observability::metrics;
use crate::proxy::{descriptor, ForwardExecutor};
use crate::routing::RoutingTable;
use crate::security::client_ip::client_identity;
use crate::security::cors::{cors_middleware, CorsState, OriginPolicy};
use crate::security::rate_limit::{rate_limit_middleware, RateLimitState, RateLimiter};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub routing: Arc<RoutingTable>,
    pub executor: ForwardExecutor,
    pub health: Arc<HealthAggregator>,
    pub normalizer: ErrorNormalizer,
    pub started: Instant,
}

/// UUID v4 request IDs.
#[derive(Clone, Copy, Default)]
struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = uuid::Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
}

impl HttpServer {
    /// Assemble all subsystems from a validated configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, ConfigError> {
        let normalizer = ErrorNormalizer::new(config.environment);
        let routing = Arc::new(RoutingTable::from_config(&config.services));
        let health = Arc::new(HealthAggregator::from_config(
            routing.targets(),
            &config.health,
        ));
        let policy = OriginPolicy::from_config(&config.cors)
            .map_err(|e| ConfigError::Validation(vec![e]))?;
        let limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));

        let state = AppState {
            config: Arc::new(config.clone()),
            routing,
            executor: ForwardExecutor::new(),
            health,
            normalizer,
            started: Instant::now(),
        };

        let cors_state = CorsState {
            policy: Arc::new(policy),
            normalizer,
        };
        let rate_state = RateLimitState { limiter, normalizer };

        let router = Self::build_router(&config, state, cors_state, rate_state);
        Ok(Self { router, config })
    }

    fn build_router(
        config: &GatewayConfig,
        state: AppState,
        cors_state: CorsState,
        rate_state: RateLimitState,
    ) -> Router {
        Router::new()
            .route(config.health.path.as_str(), get(health_handler))
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            // Last layer added is outermost; listed innermost-first so the
            // effective order matches the documented one (trace outermost,
            // rate limiting innermost).
            .layer(middleware::from_fn_with_state(
                rate_state,
                rate_limit_middleware,
            ))
            .layer(middleware::from_fn_with_state(cors_state, cors_middleware))
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.listener.request_timeout_secs,
            )))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "API gateway listening");
        for svc in &self.config.services {
            tracing::info!(
                prefix = %svc.path_prefix,
                target = %svc.base_url,
                service = %svc.name,
                "Proxy target registered"
            );
        }

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = shutdown.recv() => {}
                }
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

#[derive(Debug, Deserialize)]
struct HealthParams {
    detailed: Option<String>,
}

/// Health endpoint: basic liveness by default, dependency fan-out on
/// request. Basic mode performs no outbound calls.
async fn health_handler(
    State(state): State<AppState>,
    Query(params): Query<HealthParams>,
) -> Response {
    let detailed = matches!(params.detailed.as_deref(), Some("true") | Some("1"));

    if !detailed {
        return Json(json!({
            "success": true,
            "status": "healthy",
            "service": "api-gateway",
            "timestamp": Utc::now(),
            "uptime_secs": state.started.elapsed().as_secs(),
        }))
        .into_response();
    }

    let composite = state.health.aggregate().await;
    Json(json!({
        "success": true,
        "status": composite.status,
        "service": "api-gateway",
        "timestamp": composite.timestamp,
        "dependencies": composite.checks,
    }))
    .into_response()
}

/// Catch-all proxy handler: route, plan, forward, normalize.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let Some(route) = state.routing.resolve(&path) else {
        tracing::warn!(method = %method, path = %path, origin = %origin, "No service target matches");
        metrics::record_request(method.as_str(), 404, "none", start);
        return state.normalizer.render(&GatewayError::NotFound);
    };

    let client_ip = client_identity(
        addr.ip(),
        request.headers(),
        state.config.rate_limit.trusted_hops,
    );

    let (parts, body) = request.into_parts();
    let outbound = match descriptor::plan(&route, &parts, client_ip) {
        Ok(outbound) => outbound,
        Err(e) => {
            tracing::error!(method = %method, path = %path, origin = %origin, error = %e, "Failed to plan outbound request");
            metrics::record_request(method.as_str(), 500, route.target.name.as_str(), start);
            return state.normalizer.render(&GatewayError::Internal);
        }
    };

    let service = outbound.service.clone();
    tracing::debug!(
        method = %method,
        path = %path,
        service = %service,
        outbound_path = %route.rewritten_path,
        "Forwarding request"
    );

    match state.executor.execute(outbound, body).await {
        Ok(response) => {
            metrics::record_request(method.as_str(), response.status().as_u16(), &service, start);
            response
        }
        Err(proxy_error) => {
            // Cause stays in the logs; the caller sees the envelope only.
            tracing::error!(
                method = %method,
                path = %path,
                origin = %origin,
                service = %service,
                error = %proxy_error,
                cause = ?std::error::Error::source(&proxy_error),
                "Forward failed"
            );
            let error = GatewayError::Upstream(proxy_error);
            metrics::record_request(method.as_str(), error.status().as_u16(), &service, start);
            state.normalizer.render(&error)
        }
    }
}
