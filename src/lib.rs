//! Front-door API gateway library.
//!
//! Validates cross-origin requests, rate-limits clients, routes and
//! forwards requests to backend services, aggregates dependency health
//! with bounded concurrency, and normalizes every failure into one
//! client-facing envelope.

pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod routing;
pub mod security;

pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
