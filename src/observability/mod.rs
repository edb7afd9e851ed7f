//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → structured log events (tracing)
//!     → counters, gauges, histograms (metrics.rs)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging with request path, method, and origin on every
//!   surfaced error, so failures are diagnosable without reproduction
//! - Request ID flows through all subsystems and to backends

pub mod metrics;
