//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → cors.rs (origin allow-list check, preflight)
//!     → client_ip.rs (resolve effective client identity)
//!     → rate_limit.rs (fixed-window check per client and route class)
//!     → Pass to routing
//! ```
//!
//! # Design Decisions
//! - Fail closed: a rejected origin or exhausted window never reaches
//!   the routing table
//! - Forwarded-address headers are only honored across configured
//!   trusted hops
//! - Limiter state is process-local; multi-instance deployments get
//!   per-instance windows (known limitation, not a defect)

pub mod client_ip;
pub mod cors;
pub mod rate_limit;

pub use client_ip::client_identity;
pub use cors::{CorsState, OriginPolicy, OriginRule};
pub use rate_limit::{RateLimitState, RateLimiter, RouteClass, WindowStore};
