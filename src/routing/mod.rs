//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → table.rs (ordered prefix scan, first match wins)
//!     → Return: RouteMatch { target, rewritten path } or explicit miss
//!
//! Table compilation (at startup):
//!     ServiceTargetConfig[]
//!     → Parse base URLs, freeze order
//!     → Immutable RoutingTable shared via Arc
//! ```
//!
//! # Design Decisions
//! - Registration order is match order; more specific prefixes must be
//!   registered before broader ones
//! - Deterministic: a path matches at most one target
//! - Routing is pure lookup; building the outbound request lives in the
//!   proxy subsystem

pub mod table;

pub use table::{RouteMatch, RoutingTable, ServiceTarget};
