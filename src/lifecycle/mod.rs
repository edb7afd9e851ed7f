//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     Load config → Validate → Initialize subsystems → Start listener
//!
//! Shutdown:
//!     Signal received → Stop accepting → Drain in-flight → Exit
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal; the process never runs with
//!   partial routing
//! - The listener starts last, after every subsystem is built

pub mod shutdown;

pub use shutdown::Shutdown;
