//! Forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! RouteMatch + inbound request parts
//!     → descriptor.rs (pure: build immutable OutboundRequest)
//!     → executor.rs (I/O: issue call, enforce timeout, stream back)
//!     → Response or ProxyError
//! ```
//!
//! # Design Decisions
//! - Planning is separated from execution: the descriptor is a value,
//!   the executor performs the only I/O
//! - Every failure is classified (unreachable / timeout / protocol) so
//!   the error normalizer can keep the status codes distinct
//! - Backend connection details stay in logs, never in responses

pub mod descriptor;
pub mod executor;

pub use descriptor::OutboundRequest;
pub use executor::ForwardExecutor;

use std::time::Duration;

/// A failed forward attempt, classified for the error normalizer.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("service `{service}` is unreachable")]
    Unreachable {
        service: String,
        #[source]
        source: hyper_util::client::legacy::Error,
    },

    #[error("service `{service}` timed out after {timeout:?}")]
    Timeout { service: String, timeout: Duration },

    #[error("protocol error from service `{service}`")]
    Protocol {
        service: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ProxyError {
    /// Target service the failed call was addressed to.
    pub fn service(&self) -> &str {
        match self {
            ProxyError::Unreachable { service, .. }
            | ProxyError::Timeout { service, .. }
            | ProxyError::Protocol { service, .. } => service,
        }
    }
}
