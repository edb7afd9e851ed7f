//! HTTP surface of the gateway.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, dispatch)
//!     → security middleware (origin, rate limit)
//!     → routing + proxy (forwarded requests)
//!     → error.rs (every failure → one envelope)
//!     → response.rs (envelope shape)
//! ```

pub mod error;
pub mod response;
pub mod server;

pub use error::{ErrorNormalizer, GatewayError};
pub use response::Envelope;
pub use server::HttpServer;
