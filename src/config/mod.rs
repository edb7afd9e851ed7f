//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - Ambient settings have defaults; routing targets do not — a config
//!   without service targets is rejected at startup
//! - Validation separates syntactic (serde) from semantic checks and
//!   reports every problem at once

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::Environment;
pub use schema::GatewayConfig;
pub use schema::ServiceTargetConfig;
pub use schema::{CorsConfig, HealthConfig, RateLimitConfig, WindowLimit};
