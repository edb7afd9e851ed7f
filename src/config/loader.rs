//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", format_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
///
/// Any missing required setting or semantic problem is fatal: the caller
/// is expected to refuse to start rather than run with partial routing.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: GatewayConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_minimal_config() {
        let dir = std::env::temp_dir();
        let path = dir.join("gateway-loader-test.toml");
        fs::write(
            &path,
            r#"
            [[services]]
            name = "auth"
            base_url = "http://127.0.0.1:3001"
            path_prefix = "/api/auth"

            [[services]]
            name = "business"
            base_url = "http://127.0.0.1:3002"
            path_prefix = "/api"
            "#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.services.len(), 2);
        assert_eq!(config.services[0].name, "auth");
        assert_eq!(config.services[0].timeout_ms, 30_000);
        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_empty_config_fails_validation() {
        let dir = std::env::temp_dir();
        let path = dir.join("gateway-loader-empty-test.toml");
        fs::write(&path, "").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        fs::remove_file(&path).ok();
    }
}
