//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (body size)
//! - Validate addresses and URLs before they reach the server
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ControlPlaneConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::{IpAddr, SocketAddr};

use crate::config::schema::ControlPlaneConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("server.bind_host '{0}' is not an IP address")]
    BindHost(String),
    #[error("server.max_body_size must be greater than 0")]
    ZeroBodyLimit,
    #[error("bootstrap.script_url '{url}' is invalid: {reason}")]
    ScriptUrl { url: String, reason: String },
    #[error("storage.snapshot_dir must not be empty")]
    EmptySnapshotDir,
    #[error("storage.rules_file must not be empty")]
    EmptyRulesFile,
    #[error("observability.metrics_address '{0}' is not a socket address")]
    MetricsAddress(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ControlPlaneConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_host.parse::<IpAddr>().is_err() {
        errors.push(ValidationError::BindHost(config.server.bind_host.clone()));
    }
    if config.server.max_body_size == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    match url::Url::parse(&config.bootstrap.script_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::ScriptUrl {
            url: config.bootstrap.script_url.clone(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        }),
        Err(e) => errors.push(ValidationError::ScriptUrl {
            url: config.bootstrap.script_url.clone(),
            reason: e.to_string(),
        }),
    }

    if config.storage.snapshot_dir.trim().is_empty() {
        errors.push(ValidationError::EmptySnapshotDir);
    }
    if config.storage.rules_file.trim().is_empty() {
        errors.push(ValidationError::EmptyRulesFile);
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&ControlPlaneConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = ControlPlaneConfig::default();
        config.server.max_body_size = 0;
        config.bootstrap.script_url = "ftp://example.com/a.js".into();
        config.storage.snapshot_dir = "  ".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0], ValidationError::ZeroBodyLimit);
        assert!(matches!(errors[1], ValidationError::ScriptUrl { .. }));
        assert_eq!(errors[2], ValidationError::EmptySnapshotDir);
    }

    #[test]
    fn test_port_zero_is_left_to_the_lifecycle() {
        let mut config = ControlPlaneConfig::default();
        config.server.port = 0;
        assert_eq!(validate_config(&config), Ok(()));
    }

    #[test]
    fn test_metrics_address_only_checked_when_enabled() {
        let mut config = ControlPlaneConfig::default();
        config.observability.metrics_address = "nope".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::MetricsAddress("nope".into())])
        );
    }
}
