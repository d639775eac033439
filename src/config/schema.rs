//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the control plane.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the control plane.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ControlPlaneConfig {
    /// Listener settings (port, bind host, exit policy).
    pub server: ServerConfig,

    /// Bootstrap page served at `/`.
    pub bootstrap: BootstrapConfig,

    /// Where captured artifacts live.
    pub storage: StorageConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Start the control plane with the agent.
    pub enabled: bool,

    /// Port the control plane listens on.
    pub port: u16,

    /// Host part of the bind address.
    pub bind_host: String,

    /// Delete the ephemeral rule subscription when the server stops.
    pub clear_ephemeral_on_exit: bool,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8888,
            bind_host: "0.0.0.0".to_string(),
            clear_ephemeral_on_exit: true,
            max_body_size: 8 * 1024 * 1024, // 8MB, rule documents can be large
        }
    }
}

/// Bootstrap page configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Externally hosted inspector script referenced by the bootstrap page.
    pub script_url: String,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            script_url: "https://inspect.example.dev/server.js".to_string(),
        }
    }
}

/// Artifact storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding `{id}.json` snapshots and `{id}.png` screenshots.
    pub snapshot_dir: String,

    /// JSON file backing the rule subscription store.
    pub rules_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            snapshot_dir: "snapshots".to_string(),
            rules_file: "rules.json".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: ControlPlaneConfig = toml::from_str(
            r#"
            [server]
            port = 9000
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.bind_host, "0.0.0.0");
        assert!(config.server.clear_ephemeral_on_exit);
        assert_eq!(config.storage, StorageConfig::default());
    }
}
