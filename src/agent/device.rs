//! Device identity and agent version providers.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub device: String,
    pub model: String,
    pub manufacturer: String,
    pub brand: Option<String>,
    pub os: String,
    pub os_version: Option<String>,
    pub arch: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentInfo {
    pub id: String,
    pub name: String,
    pub version_name: String,
    pub version_code: u32,
}

impl AgentInfo {
    /// Identity of this build.
    pub fn current() -> Self {
        let major: u32 = env!("CARGO_PKG_VERSION_MAJOR").parse().unwrap_or(0);
        let minor: u32 = env!("CARGO_PKG_VERSION_MINOR").parse().unwrap_or(0);
        let patch: u32 = env!("CARGO_PKG_VERSION_PATCH").parse().unwrap_or(0);
        Self {
            id: env!("CARGO_PKG_NAME").to_string(),
            name: "Agent Control Plane".to_string(),
            version_name: env!("CARGO_PKG_VERSION").to_string(),
            version_code: major * 10_000 + minor * 100 + patch,
        }
    }
}

/// Source of the identity reported by `getServerInfo`.
pub trait DeviceInfoProvider: Send + Sync {
    fn device(&self) -> DeviceInfo;
    fn agent(&self) -> AgentInfo;
}

/// Reads identity from the host this process runs on.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostDeviceInfo;

impl HostDeviceInfo {
    fn hostname() -> String {
        std::env::var("HOSTNAME")
            .ok()
            .or_else(|| std::fs::read_to_string("/etc/hostname").ok())
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "unknown".to_string())
    }

    fn os_version() -> Option<String> {
        let release = std::fs::read_to_string("/etc/os-release").ok()?;
        release
            .lines()
            .find_map(|line| line.strip_prefix("VERSION_ID="))
            .map(|v| v.trim_matches('"').to_string())
    }
}

impl DeviceInfoProvider for HostDeviceInfo {
    fn device(&self) -> DeviceInfo {
        let hostname = Self::hostname();
        DeviceInfo {
            device: hostname.clone(),
            model: hostname,
            manufacturer: "unknown".to_string(),
            brand: None,
            os: std::env::consts::OS.to_string(),
            os_version: Self::os_version(),
            arch: std::env::consts::ARCH.to_string(),
        }
    }

    fn agent(&self) -> AgentInfo {
        AgentInfo::current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_version_matches_package() {
        let agent = AgentInfo::current();
        assert_eq!(agent.version_name, env!("CARGO_PKG_VERSION"));
        assert_eq!(agent.version_code, 100);
    }

    #[test]
    fn test_device_nulls_are_serialized() {
        let json = serde_json::to_value(DeviceInfo {
            device: "d".into(),
            model: "m".into(),
            manufacturer: "x".into(),
            brand: None,
            os: "linux".into(),
            os_version: None,
            arch: "x86_64".into(),
        })
        .unwrap();
        assert!(json.get("brand").unwrap().is_null());
        assert!(json.get("osVersion").unwrap().is_null());
    }
}
