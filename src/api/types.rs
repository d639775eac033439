//! Request and response bodies of the RPC surface.
//!
//! No field is ever skipped during serialization; the inspector tells a
//! null field apart from a missing one.

use serde::{Deserialize, Serialize};

use crate::agent::{AgentInfo, DeviceInfo};

/// Artifact lookup body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReqId {
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub device: DeviceInfo,
    pub agent_version: AgentInfo,
}
