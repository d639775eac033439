//! Accessibility engine interface.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::agent::Rejected;

/// Message used whenever the engine is required but not running.
pub const ENGINE_NOT_RUNNING: &str = "accessibility engine is not running";

/// Action descriptor forwarded verbatim to the engine.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    /// Selector expression identifying the target node.
    pub selector: String,
    /// Action name (click, back, ...); engine default when null.
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub fast_query: bool,
}

/// Outcome reported by the engine.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    pub action: Option<String>,
    pub result: bool,
}

/// Raw screen state produced by the engine for a snapshot.
#[derive(Debug, Clone, Default)]
pub struct ScreenCapture {
    pub app_id: Option<String>,
    pub activity_id: Option<String>,
    pub screen_width: u32,
    pub screen_height: u32,
    pub is_landscape: bool,
    /// Accessibility node tree.
    pub nodes: serde_json::Value,
    /// PNG-encoded screenshot, if the engine could take one.
    pub screenshot: Option<Vec<u8>>,
}

/// The automation engine that owns the device's accessibility session.
#[async_trait]
pub trait AutomationEngine: Send + Sync {
    /// Whether the engine is currently connected.
    fn is_running(&self) -> bool;

    /// Perform an action on the current screen.
    async fn exec_action(&self, request: ActionRequest) -> anyhow::Result<ActionResult>;

    /// Dump the current screen state.
    async fn capture_screen(&self) -> anyhow::Result<ScreenCapture>;
}

/// Engine stand-in for hosts with no accessibility session attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedEngine;

#[async_trait]
impl AutomationEngine for DetachedEngine {
    fn is_running(&self) -> bool {
        false
    }

    async fn exec_action(&self, _request: ActionRequest) -> anyhow::Result<ActionResult> {
        Err(Rejected::new(ENGINE_NOT_RUNNING).into())
    }

    async fn capture_screen(&self) -> anyhow::Result<ScreenCapture> {
        Err(Rejected::new(ENGINE_NOT_RUNNING).into())
    }
}
